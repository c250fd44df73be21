use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Stable player identifier
pub type PlayerId = usize;

/// Identifier assigned to each formed game, in formation order
pub type GameId = usize;

/// Skill classes tracked separately in the metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillClass {
    Regular,
    God,
}

impl SkillClass {
    pub const ALL: [SkillClass; 2] = [SkillClass::Regular, SkillClass::God];

    pub fn of(god: bool) -> Self {
        if god {
            SkillClass::God
        } else {
            SkillClass::Regular
        }
    }

    pub fn index(&self) -> usize {
        match self {
            SkillClass::Regular => 0,
            SkillClass::God => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SkillClass::Regular => "regular",
            SkillClass::God => "god",
        }
    }
}

/// Where a player currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Waiting,
    InGame,
}

/// Roster entry used to build the player pool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub id: PlayerId,
    pub rating: f64,
    #[serde(default)]
    pub god: bool,
}

impl PlayerSpec {
    pub fn new(id: PlayerId, rating: f64, god: bool) -> Self {
        Self { id, rating, god }
    }
}

/// A rated player.
///
/// The id and the god flag are fixed at creation. The rating is only written
/// through [`crate::pool::PlayerPool::set_rating`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    god: bool,
    /// Multiplier applied to this player's strength in the outcome model
    /// (1.0 for regular players, `god_boost` for gods)
    skill_multiplier: f64,
    pub(crate) rating: f64,
    /// Rounds spent waiting since last placed into a game
    pub(crate) wait: u64,
    pub(crate) state: PlayerState,
    pub(crate) current_game: Option<GameId>,
    pub(crate) wins: usize,
    pub(crate) losses: usize,
}

impl Player {
    pub fn new(id: PlayerId, rating: f64, god: bool, god_boost: f64) -> Self {
        Self {
            id,
            god,
            skill_multiplier: if god { god_boost } else { 1.0 },
            rating,
            wait: 0,
            state: PlayerState::Waiting,
            current_game: None,
            wins: 0,
            losses: 0,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_god(&self) -> bool {
        self.god
    }

    pub fn skill_class(&self) -> SkillClass {
        SkillClass::of(self.god)
    }

    pub fn skill_multiplier(&self) -> f64 {
        self.skill_multiplier
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn wait(&self) -> u64 {
        self.wait
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn current_game(&self) -> Option<GameId> {
        self.current_game
    }

    pub fn wins(&self) -> usize {
        self.wins
    }

    pub fn losses(&self) -> usize {
        self.losses
    }

    pub fn games_played(&self) -> usize {
        self.wins + self.losses
    }

    /// Fraction of games won, 0.0 before the first game
    pub fn win_ratio(&self) -> f64 {
        let total = self.games_played();
        if total > 0 {
            self.wins as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// A game formed from the queue: `teams[t]` holds the ids on team `t`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub formed_round: u64,
    pub teams: Vec<Vec<PlayerId>>,
}

impl Game {
    pub fn size(&self) -> usize {
        self.teams.iter().map(Vec::len).sum()
    }

    /// All participants, team by team
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.teams.iter().flatten().copied()
    }
}

/// A resolved game, kept for inspection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub formed_round: u64,
    pub resolved_round: u64,
    pub teams: Vec<Vec<PlayerId>>,
    pub win_probabilities: Vec<f64>,
    pub winner: usize,
}

/// Which probability the rating update treats as a player's expected score
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectationModel {
    /// The outcome model's god-boost-adjusted team win probability
    #[default]
    Boosted,
    /// Team win probability computed from ratings alone (god_boost ignored)
    Rating,
}

/// Simulation configuration parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Length of a game in seconds. Presentation only: the frontend uses it
    /// to pace its redraws, the round loop ignores it.
    pub game_duration: f64,
    /// Players per team
    pub team_size: usize,
    /// Teams per game
    pub team_number: usize,
    /// Elo update multiplier
    #[serde(rename = "k-factor", alias = "k_factor")]
    pub k_factor: f64,
    /// Scale of the random rating perturbation applied after each update
    pub nudge: Option<f64>,
    /// Moving-average window for the per-class rating series
    pub smoothing: usize,
    /// Rounds simulated by `Simulation::run`
    pub max_round: u64,
    /// Win-probability multiplier for god players
    pub god_boost: f64,
    /// Expected-score model used by the rating update
    pub expectation: ExpectationModel,
    /// Record every player's rating after each round. Off by default: a
    /// full-length run stores one sample per player per round.
    pub track_player_history: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            game_duration: 0.01,
            team_size: 5,
            team_number: 2,
            k_factor: 20.0,
            nudge: None,
            smoothing: 100,
            max_round: 100_000,
            god_boost: 2.0,
            expectation: ExpectationModel::Boosted,
            track_player_history: false,
        }
    }
}

impl SimulationConfig {
    /// Players needed to form one game, `None` if the product overflows
    pub fn game_size(&self) -> Option<usize> {
        self.team_size.checked_mul(self.team_number)
    }

    /// Nudge scale, or `None` when the nudge step must be skipped entirely
    pub fn active_nudge(&self) -> Option<f64> {
        self.nudge.filter(|&n| n != 0.0)
    }

    /// Check the configuration against the size of the player pool
    pub fn validate(&self, pool_size: usize) -> Result<(), ConfigError> {
        if self.team_size == 0 {
            return Err(ConfigError::ZeroTeamSize);
        }
        if self.team_number == 0 {
            return Err(ConfigError::ZeroTeamNumber);
        }
        let required = self.game_size().ok_or(ConfigError::GameSizeOverflow {
            team_number: self.team_number,
            team_size: self.team_size,
        })?;
        if required > pool_size {
            return Err(ConfigError::PoolTooSmall {
                required,
                team_number: self.team_number,
                team_size: self.team_size,
                pool_size,
            });
        }
        if self.smoothing == 0 {
            return Err(ConfigError::ZeroSmoothing);
        }

        let non_negative = [
            ("k-factor", Some(self.k_factor)),
            ("god_boost", Some(self.god_boost)),
            ("nudge", self.nudge),
        ];
        for (name, value) in non_negative {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidParameter { name, value });
                }
            }
        }
        Ok(())
    }
}
