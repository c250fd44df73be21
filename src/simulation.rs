use crate::error::{ConfigError, SimError, SimResult};
use crate::matchmaker::Matchmaker;
use crate::metrics::{smooth, MetricsRecorder, SimulationStats};
use crate::outcome::OutcomeSimulator;
use crate::pool::PlayerPool;
use crate::queue::MatchQueue;
use crate::rating::{RatingChange, RatingUpdater};
use crate::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Resolved games kept for inspection
const RECENT_GAME_LIMIT: usize = 256;

/// What happened during one round
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u64,
    pub formed: Vec<Game>,
    pub resolved: Option<GameRecord>,
    pub rating_changes: Vec<RatingChange>,
}

/// Main simulation state and controller
pub struct Simulation {
    /// Rounds completed so far
    pub current_round: u64,
    /// Simulation configuration (fixed for the run)
    config: SimulationConfig,
    pool: PlayerPool,
    queue: MatchQueue,
    /// Formed games awaiting resolution, oldest first
    active: VecDeque<Game>,
    matchmaker: Matchmaker,
    updater: RatingUpdater,
    metrics: MetricsRecorder,
    recent_games: VecDeque<GameRecord>,
    next_game_id: GameId,
    rng: StdRng,
}

impl Simulation {
    /// Build a simulation over a fixed roster. Fails if the configuration
    /// cannot form a single game from the roster.
    pub fn new(roster: &[PlayerSpec], config: SimulationConfig, seed: u64) -> SimResult<Self> {
        config.validate(roster.len())?;

        let mut pool = PlayerPool::new(roster, config.god_boost)?;
        let mut queue = MatchQueue::new();
        let ids: Vec<PlayerId> = pool.ids().collect();
        for id in ids {
            queue.enqueue(&mut pool, id);
        }

        log::info!(
            "simulation ready: {} players ({} god), {} teams of {}, k={}, god_boost={}, seed={}",
            pool.len(),
            pool.count(SkillClass::God),
            config.team_number,
            config.team_size,
            config.k_factor,
            config.god_boost,
            seed
        );

        Ok(Self {
            current_round: 0,
            matchmaker: Matchmaker::from_config(&config),
            updater: RatingUpdater::from_config(&config),
            metrics: MetricsRecorder::new(config.smoothing, pool.len(), config.track_player_history),
            config,
            pool,
            queue,
            active: VecDeque::new(),
            recent_games: VecDeque::new(),
            next_game_id: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Build a simulation over a generated roster (see [`generate_roster`])
    pub fn with_population(
        config: SimulationConfig,
        count: usize,
        gods: usize,
        rating_range: (f64, f64),
        seed: u64,
    ) -> SimResult<Self> {
        let roster = generate_roster(count, gods, rating_range, seed)?;
        Self::new(&roster, config, seed)
    }

    /// Run a single round:
    /// 1. form games while enough players wait
    /// 2. advance the wait counter of everyone left in the queue
    /// 3. resolve the oldest active game and re-enqueue its players
    /// 4. record metrics
    pub fn step(&mut self) -> SimResult<RoundReport> {
        let round = self.current_round + 1;

        // 1. Matchmaking
        let mut formed = Vec::new();
        while let Some(candidates) = self.matchmaker.select_candidates(&self.queue, &self.pool) {
            for &id in &candidates {
                let wait = self.pool.get(id).map(Player::wait).unwrap_or(0);
                self.metrics.record_placement(wait);
            }

            let game_id = self.next_game_id;
            self.next_game_id += 1;
            let game = self
                .matchmaker
                .place(&mut self.queue, &mut self.pool, &candidates, game_id, round);
            self.metrics.record_game_formed();
            formed.push(game.clone());
            self.active.push_back(game);
        }

        if formed.is_empty() {
            if self.active.is_empty() {
                log::warn!(
                    "round {}: only {} players waiting and no game in progress",
                    round,
                    self.queue.len()
                );
            } else {
                log::debug!("round {}: {} players waiting, no new game", round, self.queue.len());
            }
        }

        // 2. Everyone still queued waited one more round
        self.queue.advance_waits(&mut self.pool);

        // 3. Resolve the oldest game
        let (resolved, rating_changes) = match self.active.pop_front() {
            Some(game) => {
                let (record, changes) = self.resolve(game, round)?;
                (Some(record), changes)
            }
            None => (None, Vec::new()),
        };

        // 4. Metrics
        self.metrics.end_round(&self.pool, !formed.is_empty());
        self.current_round = round;

        Ok(RoundReport {
            round,
            formed,
            resolved,
            rating_changes,
        })
    }

    /// Run `config.max_round` rounds
    pub fn run(&mut self) -> SimResult<()> {
        let rounds = self.config.max_round;
        self.run_rounds(rounds)
    }

    /// Run `rounds` rounds
    pub fn run_rounds(&mut self, rounds: u64) -> SimResult<()> {
        for _ in 0..rounds {
            self.step()?;
        }
        log::info!(
            "finished round {}: {} games resolved, regular avg {:.1}, god avg {:.1}",
            self.current_round,
            self.metrics.stats.games_resolved,
            self.pool.class_average(SkillClass::Regular).unwrap_or(f64::NAN),
            self.pool.class_average(SkillClass::God).unwrap_or(f64::NAN)
        );
        Ok(())
    }

    /// Sample the winner, update ratings and counters, send players back to the queue
    fn resolve(&mut self, game: Game, round: u64) -> SimResult<(GameRecord, Vec<RatingChange>)> {
        let probabilities = OutcomeSimulator::probabilities(&game, &self.pool);
        let winner = OutcomeSimulator::sample_winner(&probabilities, &mut self.rng);

        let expected = match self.config.expectation {
            ExpectationModel::Boosted => probabilities.clone(),
            ExpectationModel::Rating => OutcomeSimulator::rating_probabilities(&game, &self.pool),
        };
        let changes = self
            .updater
            .apply(&game, winner, &expected, &mut self.pool, &mut self.rng)?;

        for (team_idx, team) in game.teams.iter().enumerate() {
            let won = team_idx == winner;
            for &id in team {
                let player = self.pool.get_mut(id).ok_or(SimError::UnknownPlayer(id))?;
                if won {
                    player.wins += 1;
                } else {
                    player.losses += 1;
                }
                let class = player.skill_class();
                self.metrics.record_result(class, won);
            }
        }

        for id in game.players() {
            self.queue.enqueue(&mut self.pool, id);
        }
        self.metrics.record_game_resolved();

        log::debug!(
            "round {}: game {} won by team {} (p = {:.3})",
            round,
            game.id,
            winner,
            probabilities.get(winner).copied().unwrap_or(0.0)
        );

        let record = GameRecord {
            id: game.id,
            formed_round: game.formed_round,
            resolved_round: round,
            teams: game.teams,
            win_probabilities: probabilities,
            winner,
        };
        if self.recent_games.len() == RECENT_GAME_LIMIT {
            self.recent_games.pop_front();
        }
        self.recent_games.push_back(record.clone());

        Ok((record, changes))
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn pool(&self) -> &PlayerPool {
        &self.pool
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    /// Games formed but not yet resolved, oldest first
    pub fn active_games(&self) -> impl Iterator<Item = &Game> {
        self.active.iter()
    }

    /// Players currently assigned to an unresolved game
    pub fn players_in_games(&self) -> usize {
        self.active.iter().map(Game::size).sum()
    }

    /// Most recently resolved games, oldest first
    pub fn recent_games(&self) -> impl Iterator<Item = &GameRecord> {
        self.recent_games.iter()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.metrics.stats
    }

    /// Rating after every round for one player
    pub fn player_history(&self, id: PlayerId) -> Option<&[f64]> {
        let index = self.pool.ids().position(|p| p == id)?;
        self.metrics.player_history(index)
    }

    /// Player rating history smoothed with the configured window
    pub fn smoothed_player_history(&self, id: PlayerId) -> Option<Vec<f64>> {
        self.player_history(id)
            .map(|history| smooth(history, self.metrics.smoothing()))
    }

    /// Snapshot for the reporting layer
    pub fn state(&self) -> SimulationState {
        SimulationState {
            current_round: self.current_round,
            total_players: self.pool.len(),
            waiting: self.queue.len(),
            in_game: self.players_in_games(),
            active_games: self.active.len(),
            regular_average: self.pool.class_average(SkillClass::Regular),
            god_average: self.pool.class_average(SkillClass::God),
            regular_smoothed: self.metrics.stats.latest_smoothed(SkillClass::Regular),
            god_smoothed: self.metrics.stats.latest_smoothed(SkillClass::God),
            config: self.config.clone(),
            players: self.pool.iter().cloned().collect(),
        }
    }

    /// Get current state as JSON for the frontend
    pub fn get_state_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(&self.state())?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationState {
    pub current_round: u64,
    pub total_players: usize,
    pub waiting: usize,
    pub in_game: usize,
    pub active_games: usize,
    pub regular_average: Option<f64>,
    pub god_average: Option<f64>,
    pub regular_smoothed: Option<f64>,
    pub god_smoothed: Option<f64>,
    pub config: SimulationConfig,
    pub players: Vec<Player>,
}

/// Random roster: `count` players with whole-number ratings drawn uniformly
/// from `rating_range`; the first `gods` players are gods starting at the
/// bottom of the range. Fails unless both bounds and the width are finite.
pub fn generate_roster(
    count: usize,
    gods: usize,
    rating_range: (f64, f64),
    seed: u64,
) -> SimResult<Vec<PlayerSpec>> {
    let (low, high) = if rating_range.0 <= rating_range.1 {
        rating_range
    } else {
        (rating_range.1, rating_range.0)
    };
    // The sampler rescales the width, so leave it some headroom
    if !low.is_finite() || !high.is_finite() || !(2.0 * (high - low)).is_finite() {
        return Err(ConfigError::InvalidRatingRange {
            low: rating_range.0,
            high: rating_range.1,
        }
        .into());
    }

    // Separate stream so the roster does not consume the game generator
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let roster: Vec<PlayerSpec> = (0..count)
        .map(|id| {
            let rating: f64 = rng.gen_range(low..=high).round();
            if id < gods {
                PlayerSpec::new(id, low, true)
            } else {
                PlayerSpec::new(id, rating, false)
            }
        })
        .collect();
    Ok(roster)
}

/// Summary of one run in a parameter sweep
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub parameter_value: f64,
    pub rounds: u64,
    pub games_resolved: usize,
    pub regular_average: Option<f64>,
    pub god_average: Option<f64>,
    pub regular_smoothed: Option<f64>,
    pub god_smoothed: Option<f64>,
    pub regular_win_rate: f64,
    pub god_win_rate: f64,
    pub avg_wait: f64,
}

impl ExperimentResult {
    fn from_simulation(parameter_value: f64, sim: &Simulation) -> Self {
        let stats = sim.stats();
        Self {
            parameter_value,
            rounds: stats.rounds,
            games_resolved: stats.games_resolved,
            regular_average: sim.pool().class_average(SkillClass::Regular),
            god_average: sim.pool().class_average(SkillClass::God),
            regular_smoothed: stats.latest_smoothed(SkillClass::Regular),
            god_smoothed: stats.latest_smoothed(SkillClass::God),
            regular_win_rate: stats.class_win_rate(SkillClass::Regular),
            god_win_rate: stats.class_win_rate(SkillClass::God),
            avg_wait: stats.avg_wait_overall(),
        }
    }
}

/// Copy of `base` with one named parameter replaced
pub fn with_parameter(base: &SimulationConfig, parameter: &str, value: f64) -> SimResult<SimulationConfig> {
    let mut config = base.clone();
    match parameter {
        "k_factor" | "k-factor" => config.k_factor = value,
        "god_boost" => config.god_boost = value,
        "nudge" => config.nudge = Some(value),
        "smoothing" => config.smoothing = value as usize,
        "team_size" => config.team_size = value as usize,
        "team_number" => config.team_number = value as usize,
        "max_round" => config.max_round = value as u64,
        _ => return Err(SimError::UnknownParameter(parameter.to_string())),
    }
    Ok(config)
}

/// Rerun the same roster once per value of `parameter`, each run seeded
/// `seed + i`, for `config.max_round` rounds
pub fn run_experiment(
    base: &SimulationConfig,
    roster: &[PlayerSpec],
    parameter: &str,
    values: &[f64],
    seed: u64,
) -> SimResult<Vec<ExperimentResult>> {
    let mut results = Vec::with_capacity(values.len());
    for (i, &value) in values.iter().enumerate() {
        let config = with_parameter(base, parameter, value)?;
        let mut sim = Simulation::new(roster, config, seed.wrapping_add(i as u64))?;
        sim.run()?;
        results.push(ExperimentResult::from_simulation(value, &sim));
    }
    Ok(results)
}

/// Run two configurations on the same roster and seed
pub fn compare_configs(
    config_a: SimulationConfig,
    config_b: SimulationConfig,
    roster: &[PlayerSpec],
    seed: u64,
) -> SimResult<(ExperimentResult, ExperimentResult)> {
    let mut sim_a = Simulation::new(roster, config_a, seed)?;
    sim_a.run()?;
    let mut sim_b = Simulation::new(roster, config_b, seed)?;
    sim_b.run()?;
    Ok((
        ExperimentResult::from_simulation(0.0, &sim_a),
        ExperimentResult::from_simulation(1.0, &sim_b),
    ))
}
