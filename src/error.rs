use crate::types::{GameId, PlayerId};

/// Setup-time configuration problems. The simulation refuses to start on any of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("team_size must be at least 1")]
    ZeroTeamSize,
    #[error("team_number must be at least 1")]
    ZeroTeamNumber,
    #[error("a game needs {required} players ({team_number} teams of {team_size}) but the pool only has {pool_size}")]
    PoolTooSmall {
        required: usize,
        team_number: usize,
        team_size: usize,
        pool_size: usize,
    },
    #[error("{team_number} teams of {team_size} players overflows the game size")]
    GameSizeOverflow { team_number: usize, team_size: usize },
    #[error("rating range [{low}, {high}] must have finite bounds and a finite width")]
    InvalidRatingRange { low: f64, high: f64 },
    #[error("smoothing window must be at least 1")]
    ZeroSmoothing,
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidParameter { name: &'static str, value: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("player {0} does not exist")]
    UnknownPlayer(PlayerId),
    #[error("player {0} appears more than once in the roster")]
    DuplicatePlayer(PlayerId),
    #[error("player {id} has a non-finite rating ({rating})")]
    InvalidRating { id: PlayerId, rating: f64 },
    #[error("game {game} has {teams} teams but {probabilities} expected scores")]
    ExpectationMismatch {
        game: GameId,
        teams: usize,
        probabilities: usize,
    },
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
