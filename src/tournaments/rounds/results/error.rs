use crate::tournaments::{config::ConfigurationError, rounds::Side};

/// Errors raised by debate results. Apart from [`ResultError::Database`],
/// these all indicate that the caller broke the contract of the result
/// object, and are never recovered from internally.
#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    #[error("tried to {0} an invalid result")]
    InvalidResult(&'static str),
    #[error("the scoresheet for {0} does not have a winner")]
    MissingWinner(String),
    #[error("team {team} is not in debate {debate}")]
    TeamNotInDebate { team: String, debate: String },
    #[error("expected one team for each of the {expected} sides, got {got}")]
    WrongTeamCount { expected: usize, got: usize },
    #[error("set sides using set_sides() before setting speakers")]
    SidesNotSet,
    #[error("judge {0} does not have a scoresheet in this debate")]
    UnknownAdjudicator(String),
    #[error("{0:?} is not a side of this debate")]
    UnknownSide(Side),
    #[error("{0} is not a speaker position in this tournament")]
    UnknownPosition(i64),
    #[error("the result buffers are malformed: {0}")]
    Structure(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}
