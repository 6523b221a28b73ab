/// Core error type.
///
/// Only lookup and construction failures are errors. Rejected player input
/// is reported by the puzzle itself (`false` + feedback), and a timeout is
/// an ordinary puzzle outcome.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("unknown puzzle type: {0}")]
    UnknownPuzzleType(String),

    #[error("unknown ability: {0}")]
    UnknownAbility(String),

    #[error("unknown anomaly: {0}")]
    UnknownAnomaly(String),

    #[error("memory node {0} does not exist")]
    NodeNotFound(usize),

    #[error("no puzzle is active")]
    NoActivePuzzle,

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
