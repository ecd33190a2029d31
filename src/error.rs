use thiserror::Error;

/// Errors raised while building sources, stages and configuration.
///
/// A running session never produces one of these: per-candidate failures are
/// absorbed by the workers and only an [`Outcome`](crate::Outcome) comes back.
#[derive(Error, Debug)]
pub enum Error {
    #[error("alphabet must not be empty")]
    EmptyAlphabet,

    #[error("alphabet contains duplicate symbol '{0}'")]
    DuplicateSymbol(char),

    #[error("invalid length range: min {min} > max {max}")]
    InvalidLengthRange { min: usize, max: usize },

    #[error("keyspace of {radix}^{max} candidates does not fit a 64-bit index")]
    KeyspaceTooLarge { radix: usize, max: usize },

    #[error("stage '{0}' needs at least one worker")]
    NoWorkers(String),

    #[error("invalid year range: {first} > {last}")]
    InvalidYearRange { first: u16, last: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
