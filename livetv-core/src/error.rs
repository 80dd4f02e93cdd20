use thiserror::Error;

use crate::source::FetchError;

/// Engine-wide error type.
///
/// Every variant owns plain data so the error can be cloned and handed to
/// every waiter of a single-flight population.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Parse error in {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn parse(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
