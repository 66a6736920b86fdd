//! Unified error type for the price pusher.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The price source could not be reached or answered with a failure status.
    #[error("price fetch failed: {0}")]
    Fetch(String),

    /// The price source answered with a body that is not a valid price list.
    #[error("price list parse error: {0}")]
    Parse(String),

    #[error("no current price found, no fresh data?")]
    NoCurrentPrice,

    /// Submission to the metric sink failed or ran past its deadline.
    #[error("metric sink error: {0}")]
    Sink(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}
