//! Unified error type for the origin.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session pipeline.
///
/// Malformed ingress data never produces an error; it degrades to sentinel
/// values (nil UUID, `Unknown` enums, null IP) and the session is still
/// created.
#[derive(Debug, Error)]
pub enum Error {
    /// The sink connection could not be acquired or a bulk copy failed.
    #[error("sink error: {0}")]
    Sink(String),

    /// A sink operation was cancelled by the shutdown deadline.
    #[error("sink operation cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
