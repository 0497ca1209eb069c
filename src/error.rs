//! Error type shared by the crate.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Recoverable failures surfaced by the store.
///
/// Graph operations themselves never fail: absent vertices and edges yield
/// empty results, and broken structural invariants panic. Errors are limited
/// to configuration and background-thread plumbing.
#[derive(Debug, Error)]
pub enum GraphError {
    /// I/O failure while reading configuration or spawning a worker thread.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Configuration text could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
    /// Options were rejected during validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The compactor loop has already shut down.
    #[error("compactor channel closed")]
    CompactorClosed,
}

impl From<toml::de::Error> for GraphError {
    fn from(err: toml::de::Error) -> Self {
        GraphError::Config(err.to_string())
    }
}
