//! Common error types for DARIA tools

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for DARIA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the DARIA tools
#[derive(Error, Debug)]
pub enum Error {
    /// Session file could not be decoded into a JSON object
    #[error("Malformed session {id}: {reason}")]
    MalformedSession { id: String, reason: String },

    /// Session file does not exist
    #[error("Session not found: {0}")]
    MissingSession(String),

    /// Guide file could not be decoded
    #[error("Malformed guide {}: {reason}", .path.display())]
    MalformedGuide { path: PathBuf, reason: String },

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecoverable condition detected before any item was processed
    #[error("Startup failure: {0}")]
    Startup(String),
}
