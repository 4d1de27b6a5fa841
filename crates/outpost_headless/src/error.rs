//! Error type for the headless driver.

use std::path::PathBuf;

use outpost_core::error::GameError;
use thiserror::Error;

/// Errors raised while loading files or talking over the protocol.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to read or write a file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read stdin or write stdout.
    #[error("Protocol stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// Content or snapshot rejected by the engine.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Timestamp argument is not RFC 3339.
    #[error("Invalid timestamp '{value}': {message}")]
    Timestamp {
        /// Text that failed to parse.
        value: String,
        /// Parser message.
        message: String,
    },
}

/// Result alias for the headless driver.
pub type Result<T> = std::result::Result<T, HeadlessError>;
