//! Error types for the station simulation.
//!
//! The engine itself never fails a tick or an action: insufficient funds,
//! unknown identifiers and numeric drift all degrade to logged no-ops.
//! These errors only surface at parse, validation and serialization
//! boundaries.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Failed to parse a content file.
    #[error("Failed to parse content '{source_name}': {message}")]
    ContentParse {
        /// Name of the content source (file name or "inline").
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Content data failed validation.
    #[error("Content validation failed: {0:?}")]
    ContentValidation(Vec<String>),

    /// Failed to parse a persisted snapshot.
    #[error("Failed to parse snapshot: {0}")]
    SnapshotParse(String),

    /// Upgrade key is not of the form `<station>:<upgradeKind>` or names
    /// an unknown station or kind.
    #[error("Unknown upgrade key: {0}")]
    UnknownUpgrade(String),

    /// Station name is not one of the four stations.
    #[error("Unknown station: {0}")]
    UnknownStation(String),

    /// Resource name is not one of the four resources.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// No enemy is defined for the requested region and tier.
    #[error("No enemy defined for region '{region}' tier {tier}")]
    UnknownEnemy {
        /// Requested region.
        region: String,
        /// Requested difficulty tier.
        tier: u32,
    },

    /// Engine checkpoint could not be encoded or decoded.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Invalid engine state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
