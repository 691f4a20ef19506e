//! Centralized error types for the Beacon workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to subsystems.
///
/// Per-recipient outcomes (unresolved, ineligible, delivery failure) are
/// data, see [`crate::types::UnreachableReason`]. Only failures that make
/// the whole trigger meaningless surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BeaconError {
    #[error("Account directory error: {0}")]
    Directory(String),

    #[error("Contact store error: {0}")]
    ContactStore(String),

    #[error("Unable to determine reachability: {0}")]
    Reachability(String),

    #[error("Push gateway error: {0}")]
    Gateway(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Contact already added: {0}")]
    DuplicateContact(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BeaconResult<T> = Result<T, BeaconError>;
