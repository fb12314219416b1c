//! Error types shared across the board.
//!
//! Read paths never return these: they degrade through the cache tiers
//! instead. Admin writes and imports surface them to the operator.

use thiserror::Error;

/// Failure of a call to the hosted backend.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend answered with status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Failure of an admin operation.
#[derive(Error, Debug)]
pub enum BoardError {
    /// The backend could not be reached or refused the write.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(#[from] GatewayError),

    /// Input rejected before any write happened.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The caller is not an admin, or their profile could not be checked.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("import failed: {0}")]
    Import(String),
}
