//! Error type for E2E protection profile operations.

use thiserror::Error;

/// Failures raised by E2E protection and validation (§4.4, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum E2eError {
    /// The message's DataID, CRC, or counter did not match what the
    /// profile's configuration expects.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The freshness value falls outside the configured tolerance window.
    #[error("freshness timeout: {0}")]
    Timeout(String),

    /// No profile is registered for the requested id or name.
    #[error("profile not initialized: {0}")]
    NotInitialized(String),

    /// A profile with this id or name is already registered.
    #[error("duplicate profile registration: {0}")]
    DuplicateProfile(String),
}

/// Result alias used throughout the E2E engine.
pub type Result<T> = std::result::Result<T, E2eError>;
