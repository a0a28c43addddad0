//! Error types for pulse-rs.

use thiserror::Error;

/// Tracker result type.
pub type PulseResult<T> = Result<T, PulseError>;

/// Tracker error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PulseError {
    // === Construction ===
    /// Missing or invalid options.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The user context could not produce an identity.
    #[error("Identity resolution failed: {0}")]
    IdentityResolution(String),

    // === Event construction ===
    /// A required sub-object is missing or empty.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// A payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // === Delivery ===
    /// The transport failed; payloads were requeued.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Misuse or an unexpected state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PulseError {
    /// Returns the error code used in logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIG_ERROR",
            Self::IdentityResolution(_) => "IDENTITY_RESOLUTION_ERROR",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Delivery(_) => "DELIVERY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failed work stays queued for a later attempt.
    ///
    /// Only delivery failures are recovered locally; everything else is
    /// fatal to the operation that raised it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

// === From implementations ===

impl From<config::ConfigError> for PulseError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for PulseError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for PulseError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
