//! Queue error types.

use pulse_common::PulseError;
use thiserror::Error;

/// Error reported by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or its response not read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The collection endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The endpoint answered with a non-success status.
    #[error("Delivery failed: {status} - {body}")]
    DeliveryFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, empty if unreadable.
        body: String,
    },

    /// The batch could not be encoded.
    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error reported by a [`UserContext`](crate::UserContext).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Could not fetch id: {0}")]
pub struct IdentityError(pub String);

impl From<TransportError> for PulseError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Serialization(e) => Self::Serialization(e.to_string()),
            other => Self::Delivery(other.to_string()),
        }
    }
}

impl From<IdentityError> for PulseError {
    fn from(err: IdentityError) -> Self {
        Self::IdentityResolution(err.0)
    }
}
