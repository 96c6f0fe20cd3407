//! Error types used throughout the client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for SpBridge
///
/// Every public operation returns this through [`Result`]; none of them
/// panic or abort the host.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SpError {
    /// Write token acquisition failed or the response was malformed.
    #[error("Token unavailable: {0}")]
    TokenUnavailable(String),

    /// The context-info response was well formed but carried no token.
    #[error("No digest provided")]
    NoTokenProvided,

    /// An update was attempted but the item's version tag could not be read.
    #[error("No concurrency tag: {0}")]
    NoConcurrencyTag(String),

    /// A local-mode read was requested without a fixture location.
    #[error("No static data in dev: {0}")]
    NoLocalFixture(String),

    /// Required call parameters were missing or empty.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The underlying transport failed before producing a response.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The platform answered with a non-success status.
    #[error("{url} returned status {status}: {body}")]
    HttpStatus { status: u16, url: String, body: String },

    /// A payload could not be serialized or a response could not be parsed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SpError {
    /// True for failures produced by the transport or the remote platform,
    /// as opposed to failures detected locally before any call was made.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }

    /// True when the platform rejected a conditional write because the
    /// version tag no longer matches (HTTP 412).
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 412, .. })
    }
}

impl From<serde_json::Error> for SpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for SpBridge operations
pub type Result<T> = std::result::Result<T, SpError>;
