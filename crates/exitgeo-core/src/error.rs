//! Error types for exitgeo
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for exitgeo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for exitgeo
#[derive(Error, Debug)]
pub enum Error {
    /// Every discovery endpoint failed to yield a usable address
    #[error("no valid IP address found")]
    NoAddressFound,

    /// No geo database handle is configured
    #[error("geo database unavailable")]
    DatabaseUnavailable,

    /// The resolver was closed; no new work is started
    #[error("resolver is closed")]
    Closed,

    /// Caller-supplied address literal does not parse
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// A single endpoint answered with something unusable
    ///
    /// Rate limits, non-success statuses, explicit failure markers and
    /// bodies without any recognisable field all land here. These never
    /// propagate past the tier that issued the request.
    #[error("endpoint soft failure ({endpoint}): {reason}")]
    EndpointSoftFailure {
        /// Endpoint URL
        endpoint: String,
        /// What was wrong with the answer
        reason: String,
    },

    /// Transport-level failure (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Geo database read/decode failure
    #[error("database error: {0}")]
    Database(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors while loading assets
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(input: impl Into<String>) -> Self {
        Self::InvalidAddress(input.into())
    }

    /// Create an endpoint soft failure
    pub fn soft_failure(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EndpointSoftFailure {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is local to one endpoint
    ///
    /// Tiers swallow these and move on to the next endpoint.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::EndpointSoftFailure { .. } | Self::Http(_) | Self::Json(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
