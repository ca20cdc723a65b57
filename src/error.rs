//! Client-facing error types for GG-ACTUATOR.
//!
//! These are rejected requests, never process failures. Provider failures and
//! registration failures have their own types and are absorbed where they occur.

use thiserror::Error;

/// Errors surfaced to the caller of an endpoint operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("Invalid range header: {0}")]
    InvalidRange(String),

    #[error("Unknown metric: {0}")]
    MetricNotFound(String),

    #[error("Unknown logger: {0}")]
    LoggerNotFound(String),

    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
}

impl ActuatorError {
    /// Returns true if the request itself was at fault (4xx class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange(_)
                | Self::MetricNotFound(_)
                | Self::LoggerNotFound(_)
                | Self::UnknownLevel(_)
        )
    }

    /// HTTP status an adapter should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRange(_) => 416,
            Self::MetricNotFound(_) | Self::LoggerNotFound(_) => 404,
            Self::UnknownLevel(_) => 400,
        }
    }
}
