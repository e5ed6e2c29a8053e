//! Error types for the aggregation core.
//!
//! None of these reach callers of `predict_match`/`batch_predict`: the ML
//! client converts them into fallback reasons, and the aggregator downgrades
//! source errors to a missing origin.

use std::time::Duration;

use thiserror::Error;

/// Failure talking to the scoring service over HTTP.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not JSON: {0}")]
    Decode(String),
}

/// Failure of a single scoring-service attempt.
#[derive(Debug, Clone, Error)]
pub enum PredictionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unrecognized response: {0}")]
    UnrecognizedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cancelled")]
    Cancelled,
}

/// Result type for scoring-service operations
pub type ClientResult<T> = Result<T, PredictionError>;

/// Failure of an origin adapter or the match catalog.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{origin} unavailable: {reason}")]
    Unavailable { origin: String, reason: String },
}

impl SourceError {
    pub fn unavailable(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for adapter operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;
