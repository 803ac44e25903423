//! Error types for the lure generation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Errors from a single bounded request to an external backend.
///
/// Every backend call in the pipeline is caught at the boundary of the
/// component that issued it and converted into a "this stage contributes
/// nothing" outcome; none of these variants abort a run.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors delivering the final text to a result sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write result to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
