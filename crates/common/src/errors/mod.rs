//! Error types for Pubmetric
//!
//! Provides a single error taxonomy shared by every crate:
//! - Caller errors (malformed workflows, bad options)
//! - Degraded upstream failures (retry budgets exhausted)
//! - Fatal pipeline failures (registry unreachable, snapshot mismatch,
//!   enrichment invariant violations)
//! - Error codes for machine-readable reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Caller errors (1xxx)
    ValidationError,
    InvalidFormat,
    InvalidWorkflow,
    UnknownMetric,

    // Resource errors (4xxx)
    NotFound,
    MissingToolRecord,

    // Persistence errors (7xxx)
    SnapshotMismatch,
    SnapshotCorrupt,
    CheckpointError,

    // External service errors (8xxx)
    UpstreamError,
    UpstreamStatus,
    RetriesExhausted,
    RegistryUnavailable,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Caller (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::InvalidWorkflow => 1004,
            ErrorCode::UnknownMetric => 1005,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::MissingToolRecord => 4002,

            // Persistence (7xxx)
            ErrorCode::SnapshotMismatch => 7001,
            ErrorCode::SnapshotCorrupt => 7002,
            ErrorCode::CheckpointError => 7003,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamStatus => 8002,
            ErrorCode::RetriesExhausted => 8003,
            ErrorCode::RegistryUnavailable => 8004,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Caller errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid workflow: {message}")]
    InvalidWorkflow { message: String },

    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Graph node {identifier} has no matching tool record")]
    MissingToolRecord { identifier: String },

    // Persistence errors
    #[error("Snapshot mismatch: {message}")]
    SnapshotMismatch { message: String },

    #[error("Snapshot corrupt: {message}")]
    SnapshotCorrupt { message: String },

    #[error("Checkpoint error at {path}: {message}")]
    Checkpoint { path: String, message: String },

    // External service errors
    #[error("Upstream request to {url} failed: {message}")]
    Upstream { url: String, message: String },

    #[error("Upstream {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Giving up on {url} after {attempts} attempts: {message}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Registry unavailable for domain {domain}: {message}")]
    RegistryUnavailable { domain: String, message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::InvalidWorkflow { .. } => ErrorCode::InvalidWorkflow,
            AppError::UnknownMetric { .. } => ErrorCode::UnknownMetric,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::MissingToolRecord { .. } => ErrorCode::MissingToolRecord,
            AppError::SnapshotMismatch { .. } => ErrorCode::SnapshotMismatch,
            AppError::SnapshotCorrupt { .. } => ErrorCode::SnapshotCorrupt,
            AppError::Checkpoint { .. } => ErrorCode::CheckpointError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::UpstreamStatus { .. } => ErrorCode::UpstreamStatus,
            AppError::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            AppError::RegistryUnavailable { .. } => ErrorCode::RegistryUnavailable,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Whether this error aborts a pipeline run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::RegistryUnavailable { .. }
                | AppError::SnapshotMismatch { .. }
                | AppError::SnapshotCorrupt { .. }
                | AppError::MissingToolRecord { .. }
                | AppError::Configuration { .. }
        )
    }

    /// Whether a request that produced this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Upstream { .. } => true,
            AppError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if this error was caused by bad caller input
    pub fn is_caller_error(&self) -> bool {
        (1000..2000).contains(&self.code().as_code())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
