//! Graph crate error types

use pubmetric_common::AppError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph invariant violated: {0}")]
    InvalidGraph(String),

    #[error("Node {identifier} has no tool record")]
    MissingToolRecord { identifier: String },

    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid scoring options: {0}")]
    InvalidOptions(String),

    #[error("No snapshot published under {0}")]
    NoSnapshot(String),

    #[error("Snapshot {path} is incomplete: {message}")]
    SnapshotIncomplete { path: String, message: String },

    #[error("Snapshot {path} is inconsistent: {message}")]
    SnapshotMismatch { path: String, message: String },

    #[error("Graph encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] AppError),
}

impl From<GraphError> for AppError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::MissingToolRecord { identifier } => AppError::MissingToolRecord { identifier },
            GraphError::InvalidWorkflow(message) => AppError::InvalidWorkflow { message },
            GraphError::UnknownMetric(name) => AppError::UnknownMetric { name },
            GraphError::InvalidOptions(message) => AppError::Validation {
                message,
                field: Some("options".to_string()),
            },
            GraphError::NoSnapshot(path) => AppError::NotFound {
                resource_type: "snapshot".to_string(),
                id: path,
            },
            GraphError::SnapshotMismatch { path, message } => AppError::SnapshotMismatch {
                message: format!("{}: {}", path, message),
            },
            GraphError::SnapshotIncomplete { path, message } => AppError::SnapshotCorrupt {
                message: format!("{}: {}", path, message),
            },
            GraphError::Encoding(e) => AppError::SnapshotCorrupt { message: e.to_string() },
            GraphError::Metadata(e) => AppError::Serialization(e),
            GraphError::Io(e) => e.into(),
            GraphError::InvalidGraph(message) => AppError::Internal { message },
            GraphError::Common(e) => e,
        }
    }
}
