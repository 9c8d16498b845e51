//! Resumable citation collection state

use pubmetric_common::persist::{read_json_optional, write_json_atomic};
use pubmetric_common::{AppError, CitationRelation, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Partial collection result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub relation: CitationRelation,
    /// Identifiers whose fetch failed; refetched on resume
    #[serde(default)]
    pub failed: BTreeSet<String>,
}

impl CheckpointState {
    /// Whether `identifier` has a completed entry
    pub fn is_done(&self, identifier: &str) -> bool {
        self.relation.contains(identifier) && !self.failed.contains(identifier)
    }
}

/// Checkpoint file handle
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved state; a missing file is an empty state
    pub fn load(&self) -> Result<CheckpointState> {
        read_json_optional(&self.path)
            .map(Option::unwrap_or_default)
            .map_err(|e| self.error(e))
    }

    pub fn save(&self, state: &CheckpointState) -> Result<()> {
        write_json_atomic(&self.path, state).map_err(|e| self.error(e))
    }

    /// Remove the checkpoint once its content has been consumed
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e.into())),
        }
    }

    fn error(&self, e: AppError) -> AppError {
        AppError::Checkpoint {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}
