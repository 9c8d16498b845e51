//! Graph snapshots
//!
//! A snapshot is a directory holding two files that are always written and
//! read together:
//! - `graph.bin`: bincode-encoded nodes and edges with their attributes
//! - `metadata.json`: snapshot id, creation time, domain, tool records,
//!   counts and the SHA-256 of `graph.bin`
//!
//! [`SnapshotStore`] publishes snapshots under a root directory. A new
//! snapshot is written to a temporary directory, read back and validated,
//! renamed into place, and only then made current by atomically rewriting
//! the `CURRENT` pointer file. Published snapshots are never modified.

use crate::cocitation::BuildStats;
use crate::errors::{GraphError, Result};
use crate::graph::{CoCitationGraph, EdgeRecord, ToolNode};
use chrono::{DateTime, Utc};
use pubmetric_common::persist::write_atomic;
use pubmetric_common::ToolRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const GRAPH_FILE: &str = "graph.bin";
pub const METADATA_FILE: &str = "metadata.json";
pub const CURRENT_FILE: &str = "CURRENT";

/// Encoding version of `graph.bin`
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GraphData {
    nodes: Vec<ToolNode>,
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub format_version: u32,
    pub domain: String,
    pub node_count: usize,
    pub edge_count: usize,
    /// Hex SHA-256 of `graph.bin`
    pub graph_sha256: String,
    pub tool_records: Vec<ToolRecord>,
    #[serde(default)]
    pub build_stats: Option<BuildStats>,
}

/// A loaded snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub graph: CoCitationGraph,
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Write a snapshot pair into `dir`
pub fn write_snapshot(
    dir: &Path,
    graph: &CoCitationGraph,
    domain: &str,
    tool_records: &[ToolRecord],
    build_stats: Option<BuildStats>,
) -> Result<SnapshotMetadata> {
    fs::create_dir_all(dir)?;

    let data = GraphData {
        nodes: graph.node_records(),
        edges: graph.edge_records(),
    };
    let bytes = bincode::serialize(&data)?;

    let metadata = SnapshotMetadata {
        snapshot_id: Uuid::now_v7(),
        created_at: Utc::now(),
        format_version: FORMAT_VERSION,
        domain: domain.to_string(),
        node_count: data.nodes.len(),
        edge_count: data.edges.len(),
        graph_sha256: digest(&bytes),
        tool_records: tool_records.to_vec(),
        build_stats,
    };

    write_atomic(&dir.join(GRAPH_FILE), &bytes)?;
    write_atomic(&dir.join(METADATA_FILE), &serde_json::to_vec_pretty(&metadata)?)?;
    Ok(metadata)
}

/// Read and validate the snapshot pair in `dir`
pub fn read_snapshot(dir: &Path) -> Result<Snapshot> {
    let path = dir.display().to_string();
    let read = |name: &str| -> Result<Vec<u8>> {
        fs::read(dir.join(name)).map_err(|e| GraphError::SnapshotIncomplete {
            path: path.clone(),
            message: format!("{}: {}", name, e),
        })
    };

    let metadata_bytes = read(METADATA_FILE)?;
    let bytes = read(GRAPH_FILE)?;
    let metadata: SnapshotMetadata = serde_json::from_slice(&metadata_bytes)?;

    let mismatch = |message: String| GraphError::SnapshotMismatch {
        path: path.clone(),
        message,
    };

    if metadata.format_version != FORMAT_VERSION {
        return Err(mismatch(format!("unsupported format version {}", metadata.format_version)));
    }
    let actual = digest(&bytes);
    if actual != metadata.graph_sha256 {
        return Err(mismatch(format!(
            "checksum {} does not match recorded {}",
            actual, metadata.graph_sha256
        )));
    }

    let data: GraphData = bincode::deserialize(&bytes)?;
    if data.nodes.len() != metadata.node_count || data.edges.len() != metadata.edge_count {
        return Err(mismatch(format!(
            "graph has {} nodes and {} edges, metadata records {} and {}",
            data.nodes.len(),
            data.edges.len(),
            metadata.node_count,
            metadata.edge_count
        )));
    }

    let graph = CoCitationGraph::from_parts(data.nodes, data.edges).map_err(|e| mismatch(e.to_string()))?;
    Ok(Snapshot { metadata, graph })
}

/// Directory of published snapshots with a `CURRENT` pointer
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Publish a graph as the new current snapshot
    #[instrument(skip(self, graph, tool_records, build_stats), fields(root = %self.root.display()))]
    pub fn publish(
        &self,
        graph: &CoCitationGraph,
        domain: &str,
        tool_records: &[ToolRecord],
        build_stats: Option<BuildStats>,
    ) -> Result<SnapshotMetadata> {
        fs::create_dir_all(&self.root)?;

        let staging = self.root.join(format!(".staging-{}", Uuid::new_v4()));
        let metadata = match write_snapshot(&staging, graph, domain, tool_records, build_stats)
            .and_then(|written| read_snapshot(&staging).map(|_| written))
        {
            Ok(metadata) => metadata,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    warn!(path = %staging.display(), error = %cleanup, "Failed to remove staging directory");
                }
                return Err(e);
            }
        };

        let id = metadata.snapshot_id.to_string();
        fs::rename(&staging, self.root.join(&id))?;
        write_atomic(&self.root.join(CURRENT_FILE), id.as_bytes())?;

        info!(
            snapshot_id = %id,
            nodes = metadata.node_count,
            edges = metadata.edge_count,
            "Published graph snapshot"
        );
        Ok(metadata)
    }

    /// Identifier of the current snapshot, if any
    pub fn current_id(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.root.join(CURRENT_FILE)) {
            Ok(id) => Ok(Some(id.trim().to_string()).filter(|id| !id.is_empty())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the snapshot the `CURRENT` pointer names
    pub fn load_current(&self) -> Result<Snapshot> {
        let id = self
            .current_id()?
            .ok_or_else(|| GraphError::NoSnapshot(self.root.display().to_string()))?;
        read_snapshot(&self.root.join(id))
    }
}
