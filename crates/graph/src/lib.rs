//! Pubmetric graph library
//!
//! - [`cocitation`]: builds the co-citation graph from collected citations
//! - [`enrich`]: attaches tool attributes to nodes and edges
//! - [`snapshot`]: persists graphs as validated, immutable snapshots
//! - [`workflow`] and [`scoring`]: score workflows against a graph

pub mod cocitation;
pub mod enrich;
pub mod errors;
pub mod graph;
pub mod scoring;
pub mod snapshot;
pub mod workflow;

pub use cocitation::{build_graph, BuildOptions, BuildStats};
pub use enrich::enrich;
pub use errors::GraphError;
pub use graph::{CoCitationEdge, CoCitationGraph, EdgeRecord, ToolNode};
pub use scoring::{score, Metric, ScoreOptions, ScoreValue};
pub use snapshot::{Snapshot, SnapshotMetadata, SnapshotStore};
pub use workflow::Workflow;
