//! Co-citation graph
//!
//! A simple undirected weighted graph over tools. Nodes are keyed by the
//! tool identifier; an index maps identifiers to petgraph node indices.

use crate::errors::{GraphError, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tool in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolNode {
    pub identifier: String,
    pub display_name: String,

    /// Years since publication, set by enrichment
    pub age: Option<i32>,

    /// Citing papers of the tool, set by enrichment
    pub citation_count: Option<u64>,
}

impl ToolNode {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            display_name: identifier.clone(),
            identifier,
            age: None,
            citation_count: None,
        }
    }
}

/// Edge attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoCitationEdge {
    /// Shared citing papers (plus the direct-citation bonus)
    pub weight: u32,

    /// 1 / weight, set by enrichment
    pub inverted_weight: Option<f64>,
}

impl CoCitationEdge {
    pub fn new(weight: u32) -> Self {
        Self {
            weight,
            inverted_weight: None,
        }
    }
}

/// Flat edge description used for construction and encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub weight: u32,
    pub inverted_weight: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct CoCitationGraph {
    graph: UnGraph<ToolNode, CoCitationEdge>,
    index: HashMap<String, NodeIndex>,
}

impl CoCitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from node and edge lists, checking every invariant
    ///
    /// Rejects duplicate nodes, edges naming unknown nodes, self-loops,
    /// duplicate edges, zero weights and isolated nodes.
    pub fn from_parts(nodes: Vec<ToolNode>, edges: Vec<EdgeRecord>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            if graph.contains(&node.identifier) {
                return Err(GraphError::InvalidGraph(format!("duplicate node {}", node.identifier)));
            }
            graph.add_node(node);
        }

        for edge in edges {
            for endpoint in [&edge.source, &edge.target] {
                if !graph.contains(endpoint) {
                    return Err(GraphError::InvalidGraph(format!("edge names unknown node {}", endpoint)));
                }
            }
            graph.add_edge(&edge.source, &edge.target, edge.weight)?;
            if let Some(e) = graph.edge_mut(&edge.source, &edge.target) {
                e.inverted_weight = edge.inverted_weight;
            }
        }

        if let Some(isolated) = graph.nodes().find(|n| graph.degree(&n.identifier) == 0) {
            return Err(GraphError::InvalidGraph(format!("isolated node {}", isolated.identifier)));
        }

        Ok(graph)
    }

    /// Add a node, returning the existing index when already present
    pub fn add_node(&mut self, node: ToolNode) -> NodeIndex {
        if let Some(&index) = self.index.get(&node.identifier) {
            return index;
        }
        let identifier = node.identifier.clone();
        let index = self.graph.add_node(node);
        self.index.insert(identifier, index);
        index
    }

    /// Add an edge between two existing nodes
    pub fn add_edge(&mut self, a: &str, b: &str, weight: u32) -> Result<()> {
        if a == b {
            return Err(GraphError::InvalidGraph(format!("self-loop on {}", a)));
        }
        if weight == 0 {
            return Err(GraphError::InvalidGraph(format!("zero weight between {} and {}", a, b)));
        }
        let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
            return Err(GraphError::InvalidGraph(format!("edge {}-{} names an unknown node", a, b)));
        };
        if self.graph.find_edge(ia, ib).is_some() {
            return Err(GraphError::InvalidGraph(format!("duplicate edge {}-{}", a, b)));
        }
        self.graph.add_edge(ia, ib, CoCitationEdge::new(weight));
        Ok(())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    pub fn node(&self, identifier: &str) -> Option<&ToolNode> {
        self.index.get(identifier).map(|&i| &self.graph[i])
    }

    pub fn node_mut(&mut self, identifier: &str) -> Option<&mut ToolNode> {
        let index = *self.index.get(identifier)?;
        Some(&mut self.graph[index])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of neighbours (0 for unknown tools)
    pub fn degree(&self, identifier: &str) -> usize {
        self.index
            .get(identifier)
            .map(|&i| self.graph.edges(i).count())
            .unwrap_or(0)
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&CoCitationEdge> {
        let (ia, ib) = (*self.index.get(a)?, *self.index.get(b)?);
        self.graph.find_edge(ia, ib).map(|e| &self.graph[e])
    }

    fn edge_mut(&mut self, a: &str, b: &str) -> Option<&mut CoCitationEdge> {
        let (ia, ib) = (*self.index.get(a)?, *self.index.get(b)?);
        let e = self.graph.find_edge(ia, ib)?;
        Some(&mut self.graph[e])
    }

    /// Three-way weight lookup
    ///
    /// `None` when either tool is not in the graph, `Some(0.0)` when both
    /// are present but not connected (including `a == b`), else the weight.
    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        Some(self.edge(a, b).map(|e| e.weight as f64).unwrap_or(0.0))
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ToolNode> {
        self.graph.node_weights()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut ToolNode> {
        self.graph.node_weights_mut()
    }

    pub fn edge_attributes_mut(&mut self) -> impl Iterator<Item = &mut CoCitationEdge> {
        self.graph.edge_weights_mut()
    }

    /// Edges with endpoints ordered (smaller identifier first), sorted
    pub fn edge_records(&self) -> Vec<EdgeRecord> {
        let mut records: Vec<EdgeRecord> = self
            .graph
            .edge_references()
            .map(|e| {
                let (a, b) = (&self.graph[e.source()].identifier, &self.graph[e.target()].identifier);
                let (source, target) = if a <= b { (a, b) } else { (b, a) };
                EdgeRecord {
                    source: source.clone(),
                    target: target.clone(),
                    weight: e.weight().weight,
                    inverted_weight: e.weight().inverted_weight,
                }
            })
            .collect();
        records.sort_by(|x, y| (&x.source, &x.target).cmp(&(&y.source, &y.target)));
        records
    }

    /// Node list for encoding
    pub fn node_records(&self) -> Vec<ToolNode> {
        self.nodes().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> CoCitationGraph {
        let mut graph = CoCitationGraph::new();
        for id in ["TA", "TC", "TD"] {
            graph.add_node(ToolNode::new(id));
        }
        graph.add_edge("TA", "TC", 2).unwrap();
        graph.add_edge("TC", "TD", 1).unwrap();
        graph
    }

    #[test]
    fn test_three_way_lookup() {
        let graph = scenario();
        assert_eq!(graph.edge_weight("TA", "TC"), Some(2.0));
        assert_eq!(graph.edge_weight("TA", "TD"), Some(0.0));
        assert_eq!(graph.edge_weight("TA", "TA"), Some(0.0));
        assert_eq!(graph.edge_weight("TA", "TX"), None);
        assert_eq!(graph.edge_weight("TX", "TY"), None);
    }

    #[test]
    fn test_lookup_is_symmetric() {
        let graph = scenario();
        for (a, b) in [("TA", "TC"), ("TC", "TD"), ("TA", "TD"), ("TA", "TX")] {
            assert_eq!(graph.edge_weight(a, b), graph.edge_weight(b, a));
        }
    }

    #[test]
    fn test_rejects_self_loops_and_duplicates() {
        let mut graph = scenario();
        assert!(graph.add_edge("TA", "TA", 1).is_err());
        assert!(graph.add_edge("TC", "TA", 1).is_err());
        assert!(graph.add_edge("TA", "TD", 0).is_err());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_degree() {
        let graph = scenario();
        assert_eq!(graph.degree("TC"), 2);
        assert_eq!(graph.degree("TA"), 1);
        assert_eq!(graph.degree("unknown"), 0);
    }

    #[test]
    fn test_from_parts_rejects_isolated_nodes() {
        let err = CoCitationGraph::from_parts(
            vec![ToolNode::new("TA"), ToolNode::new("TB"), ToolNode::new("TC")],
            vec![EdgeRecord {
                source: "TA".into(),
                target: "TB".into(),
                weight: 1,
                inverted_weight: None,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidGraph(_)));
    }

    #[test]
    fn test_edge_records_are_ordered() {
        let graph = scenario();
        let records = graph.edge_records();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].source.as_str(), records[0].target.as_str()), ("TA", "TC"));
        assert_eq!((records[1].source.as_str(), records[1].target.as_str()), ("TC", "TD"));
    }
}
