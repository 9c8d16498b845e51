//! Graph attribute enrichment

use crate::errors::{GraphError, Result};
use crate::graph::CoCitationGraph;
use pubmetric_common::{ToolRecord, MISSING_YEAR_OFFSET};
use std::collections::HashMap;
use tracing::debug;

/// Attach display names, ages, citation counts and inverted weights
///
/// Tools without a publication year get `current_year - MISSING_YEAR_OFFSET`,
/// unknown citation counts become 0. Every node must have a record.
pub fn enrich(mut graph: CoCitationGraph, records: &[ToolRecord], current_year: i32) -> Result<CoCitationGraph> {
    let by_identifier: HashMap<&str, &ToolRecord> =
        records.iter().map(|r| (r.identifier.as_str(), r)).collect();

    for node in graph.nodes_mut() {
        let record = by_identifier
            .get(node.identifier.as_str())
            .ok_or_else(|| GraphError::MissingToolRecord {
                identifier: node.identifier.clone(),
            })?;

        let year = record.publication_year.unwrap_or(current_year - MISSING_YEAR_OFFSET);
        node.display_name = record.display_name.clone();
        node.age = Some(current_year - year);
        node.citation_count = Some(record.citation_count.unwrap_or(0));
    }

    for edge in graph.edge_attributes_mut() {
        edge.inverted_weight = Some(1.0 / edge.weight as f64);
    }

    debug!(nodes = graph.node_count(), edges = graph.edge_count(), current_year, "Graph enriched");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ToolNode;

    fn graph() -> CoCitationGraph {
        let mut graph = CoCitationGraph::new();
        graph.add_node(ToolNode::new("TA"));
        graph.add_node(ToolNode::new("TB"));
        graph.add_edge("TA", "TB", 4).unwrap();
        graph
    }

    #[test]
    fn test_enrich_sets_attributes() {
        let records = vec![
            ToolRecord::new("TA", "Comet").with_year(Some(2013)).with_citation_count(120),
            ToolRecord::new("TB", "Mascot"),
        ];

        let graph = enrich(graph(), &records, 2024).unwrap();

        let comet = graph.node("TA").unwrap();
        assert_eq!(comet.display_name, "Comet");
        assert_eq!(comet.age, Some(11));
        assert_eq!(comet.citation_count, Some(120));

        let mascot = graph.node("TB").unwrap();
        assert_eq!(mascot.age, Some(100));
        assert_eq!(mascot.citation_count, Some(0));

        assert_eq!(graph.edge("TA", "TB").unwrap().inverted_weight, Some(0.25));
    }

    #[test]
    fn test_missing_record_is_fatal() {
        let records = vec![ToolRecord::new("TA", "Comet")];
        let err = enrich(graph(), &records, 2024).unwrap_err();
        assert!(matches!(err, GraphError::MissingToolRecord { identifier } if identifier == "TB"));
    }
}
