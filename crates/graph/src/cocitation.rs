//! Co-citation graph builder
//!
//! Two tools are co-cited when the same paper cites both. The builder:
//! 1. Inverts the citation relation into citation groups (citing paper ->
//!    distinct cited tools), dropping self-citations
//! 2. Discards groups citing more than `degree_threshold` tools
//! 3. Counts every unordered tool pair of each remaining group
//! 4. Drops pairs below `min_cocitations`
//! 5. Adds the direct-citation bonus (+1 when one tool cites the other)
//! 6. Materializes the surviving pairs as a graph over connected tools
//!
//! Tool identifiers are interned to `u32` in sorted order so pair keys are
//! ordered the same way as the identifiers themselves. Large inputs are
//! counted in parallel chunks with rayon and merged by summation.

use crate::errors::Result;
use crate::graph::{CoCitationGraph, ToolNode};
use pubmetric_common::config::GraphConfig;
use pubmetric_common::{metrics, CitationRelation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, instrument};

/// Unordered tool pair, smaller interned index first
type Pair = (u32, u32);

/// Builder policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub degree_threshold: usize,
    pub min_cocitations: u32,
    pub direct_citation_bonus: bool,
    pub parallel_threshold: usize,
    pub num_chunks: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

impl From<&GraphConfig> for BuildOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            degree_threshold: config.degree_threshold,
            min_cocitations: config.min_cocitations.max(1),
            direct_citation_bonus: config.direct_citation_bonus,
            parallel_threshold: config.parallel_threshold,
            num_chunks: config.num_chunks.max(1),
        }
    }
}

/// What happened to the input on its way into the graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub tools: usize,
    /// Distinct citing papers citing at least one tool
    pub citation_groups: usize,
    pub groups_over_threshold: usize,
    pub singleton_groups: usize,
    pub pairs_counted: usize,
    pub pairs_after_filter: usize,
    pub direct_citation_pairs: usize,
    /// Pairs that exist only because of the direct-citation bonus
    pub bonus_edges_created: usize,
    pub nodes: usize,
    pub edges: usize,
    /// Tools without any qualifying edge
    pub included_tools_filtered_out: usize,
    pub parallel: bool,
}

/// Build the co-citation graph of `tools` from the collected citations
#[instrument(skip(relation, tools), fields(tools = tools.len(), cited = relation.len()))]
pub fn build_graph(
    relation: &CitationRelation,
    tools: &[String],
    options: &BuildOptions,
) -> Result<(CoCitationGraph, BuildStats)> {
    let interned: Vec<&str> = tools
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let lookup: HashMap<&str, u32> = interned
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as u32))
        .collect();

    let mut stats = BuildStats {
        tools: interned.len(),
        ..Default::default()
    };

    // citing paper -> distinct cited tools
    let mut groups: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
    // citing tool -> pairs it earns through direct citation
    let mut direct: BTreeMap<&str, BTreeSet<Pair>> = BTreeMap::new();
    for (cited, citing_papers) in relation.iter() {
        let Some(&cited_index) = lookup.get(cited.as_str()) else {
            continue;
        };
        for citing in citing_papers {
            if citing == cited {
                continue;
            }
            groups.entry(citing.as_str()).or_default().insert(cited_index);
            if let Some(&citing_index) = lookup.get(citing.as_str()) {
                direct
                    .entry(citing.as_str())
                    .or_default()
                    .insert(ordered(citing_index, cited_index));
            }
        }
    }
    stats.citation_groups = groups.len();

    let mut counted: Vec<Vec<u32>> = Vec::with_capacity(groups.len());
    for (citing, group) in groups {
        if group.len() > options.degree_threshold {
            stats.groups_over_threshold += 1;
            // a tool citing too many tools earns no bonus either
            direct.remove(citing);
        } else if group.len() < 2 {
            stats.singleton_groups += 1;
        } else {
            counted.push(group.into_iter().collect());
        }
    }

    stats.parallel = counted.len() > options.parallel_threshold;
    let mut counts = if stats.parallel {
        count_pairs_parallel(&counted, options.num_chunks)
    } else {
        count_pairs(&counted)
    };
    stats.pairs_counted = counts.len();

    counts.retain(|_, weight| *weight >= options.min_cocitations);
    stats.pairs_after_filter = counts.len();

    if options.direct_citation_bonus {
        let direct: BTreeSet<Pair> = direct.into_values().flatten().collect();
        stats.direct_citation_pairs = direct.len();
        for pair in direct {
            let weight = counts.entry(pair).or_insert(0);
            if *weight == 0 {
                stats.bonus_edges_created += 1;
            }
            *weight += 1;
        }
    }

    let mut edges: Vec<(Pair, u32)> = counts.into_iter().collect();
    edges.sort_unstable();

    let mut graph = CoCitationGraph::new();
    let connected: BTreeSet<u32> = edges.iter().flat_map(|((a, b), _)| [*a, *b]).collect();
    for index in &connected {
        graph.add_node(ToolNode::new(interned[*index as usize]));
    }
    for ((a, b), weight) in &edges {
        graph.add_edge(interned[*a as usize], interned[*b as usize], *weight)?;
    }

    stats.nodes = graph.node_count();
    stats.edges = graph.edge_count();
    stats.included_tools_filtered_out = stats.tools - stats.nodes;

    debug!(?stats, "Pair counting complete");
    info!(
        nodes = stats.nodes,
        edges = stats.edges,
        groups_over_threshold = stats.groups_over_threshold,
        included_tools_filtered_out = stats.included_tools_filtered_out,
        "Co-citation graph built"
    );
    metrics::record_graph(stats.nodes, stats.edges);

    Ok((graph, stats))
}

fn ordered(a: u32, b: u32) -> Pair {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Count every unordered pair of each (sorted, deduplicated) group
fn count_pairs(groups: &[Vec<u32>]) -> HashMap<Pair, u32> {
    let mut counts = HashMap::new();
    for group in groups {
        for (i, &a) in group.iter().enumerate() {
            for &b in &group[i + 1..] {
                *counts.entry((a, b)).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn count_pairs_parallel(groups: &[Vec<u32>], num_chunks: usize) -> HashMap<Pair, u32> {
    let chunk_size = groups.len().div_ceil(num_chunks.max(1)).max(1);
    groups
        .par_chunks(chunk_size)
        .map(count_pairs)
        .reduce(HashMap::new, |mut merged, partial| {
            for (pair, weight) in partial {
                *merged.entry(pair).or_insert(0) += weight;
            }
            merged
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubmetric_common::CitationEdge;

    fn relation(edges: &[(&str, &str)]) -> CitationRelation {
        CitationRelation::from_edges(edges.iter().map(|(citing, cited)| CitationEdge::new(*citing, *cited)))
    }

    fn tools(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn scenario() -> CitationRelation {
        relation(&[
            ("CC", "TA"),
            ("CC", "TC"),
            ("CD", "TA"),
            ("CD", "TC"),
            ("CE", "TC"),
            ("CE", "TD"),
        ])
    }

    #[test]
    fn test_scenario_weights() {
        let (graph, stats) =
            build_graph(&scenario(), &tools(&["TA", "TC", "TD"]), &BuildOptions::default()).unwrap();

        assert_eq!(graph.edge_weight("TA", "TC"), Some(2.0));
        assert_eq!(graph.edge_weight("TC", "TD"), Some(1.0));
        assert_eq!(graph.edge_weight("TA", "TD"), Some(0.0));
        assert_eq!(stats.citation_groups, 3);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.included_tools_filtered_out, 0);
    }

    #[test]
    fn test_paper_citing_too_many_tools_contributes_nothing() {
        let ids: Vec<String> = (0..25).map(|i| format!("T{i:02}")).collect();
        let edges: Vec<(String, String)> = ids.iter().map(|t| ("BIG".to_string(), t.clone())).collect();
        let relation = CitationRelation::from_edges(edges.iter().map(|(c, t)| CitationEdge::new(c, t)));

        let (graph, stats) = build_graph(&relation, &ids, &BuildOptions::default()).unwrap();

        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(stats.groups_over_threshold, 1);
        assert_eq!(stats.included_tools_filtered_out, 25);
    }

    #[test]
    fn test_tool_citing_too_many_tools_earns_no_bonus() {
        let ids: Vec<String> = (0..26).map(|i| format!("T{i:02}")).collect();
        let relation = CitationRelation::from_edges(ids[1..].iter().map(|t| CitationEdge::new("T00", t.clone())));

        let (graph, stats) = build_graph(&relation, &ids, &BuildOptions::default()).unwrap();

        assert_eq!(graph.edge_count(), 0);
        assert_eq!(stats.groups_over_threshold, 1);
        assert_eq!(stats.direct_citation_pairs, 0);
        assert_eq!(stats.included_tools_filtered_out, 26);
    }

    #[test]
    fn test_weights_ignore_citing_list_order() {
        let ids: Vec<String> = (0..12).map(|i| format!("T{i:02}")).collect();
        let mut forward = CitationRelation::new();
        let mut reversed = CitationRelation::new();
        let mut rotated = CitationRelation::new();
        for (n, tool) in ids.iter().enumerate() {
            let mut citing: Vec<String> = (0..30)
                .filter(|p| (p * 5 + n) % 3 != 0)
                .map(|p| format!("P{p}"))
                .collect();
            // tools citing each other exercise the bonus as well
            citing.push(ids[(n + 1) % ids.len()].clone());
            forward.insert(tool.clone(), citing.clone());

            citing.reverse();
            reversed.insert(tool.clone(), citing.clone());

            let len = citing.len();
            citing.rotate_left(n % len);
            rotated.insert(tool.clone(), citing);
        }

        let (expected, _) = build_graph(&forward, &ids, &BuildOptions::default()).unwrap();
        for relation in [&reversed, &rotated] {
            let (graph, _) = build_graph(relation, &ids, &BuildOptions::default()).unwrap();
            assert_eq!(graph.edge_records(), expected.edge_records());
        }
        assert!(expected.edge_count() > 0);
    }

    #[test]
    fn test_duplicates_and_self_citations_are_ignored() {
        let mut relation = CitationRelation::new();
        relation.insert("TA", tools(&["CC", "CC", "TA"]));
        relation.insert("TB", tools(&["CC", "TB"]));

        let (graph, _) = build_graph(&relation, &tools(&["TA", "TB"]), &BuildOptions::default()).unwrap();

        assert_eq!(graph.edge_weight("TA", "TB"), Some(1.0));
        assert!(graph.edge("TA", "TA").is_none());
    }

    #[test]
    fn test_direct_citation_bonus() {
        // TB's paper cites TA; CX cites both
        let relation = relation(&[("TB", "TA"), ("TB", "TA"), ("CX", "TA"), ("CX", "TB"), ("TC", "TD")]);
        let ids = tools(&["TA", "TB", "TC", "TD"]);

        let (graph, stats) = build_graph(&relation, &ids, &BuildOptions::default()).unwrap();
        assert_eq!(graph.edge_weight("TA", "TB"), Some(2.0));
        assert_eq!(graph.edge_weight("TC", "TD"), Some(1.0));
        assert_eq!(stats.direct_citation_pairs, 2);
        assert_eq!(stats.bonus_edges_created, 1);

        let without = BuildOptions {
            direct_citation_bonus: false,
            ..BuildOptions::default()
        };
        let (graph, _) = build_graph(&relation, &ids, &without).unwrap();
        assert_eq!(graph.edge_weight("TA", "TB"), Some(1.0));
        assert!(!graph.contains("TC"));
    }

    #[test]
    fn test_min_cocitations_filters_weak_pairs() {
        let options = BuildOptions {
            min_cocitations: 2,
            ..BuildOptions::default()
        };
        let (graph, stats) = build_graph(&scenario(), &tools(&["TA", "TC", "TD"]), &options).unwrap();

        assert_eq!(graph.edge_weight("TA", "TC"), Some(2.0));
        assert_eq!(graph.edge_weight("TC", "TD"), None);
        assert_eq!(stats.pairs_counted, 2);
        assert_eq!(stats.pairs_after_filter, 1);
        assert_eq!(stats.included_tools_filtered_out, 1);
    }

    #[test]
    fn test_only_included_tools_are_counted() {
        let (graph, _) = build_graph(&scenario(), &tools(&["TA", "TC"]), &BuildOptions::default()).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(!graph.contains("TD"));
    }

    #[test]
    fn test_parallel_counting_matches_single_pass() {
        let ids: Vec<String> = (0..40).map(|i| format!("T{i:02}")).collect();
        let mut edges = Vec::new();
        for paper in 0..300 {
            for offset in 0..(paper % 5 + 1) {
                let tool = &ids[(paper * 7 + offset * 3) % ids.len()];
                edges.push(CitationEdge::new(format!("P{paper}"), tool.clone()));
            }
        }
        let relation = CitationRelation::from_edges(edges);

        let sequential = BuildOptions::default();
        let parallel = BuildOptions {
            parallel_threshold: 0,
            num_chunks: 7,
            ..BuildOptions::default()
        };

        let (a, sa) = build_graph(&relation, &ids, &sequential).unwrap();
        let (b, sb) = build_graph(&relation, &ids, &parallel).unwrap();

        assert!(!sa.parallel);
        assert!(sb.parallel);
        assert_eq!(a.edge_records(), b.edge_records());
    }

    #[test]
    fn test_graph_invariants() {
        let (graph, _) = build_graph(&scenario(), &tools(&["TA", "TB", "TC", "TD"]), &BuildOptions::default()).unwrap();
        for node in graph.nodes() {
            assert!(graph.degree(&node.identifier) >= 1);
        }
        for edge in graph.edge_records() {
            assert_ne!(edge.source, edge.target);
            assert!(edge.weight >= 1);
        }
    }
}
