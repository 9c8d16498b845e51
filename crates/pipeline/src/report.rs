//! Reports printed by the `build` and `score` commands

use pubmetric_graph::scoring::{DesirabilityBounds, Metric, ScoreValue};
use pubmetric_graph::BuildStats;
use pubmetric_harvest::{CollectionReport, ResolutionReport};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub snapshot_id: String,
    pub domain: String,
    pub resolution: ResolutionReport,
    /// Tools kept after name selection and sampling
    pub tools_selected: usize,
    pub collection: CollectionReport,
    pub build: BuildStats,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.resolution;
        let c = &self.collection;
        let b = &self.build;

        writeln!(f, "snapshot {} ({})", self.snapshot_id, self.domain)?;
        writeln!(
            f,
            "  resolver:  {} in domain, {} seen, {} without identifier ({} recovered via DOI), {} dropped, {} duplicates",
            r.total_in_domain, r.entries_seen, r.missing_identifier, r.recovered_via_doi, r.dropped, r.duplicates
        )?;
        if r.pages_failed > 0 {
            writeln!(f, "  resolver:  pagination stopped early after {} pages", r.pages_fetched)?;
        }
        writeln!(f, "  selection: {} tools", self.tools_selected)?;
        writeln!(
            f,
            "  citations: {} fetched, {} failed, {} resumed, {} citing papers",
            c.fetched, c.failed, c.resumed, c.total_citations
        )?;
        writeln!(
            f,
            "  groups:    {} total, {} over threshold, {} singletons",
            b.citation_groups, b.groups_over_threshold, b.singleton_groups
        )?;
        writeln!(
            f,
            "  pairs:     {} counted, {} after filtering, {} created by direct citations",
            b.pairs_counted, b.pairs_after_filter, b.bonus_edges_created
        )?;
        write!(
            f,
            "  graph:     {} nodes, {} edges, {} included tools filtered out",
            b.nodes, b.edges, b.included_tools_filtered_out
        )
    }
}

/// Result of the `score` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutput {
    pub metric: String,
    pub value: ScoreValue,
    /// Desirability of a single-number score, when bounds were given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desirability: Option<f64>,
}

impl ScoreOutput {
    pub fn new(metric: Metric, value: ScoreValue, bounds: Option<&DesirabilityBounds>) -> Self {
        let desirability = bounds.and_then(|b| value.as_scalar().map(|v| b.apply(v)));
        Self {
            metric: metric.to_string(),
            value,
            desirability,
        }
    }
}
