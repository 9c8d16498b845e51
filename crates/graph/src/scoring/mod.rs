//! Workflow scoring
//!
//! Pure functions from (graph, workflow) to a score. Every metric is
//! available directly and through [`score`], which dispatches by name and
//! rejects bad input before touching the graph.

mod desirability;
mod measures;
mod options;

pub use desirability::{desirability, DesirabilityBounds};
pub use measures::{
    complete_average, edge_value, median_age, median_citations, tool_average_sum, weighted_connectivity,
    workflow_average,
};
pub use options::{Adjustment, AdjustmentKind, Aggregation, Reduce, ScoreOptions, Transform};

use crate::errors::{GraphError, Result};
use crate::graph::CoCitationGraph;
use crate::workflow::Workflow;
use pubmetric_common::metrics;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    WorkflowAverage,
    ToolAverage,
    CompleteAverage,
    MedianCitations,
    MedianAge,
    WeightedConnectivity,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::WorkflowAverage,
        Metric::ToolAverage,
        Metric::CompleteAverage,
        Metric::MedianCitations,
        Metric::MedianAge,
        Metric::WeightedConnectivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::WorkflowAverage => "workflow_average",
            Metric::ToolAverage => "tool_average",
            Metric::CompleteAverage => "complete_average",
            Metric::MedianCitations => "median_citations",
            Metric::MedianAge => "median_age",
            Metric::WeightedConnectivity => "weighted_connectivity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| GraphError::UnknownMetric(s.to_string()))
    }
}

/// Result of a metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Scalar(f64),
    PerStep(BTreeMap<String, f64>),
    Optional(Option<f64>),
}

impl ScoreValue {
    /// The score as one number; per-step scores have none
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ScoreValue::Scalar(value) => Some(*value),
            ScoreValue::Optional(value) => *value,
            ScoreValue::PerStep(_) => None,
        }
    }
}

/// Score a workflow with the metric called `metric`
pub fn score(graph: &CoCitationGraph, workflow: &Workflow, metric: &str, options: &ScoreOptions) -> Result<ScoreValue> {
    let metric: Metric = metric.parse()?;
    score_metric(graph, workflow, metric, options)
}

pub fn score_metric(
    graph: &CoCitationGraph,
    workflow: &Workflow,
    metric: Metric,
    options: &ScoreOptions,
) -> Result<ScoreValue> {
    options.check()?;
    metrics::record_score(metric.as_str());

    Ok(match metric {
        Metric::WorkflowAverage => ScoreValue::Scalar(workflow_average(graph, &workflow.tool_edges(), options)),
        Metric::ToolAverage => ScoreValue::PerStep(tool_average_sum(graph, workflow, options)),
        Metric::CompleteAverage => ScoreValue::Scalar(complete_average(graph, workflow, options)),
        Metric::MedianCitations => ScoreValue::Optional(median_citations(graph, workflow)),
        Metric::MedianAge => ScoreValue::Optional(median_age(graph, workflow)),
        Metric::WeightedConnectivity => ScoreValue::Scalar(weighted_connectivity(graph, workflow, options)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ToolNode;

    fn graph() -> CoCitationGraph {
        let mut graph = CoCitationGraph::new();
        for id in ["TA", "TC", "TD"] {
            graph.add_node(ToolNode::new(id));
        }
        graph.add_edge("TA", "TC", 2).unwrap();
        graph.add_edge("TC", "TD", 1).unwrap();
        graph
    }

    #[test]
    fn test_metric_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
        assert!(matches!("pagerank".parse::<Metric>(), Err(GraphError::UnknownMetric(_))));
    }

    #[test]
    fn test_dispatch() {
        let workflow = Workflow::from_json(r#"[["TA", "TC"], ["TC", "TD"]]"#).unwrap();
        let options = ScoreOptions::default();

        assert_eq!(
            score(&graph(), &workflow, "workflow_average", &options).unwrap(),
            ScoreValue::Scalar(1.5)
        );
        assert!(matches!(
            score(&graph(), &workflow, "tool_average", &options).unwrap(),
            ScoreValue::PerStep(map) if map.len() == 3
        ));
        // unenriched graph has no citation counts
        assert_eq!(
            score(&graph(), &workflow, "median_citations", &options).unwrap(),
            ScoreValue::Optional(None)
        );
    }

    #[test]
    fn test_bad_input_rejected_before_scoring() {
        let workflow = Workflow::from_json(r#"[["TA", "TC"]]"#).unwrap();
        let options = ScoreOptions {
            decay: Some(-1.0),
            ..ScoreOptions::default()
        };
        assert!(matches!(
            score(&graph(), &workflow, "complete_average", &options),
            Err(GraphError::InvalidOptions(_))
        ));
        assert!(matches!(
            score(&graph(), &workflow, "nope", &ScoreOptions::default()),
            Err(GraphError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_scalar_view() {
        assert_eq!(ScoreValue::Scalar(1.5).as_scalar(), Some(1.5));
        assert_eq!(ScoreValue::Optional(None).as_scalar(), None);
        assert_eq!(ScoreValue::PerStep(BTreeMap::new()).as_scalar(), None);
    }

    #[test]
    fn test_unknown_tool_never_fails() {
        let workflow = Workflow::from_json(r#"[["TX", "TY"]]"#).unwrap();
        for metric in Metric::ALL {
            assert!(score_metric(&graph(), &workflow, metric, &ScoreOptions::default()).is_ok());
        }
    }
}
