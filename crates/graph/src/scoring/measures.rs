//! Workflow measures over a co-citation graph
//!
//! Missing data never fails a measure: edges touching unknown tools are
//! worth 0 and still count towards the number of edges.

use super::options::{AdjustmentKind, Aggregation, ScoreOptions};
use crate::graph::CoCitationGraph;
use crate::workflow::Workflow;
use std::collections::{BTreeMap, BTreeSet};

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Transformed and adjusted value of one tool pair
pub fn edge_value(graph: &CoCitationGraph, a: &str, b: &str, options: &ScoreOptions) -> f64 {
    let weight = match graph.edge_weight(a, b) {
        Some(w) if w > 0.0 => w,
        _ => return 0.0,
    };

    let mut value = options.transform.apply(weight);
    for adjustment in &options.adjustments {
        let x = endpoint_value(graph, a, adjustment.kind, options);
        let y = endpoint_value(graph, b, adjustment.kind, options);
        value /= adjustment.reduce.apply(x, y).max(1.0);
    }
    value
}

fn endpoint_value(graph: &CoCitationGraph, identifier: &str, kind: AdjustmentKind, options: &ScoreOptions) -> f64 {
    let node = graph.node(identifier);
    match kind {
        AdjustmentKind::Age => node
            .and_then(|n| n.age)
            .map(|age| age as f64)
            .unwrap_or(options.missing_age),
        AdjustmentKind::Degree => graph.degree(identifier) as f64,
        AdjustmentKind::Citations => node
            .and_then(|n| n.citation_count)
            .filter(|count| *count > 0)
            .map(|count| count as f64)
            .unwrap_or(options.missing_citations),
    }
}

fn aggregate(values: &[f64], aggregation: Aggregation) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    match aggregation {
        Aggregation::Sum { normalize } => {
            let sum: f64 = values.iter().sum();
            if normalize {
                sum / n
            } else {
                sum
            }
        }
        Aggregation::Product => {
            let mut nonzero = values.iter().filter(|v| **v != 0.0).peekable();
            if nonzero.peek().is_none() {
                0.0
            } else {
                nonzero.product::<f64>() / n
            }
        }
    }
}

/// Aggregated value of the workflow's own edges, rounded to 3 decimals
pub fn workflow_average(graph: &CoCitationGraph, edges: &[(&str, &str)], options: &ScoreOptions) -> f64 {
    let values: Vec<f64> = edges.iter().map(|(a, b)| edge_value(graph, a, b, options)).collect();
    round_to(aggregate(&values, options.aggregation), 3)
}

/// Per-step average over the step's incident workflow edges
pub fn tool_average_sum(graph: &CoCitationGraph, workflow: &Workflow, options: &ScoreOptions) -> BTreeMap<String, f64> {
    if workflow.is_empty() {
        return BTreeMap::new();
    }

    workflow
        .steps()
        .map(|step| {
            let values: Vec<f64> = workflow
                .step_edges()
                .iter()
                .filter(|(a, b)| a == step || b == step)
                .filter_map(|(a, b)| Some((workflow.tool(a)?, workflow.tool(b)?)))
                .map(|(a, b)| edge_value(graph, a, b, options))
                .collect();
            let average = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            (step.to_string(), round_to(average, 3))
        })
        .collect()
}

/// Aggregated value over every pair of distinct steps
///
/// With `decay` set, a pair `k` hops apart in the workflow is scaled by
/// `decay^(k - 1)`; pairs in different workflow components are worth 0.
pub fn complete_average(graph: &CoCitationGraph, workflow: &Workflow, options: &ScoreOptions) -> f64 {
    let steps: Vec<&str> = workflow.steps().collect();
    if steps.len() < 2 {
        return 0.0;
    }

    let mut values = Vec::with_capacity(steps.len() * (steps.len() - 1) / 2);
    for (i, &a) in steps.iter().enumerate() {
        let distances = options.decay.map(|_| workflow.distances_from(a));
        for &b in &steps[i + 1..] {
            let (Some(tool_a), Some(tool_b)) = (workflow.tool(a), workflow.tool(b)) else {
                values.push(0.0);
                continue;
            };
            let value = edge_value(graph, tool_a, tool_b, options);
            let scaled = match (options.decay, &distances) {
                (Some(decay), Some(distances)) => match distances.get(b) {
                    Some(&hops) => value * decay.powi(hops as i32 - 1),
                    None => 0.0,
                },
                _ => value,
            };
            values.push(scaled);
        }
    }

    round_to(aggregate(&values, options.aggregation), 3)
}

/// `complete - average + factor * average`
pub fn weighted_connectivity(graph: &CoCitationGraph, workflow: &Workflow, options: &ScoreOptions) -> f64 {
    let complete = complete_average(graph, workflow, options);
    let average = workflow_average(graph, &workflow.tool_edges(), options);
    round_to(complete - average + options.connectivity_factor * average, 3)
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn distinct_tools(workflow: &Workflow) -> BTreeSet<&str> {
    workflow.tools().into_iter().collect()
}

/// Median nonzero citation count of the workflow's tools in the graph
pub fn median_citations(graph: &CoCitationGraph, workflow: &Workflow) -> Option<f64> {
    let counts = distinct_tools(workflow)
        .into_iter()
        .filter_map(|tool| graph.node(tool)?.citation_count)
        .filter(|count| *count > 0)
        .map(|count| count as f64)
        .collect();
    median(counts)
}

/// Median age of the workflow's tools in the graph
pub fn median_age(graph: &CoCitationGraph, workflow: &Workflow) -> Option<f64> {
    let ages = distinct_tools(workflow)
        .into_iter()
        .filter_map(|tool| graph.node(tool)?.age)
        .map(|age| age as f64)
        .collect();
    median(ages)
}
