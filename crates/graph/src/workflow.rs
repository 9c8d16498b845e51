//! Workflows to be scored
//!
//! A workflow is a set of steps, each bound to a tool identifier, and the
//! ordered edges between steps. The JSON input is either a list of
//! `[source, target]` tool pairs (each tool is its own step) or an object
//! with an explicit step mapping, for workflows that use the same tool at
//! several positions:
//!
//! ```json
//! { "steps": {"search_1": "111", "search_2": "111", "filter": "222"},
//!   "edges": [["search_1", "filter"], ["filter", "search_2"]] }
//! ```

use crate::errors::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkflowDocument {
    Pairs(Vec<(String, String)>),
    Steps {
        steps: BTreeMap<String, String>,
        edges: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workflow {
    /// step name -> tool identifier
    steps: BTreeMap<String, String>,
    /// Edges between step names, in input order
    edges: Vec<(String, String)>,
}

impl Workflow {
    /// Workflow with an explicit step mapping
    pub fn new(steps: BTreeMap<String, String>, edges: Vec<(String, String)>) -> Result<Self> {
        for (step, tool) in &steps {
            if step.trim().is_empty() || tool.trim().is_empty() {
                return Err(GraphError::InvalidWorkflow(format!(
                    "step {:?} -> tool {:?} has an empty name",
                    step, tool
                )));
            }
        }
        for (source, target) in &edges {
            for step in [source, target] {
                if !steps.contains_key(step) {
                    return Err(GraphError::InvalidWorkflow(format!("edge names unknown step {:?}", step)));
                }
            }
        }
        Ok(Self { steps, edges })
    }

    /// Workflow whose steps are the tools themselves
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self> {
        let steps = pairs
            .iter()
            .flat_map(|(a, b)| [a, b])
            .map(|tool| (tool.clone(), tool.clone()))
            .collect();
        Self::new(steps, pairs)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let document: WorkflowDocument = serde_json::from_str(input)
            .map_err(|e| GraphError::InvalidWorkflow(format!("malformed workflow: {}", e)))?;
        Self::try_from(document)
    }

    /// Tool identifier bound to `step`
    pub fn tool(&self, step: &str) -> Option<&str> {
        self.steps.get(step).map(String::as_str)
    }

    /// Step names in sorted order
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_edges(&self) -> &[(String, String)] {
        &self.edges
    }

    /// Edges resolved to tool identifiers
    pub fn tool_edges(&self) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .map(|(a, b)| (self.steps[a].as_str(), self.steps[b].as_str()))
            .collect()
    }

    /// Distinct tool identifiers in sorted order
    pub fn tools(&self) -> Vec<&str> {
        let mut tools: Vec<&str> = self.steps.values().map(String::as_str).collect();
        tools.sort_unstable();
        tools.dedup();
        tools
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Shortest undirected hop counts from `start` to every reachable step
    pub fn distances_from(&self, start: &str) -> HashMap<&str, usize> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for (a, b) in &self.edges {
            adjacency.entry(a.as_str()).or_default().push(b.as_str());
            adjacency.entry(b.as_str()).or_default().push(a.as_str());
        }

        let mut distances = HashMap::new();
        let Some(start) = self.steps.get_key_value(start).map(|(k, _)| k.as_str()) else {
            return distances;
        };
        distances.insert(start, 0);
        let mut queue = VecDeque::from([start]);
        while let Some(step) = queue.pop_front() {
            let next = distances[step] + 1;
            for &neighbour in adjacency.get(step).map(Vec::as_slice).unwrap_or(&[]) {
                if !distances.contains_key(neighbour) {
                    distances.insert(neighbour, next);
                    queue.push_back(neighbour);
                }
            }
        }
        distances
    }
}

impl TryFrom<WorkflowDocument> for Workflow {
    type Error = GraphError;

    fn try_from(document: WorkflowDocument) -> Result<Self> {
        match document {
            WorkflowDocument::Pairs(pairs) => Self::from_pairs(pairs),
            WorkflowDocument::Steps { steps, edges } => Self::new(steps, edges),
        }
    }
}
