//! Core records exchanged between pipeline stages

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A tool from the registry, keyed by its primary publication identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Primary publication identifier (PubMed id)
    pub identifier: String,

    /// Name shown in the registry
    pub display_name: String,

    /// Year of the primary publication
    pub publication_year: Option<i32>,

    /// Number of papers citing the primary publication
    pub citation_count: Option<u64>,

    /// DOI of the primary publication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl ToolRecord {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            publication_year: None,
            citation_count: None,
            doi: None,
        }
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.publication_year = year;
        self
    }

    /// Copy of this record carrying a citation count
    pub fn with_citation_count(&self, count: u64) -> Self {
        Self {
            citation_count: Some(count),
            ..self.clone()
        }
    }
}

/// Raw directed citation: `citing` cites the tool `cited`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CitationEdge {
    pub citing: String,
    pub cited: String,
}

impl CitationEdge {
    pub fn new(citing: impl Into<String>, cited: impl Into<String>) -> Self {
        Self {
            citing: citing.into(),
            cited: cited.into(),
        }
    }

    pub fn is_self_citation(&self) -> bool {
        self.citing == self.cited
    }
}

/// Collected citations: cited tool identifier -> identifiers of citing papers
///
/// Lists may contain duplicates as returned by the citation index; consumers
/// deduplicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRelation {
    citations: BTreeMap<String, Vec<String>>,
}

impl CitationRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the relation from raw edges, dropping self-citations
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = CitationEdge>,
    {
        let mut relation = Self::new();
        for edge in edges {
            if edge.is_self_citation() {
                continue;
            }
            relation.citations.entry(edge.cited).or_default().push(edge.citing);
        }
        relation
    }

    /// Record the citing papers of one tool, replacing any previous entry
    pub fn insert(&mut self, cited: impl Into<String>, citing: Vec<String>) {
        self.citations.insert(cited.into(), citing);
    }

    pub fn contains(&self, cited: &str) -> bool {
        self.citations.contains_key(cited)
    }

    pub fn citing(&self, cited: &str) -> &[String] {
        self.citations.get(cited).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Distinct citing papers of a tool, excluding the tool itself
    pub fn distinct_citing(&self, cited: &str) -> BTreeSet<&str> {
        self.citing(cited)
            .iter()
            .map(String::as_str)
            .filter(|citing| *citing != cited)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.citations.iter()
    }

    /// Number of tools with an entry
    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

}
