//! Citation collector
//!
//! Fetches the citing papers of every tool with a bounded number of
//! identifiers in flight. A failing identifier is recorded with an empty
//! list and counted; it never aborts the run. Progress is checkpointed so
//! an interrupted run resumes where it stopped.

use crate::checkpoint::{Checkpoint, CheckpointState};
use crate::citations::CitationIndex;
use futures::stream::{self, StreamExt};
use pubmetric_common::{metrics, CitationRelation, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Counters describing a collection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub requested: usize,
    /// Identifiers taken from the checkpoint without refetching
    pub resumed: usize,
    pub fetched: usize,
    pub failed: usize,
    pub failed_identifiers: Vec<String>,
    /// Citing papers over all tools (with repeats)
    pub total_citations: usize,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub relation: CitationRelation,
    pub report: CollectionReport,
}

pub struct CitationCollector {
    index: Arc<dyn CitationIndex>,
    page_size: u32,
    max_in_flight: usize,
    checkpoint: Option<Checkpoint>,
    checkpoint_interval: usize,
}

impl CitationCollector {
    pub fn new(index: Arc<dyn CitationIndex>, page_size: u32, max_in_flight: usize) -> Self {
        Self {
            index,
            page_size: page_size.max(1),
            max_in_flight: max_in_flight.max(1),
            checkpoint: None,
            checkpoint_interval: 50,
        }
    }

    /// Persist progress every `interval` completed identifiers
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint, interval: usize) -> Self {
        self.checkpoint = Some(checkpoint);
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Collect the citing papers of every identifier
    #[instrument(skip(self, identifiers), fields(requested = identifiers.len()))]
    pub async fn collect_citations(&self, identifiers: &[String]) -> Result<Collection> {
        let mut state = match &self.checkpoint {
            Some(checkpoint) => checkpoint.load()?,
            None => CheckpointState::default(),
        };

        let mut report = CollectionReport {
            requested: identifiers.len(),
            ..Default::default()
        };

        let pending: Vec<String> = identifiers
            .iter()
            .filter(|id| !state.is_done(id))
            .cloned()
            .collect();
        report.resumed = identifiers.len() - pending.len();
        if report.resumed > 0 {
            info!(resumed = report.resumed, "Resuming from checkpoint");
        }

        let mut results = stream::iter(pending)
            .map(|identifier| async move {
                let result = self.fetch_all(&identifier).await;
                (identifier, result)
            })
            .buffer_unordered(self.max_in_flight);

        let mut completed = 0;
        while let Some((identifier, result)) = results.next().await {
            match result {
                Ok(citing) => {
                    debug!(identifier = %identifier, citations = citing.len(), "Collected citations");
                    metrics::record_citation_fetch(true);
                    state.failed.remove(&identifier);
                    state.relation.insert(identifier, citing);
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Citation fetch failed, recording empty list");
                    metrics::record_citation_fetch(false);
                    state.failed.insert(identifier.clone());
                    state.relation.insert(identifier, Vec::new());
                }
            }

            completed += 1;
            if completed % self.checkpoint_interval == 0 {
                self.save(&state)?;
            }
        }
        self.save(&state)?;

        let mut relation = CitationRelation::new();
        for identifier in identifiers {
            if state.failed.contains(identifier) {
                report.failed_identifiers.push(identifier.clone());
            }
            let citing = state.relation.citing(identifier).to_vec();
            report.total_citations += citing.len();
            relation.insert(identifier.clone(), citing);
        }
        report.failed = report.failed_identifiers.len();
        report.fetched = completed.saturating_sub(report.failed);

        info!(
            requested = report.requested,
            fetched = report.fetched,
            failed = report.failed,
            total_citations = report.total_citations,
            "Citation collection complete"
        );

        Ok(Collection { relation, report })
    }

    /// All pages of citing papers for one identifier
    async fn fetch_all(&self, identifier: &str) -> Result<Vec<String>> {
        let mut citing = Vec::new();
        let mut page = 1;

        loop {
            let result = self.index.fetch_citations(identifier, page, self.page_size).await?;
            let received = result.citing.len();
            citing.extend(result.citing);

            if received == 0 || citing.len() as u64 >= result.hit_count {
                break;
            }
            page += 1;
        }

        Ok(citing)
    }

    fn save(&self, state: &CheckpointState) -> Result<()> {
        if let Some(checkpoint) = &self.checkpoint {
            checkpoint.save(state)?;
        }
        Ok(())
    }
}
