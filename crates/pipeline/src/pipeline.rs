//! Pipeline orchestration
//!
//! `build`: resolve -> select -> collect -> build -> enrich -> publish.
//! `score`: load the current snapshot and score a workflow file against it.

use crate::report::PipelineReport;
use pubmetric_common::{AppConfig, AppError, HttpSession, Result, ToolRecord};
use pubmetric_graph::scoring::{score_metric, Metric, ScoreOptions, ScoreValue};
use pubmetric_graph::{build_graph, enrich, BuildOptions, CoCitationGraph, SnapshotMetadata, SnapshotStore, Workflow};
use pubmetric_harvest::{
    sample_records, select_tools, BioToolsRegistry, Checkpoint, CitationCollector, CitationIndex, DoiLibrary,
    EuropePmcClient, IdentifierLookup, MetadataResolver, NcbiClient, PublicationDateLookup, RegistrySource,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Upstream collaborators of a build
#[derive(Clone)]
pub struct Sources {
    pub registry: Arc<dyn RegistrySource>,
    pub identifiers: Arc<dyn IdentifierLookup>,
    pub dates: Arc<dyn PublicationDateLookup>,
    pub citations: Arc<dyn CitationIndex>,
}

impl Sources {
    /// HTTP clients sharing one session
    pub fn http(config: &AppConfig) -> Result<Self> {
        let session = HttpSession::new(&config.http)?;
        let ncbi = Arc::new(NcbiClient::new(session.clone(), &config.literature.eutils_url));

        Ok(Self {
            registry: Arc::new(BioToolsRegistry::new(session.clone(), &config.registry.base_url)),
            identifiers: ncbi.clone(),
            dates: ncbi,
            citations: Arc::new(EuropePmcClient::new(
                session,
                &config.literature.europepmc_url,
                &config.literature.citation_source,
            )),
        })
    }
}

/// Parameters of one build
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub domain: String,
    pub size_limit: Option<usize>,
    /// Display names to keep; empty keeps every tool
    pub tool_names: Vec<String>,
    /// Random subset size and seed
    pub sample: Option<(usize, u64)>,
    pub current_year: i32,
}

pub struct BuildOutcome {
    pub graph: CoCitationGraph,
    pub metadata: SnapshotMetadata,
    pub report: PipelineReport,
}

pub struct Pipeline {
    config: AppConfig,
    sources: Sources,
}

impl Pipeline {
    pub fn new(config: AppConfig, sources: Sources) -> Self {
        Self { config, sources }
    }

    /// Build the co-citation graph of a domain and publish it as the
    /// current snapshot
    #[instrument(skip(self, request), fields(domain = %request.domain))]
    pub async fn build(&self, request: &BuildRequest) -> Result<BuildOutcome> {
        // Resolve
        let mut library = DoiLibrary::load(self.config.doi_library_path())?;
        let resolver = MetadataResolver::new(
            self.sources.registry.clone(),
            self.sources.identifiers.clone(),
            self.sources.dates.clone(),
        )
        .with_concurrency(self.config.http.max_in_flight);
        let resolution = resolver
            .resolve_tools(&request.domain, request.size_limit, &mut library)
            .await?;

        // Select
        let mut records = resolution.records;
        if !request.tool_names.is_empty() {
            records = select_tools(&records, &request.tool_names)?;
        }
        if let Some((size, seed)) = request.sample {
            records = sample_records(&records, size, seed);
        }
        if records.is_empty() {
            return Err(AppError::Validation {
                message: format!("no tools resolved for domain {}", request.domain),
                field: Some("domain".to_string()),
            });
        }
        info!(tools = records.len(), "Tools selected");

        // Collect
        let checkpoint = Checkpoint::new(self.config.checkpoint_path());
        let collector = CitationCollector::new(
            self.sources.citations.clone(),
            self.config.literature.citation_page_size,
            self.config.http.max_in_flight,
        )
        .with_checkpoint(checkpoint.clone(), self.config.storage.checkpoint_interval);
        let identifiers: Vec<String> = records.iter().map(|r| r.identifier.clone()).collect();
        let collection = collector.collect_citations(&identifiers).await?;

        let records: Vec<ToolRecord> = records
            .iter()
            .map(|r| r.with_citation_count(collection.relation.distinct_citing(&r.identifier).len() as u64))
            .collect();

        // Build and enrich
        let (graph, stats) = build_graph(&collection.relation, &identifiers, &BuildOptions::from(&self.config.graph))?;
        let graph = enrich(graph, &records, request.current_year)?;

        // Publish
        let store = SnapshotStore::new(&self.config.storage.snapshot_dir);
        let metadata = store.publish(&graph, &request.domain, &records, Some(stats.clone()))?;
        checkpoint.clear()?;

        let report = PipelineReport {
            snapshot_id: metadata.snapshot_id.to_string(),
            domain: request.domain.clone(),
            resolution: resolution.report,
            tools_selected: records.len(),
            collection: collection.report,
            build: stats,
        };

        Ok(BuildOutcome {
            graph,
            metadata,
            report,
        })
    }
}

/// Score the workflow stored at `path` against the current snapshot
pub fn score_workflow(config: &AppConfig, path: &Path, metric: Metric, options: &ScoreOptions) -> Result<ScoreValue> {
    let input = std::fs::read_to_string(path).map_err(|e| AppError::NotFound {
        resource_type: "workflow".to_string(),
        id: format!("{}: {}", path.display(), e),
    })?;
    let workflow = Workflow::from_json(&input)?;

    let snapshot = SnapshotStore::new(&config.storage.snapshot_dir).load_current()?;
    info!(
        snapshot_id = %snapshot.metadata.snapshot_id,
        metric = %metric,
        steps = workflow.step_count(),
        "Scoring workflow"
    );

    Ok(score_metric(&snapshot.graph, &workflow, metric, options)?)
}
