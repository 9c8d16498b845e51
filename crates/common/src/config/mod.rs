//! Configuration management for Pubmetric
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<APP_ENV>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Tool registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Literature services (identifier lookup, citation index)
    #[serde(default)]
    pub literature: LiteratureConfig,

    /// Shared HTTP session configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Co-citation graph construction policy
    #[serde(default)]
    pub graph: GraphConfig,

    /// Scoring defaults
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Output locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Registry API base URL
    #[serde(default = "default_registry_url")]
    pub base_url: String,

    /// Domain (EDAM topic) to build the graph for
    #[serde(default = "default_domain")]
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiteratureConfig {
    /// NCBI E-utilities base URL (DOI lookup, publication dates)
    #[serde(default = "default_eutils_url")]
    pub eutils_url: String,

    /// Europe PMC REST base URL (citation index)
    #[serde(default = "default_europepmc_url")]
    pub europepmc_url: String,

    /// Citation source collection
    #[serde(default = "default_citation_source")]
    pub citation_source: String,

    /// Page size for citation requests
    #[serde(default = "default_citation_page_size")]
    pub citation_page_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Sustained request rate across the session
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Burst capacity of the rate limiter
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Requests allowed in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Citation groups citing more distinct tools than this are discarded
    #[serde(default = "default_degree_threshold")]
    pub degree_threshold: usize,

    /// Minimum shared citing papers for a pair to become an edge
    #[serde(default = "default_min_cocitations")]
    pub min_cocitations: u32,

    /// Add +1 to a pair when one tool directly cites the other
    #[serde(default = "default_direct_citation_bonus")]
    pub direct_citation_bonus: bool,

    /// Citing-paper count above which pair counting runs in parallel chunks
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Number of chunks for parallel pair counting
    #[serde(default = "default_num_chunks")]
    pub num_chunks: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Age substituted when an endpoint has no recorded age
    #[serde(default = "default_missing_age")]
    pub missing_age: f64,

    /// Citation count substituted when an endpoint has none recorded
    #[serde(default = "default_missing_citations")]
    pub missing_citations: f64,

    /// Geometric decay for the complete-average metric (None disables it)
    pub decay: Option<f64>,

    /// Extra weight given to workflow edges in weighted connectivity
    #[serde(default = "default_connectivity_factor")]
    pub connectivity_factor: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory holding graph snapshots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Working directory for checkpoints and the DOI library
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Persist collected citations after this many identifiers
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_registry_url() -> String { "https://bio.tools/api".to_string() }
fn default_domain() -> String { "topic_0121".to_string() }
fn default_eutils_url() -> String { "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string() }
fn default_europepmc_url() -> String { "https://www.ebi.ac.uk/europepmc/webservices/rest".to_string() }
fn default_citation_source() -> String { "MED".to_string() }
fn default_citation_page_size() -> u32 { 1000 }
fn default_timeout() -> u64 { 30 }
fn default_max_attempts() -> u32 { 5 }
fn default_initial_backoff() -> u64 { 500 }
fn default_max_backoff() -> u64 { 30_000 }
fn default_requests_per_second() -> u32 { 3 }
fn default_burst() -> u32 { 3 }
fn default_max_in_flight() -> usize { 8 }
fn default_user_agent() -> String { format!("pubmetric/{}", env!("CARGO_PKG_VERSION")) }
fn default_degree_threshold() -> usize { 20 }
fn default_min_cocitations() -> u32 { 1 }
fn default_direct_citation_bonus() -> bool { true }
fn default_parallel_threshold() -> usize { 20_000 }
fn default_num_chunks() -> usize { 10 }
fn default_missing_age() -> f64 { 10.0 }
fn default_missing_citations() -> f64 { 100.0 }
fn default_connectivity_factor() -> f64 { 1.0 }
fn default_snapshot_dir() -> PathBuf { PathBuf::from("out/snapshots") }
fn default_work_dir() -> PathBuf { PathBuf::from("out/work") }
fn default_checkpoint_interval() -> usize { 50 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            domain: default_domain(),
        }
    }
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            eutils_url: default_eutils_url(),
            europepmc_url: default_europepmc_url(),
            citation_source: default_citation_source(),
            citation_page_size: default_citation_page_size(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            max_in_flight: default_max_in_flight(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            degree_threshold: default_degree_threshold(),
            min_cocitations: default_min_cocitations(),
            direct_citation_bonus: default_direct_citation_bonus(),
            parallel_threshold: default_parallel_threshold(),
            num_chunks: default_num_chunks(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            missing_age: default_missing_age(),
            missing_citations: default_missing_citations(),
            decay: None,
            connectivity_factor: default_connectivity_factor(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            work_dir: default_work_dir(),
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__GRAPH__DEGREE_THRESHOLD=30
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Path of the citation collection checkpoint
    pub fn checkpoint_path(&self) -> PathBuf {
        self.storage.work_dir.join("citations.checkpoint.json")
    }

    /// Path of the metrics textfile written after each command
    pub fn metrics_path(&self) -> PathBuf {
        self.storage.work_dir.join("pubmetric.prom")
    }

    /// Path of the DOI -> identifier library
    pub fn doi_library_path(&self) -> PathBuf {
        self.storage.work_dir.join("doi_library.json")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            literature: LiteratureConfig::default(),
            http: HttpConfig::default(),
            graph: GraphConfig::default(),
            scoring: ScoringConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
