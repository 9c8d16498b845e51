//! Pubmetric
//!
//! `build` harvests a bio.tools domain and publishes its co-citation graph:
//! 1. Resolves registry entries to tool records
//! 2. Collects the papers citing each tool (resumable)
//! 3. Builds, enriches and publishes the graph snapshot
//!
//! `score` scores a workflow file against the current snapshot.
//!
//! Metric values of each run are written to `<work_dir>/pubmetric.prom`.

mod cli;
mod pipeline;
mod report;

use crate::cli::Command;
use crate::pipeline::{score_workflow, BuildRequest, Pipeline, Sources};
use crate::report::ScoreOutput;
use chrono::Datelike;
use pubmetric_common::{config::AppConfig, metrics, VERSION};
use pubmetric_graph::ScoreOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: Option<&AppConfig>) {
    let observability = config.map(|c| c.observability.clone()).unwrap_or_default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&observability.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load();
    init_tracing(config.as_ref().ok());

    info!("Starting Pubmetric v{}", VERSION);

    let config = config.map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    let recorder = metrics::install_recorder()?;
    metrics::register_metrics();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse(&args, ScoreOptions::from(&config.scoring)).map_err(|e| {
        error!(error = %e, "Invalid arguments");
        e
    })?;

    let result = run(&config, command).await;

    if let Err(e) = metrics::write_textfile(&recorder, &config.metrics_path()) {
        warn!(error = %e, "Failed to write metrics");
    }
    result
}

async fn run(config: &AppConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Build(args) => {
            let request = BuildRequest {
                domain: args.domain.unwrap_or_else(|| config.registry.domain.clone()),
                size_limit: args.limit,
                tool_names: args.tools,
                sample: args.sample.map(|size| (size, args.seed)),
                current_year: chrono::Utc::now().year(),
            };

            let sources = Sources::http(config)?;
            let outcome = Pipeline::new(config.clone(), sources).build(&request).await.map_err(|e| {
                error!(error = %e, code = e.code().as_code(), "Build failed");
                e
            })?;

            println!("{}", outcome.report);
        }
        Command::Score(args) => {
            let value = score_workflow(config, &args.workflow, args.metric, &args.options)?;
            let output = ScoreOutput::new(args.metric, value, args.desirability.as_ref());
            println!("{}", serde_json::to_string(&output)?);
        }
    }

    Ok(())
}
