//! Metrics for pipeline runs and scoring
//!
//! Counters mirror the stage diagnostics reported at the end of a build so
//! data quality can be tracked across runs. The binary installs a Prometheus
//! recorder and writes the rendered values to a textfile after each command,
//! ready for a node-exporter textfile collector.

use crate::errors::{AppError, Result};
use crate::persist::write_atomic;
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

/// Metrics prefix for all Pubmetric metrics
pub const METRICS_PREFIX: &str = "pubmetric";

/// Register all metric descriptions
pub fn register_metrics() {
    // Resolution metrics
    describe_counter!(
        format!("{}_tools_resolved_total", METRICS_PREFIX),
        Unit::Count,
        "Tools resolved to a primary publication identifier"
    );

    describe_counter!(
        format!("{}_tools_dropped_total", METRICS_PREFIX),
        Unit::Count,
        "Tools dropped because no identifier could be resolved"
    );

    // Collection metrics
    describe_counter!(
        format!("{}_citation_fetches_total", METRICS_PREFIX),
        Unit::Count,
        "Citation fetches per tool, labelled by outcome"
    );

    describe_counter!(
        format!("{}_http_retries_total", METRICS_PREFIX),
        Unit::Count,
        "HTTP requests retried after a transient failure"
    );

    // Graph metrics
    describe_gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the most recently built co-citation graph"
    );

    describe_gauge!(
        format!("{}_graph_edges", METRICS_PREFIX),
        Unit::Count,
        "Edges in the most recently built co-citation graph"
    );

    // Scoring metrics
    describe_counter!(
        format!("{}_scores_total", METRICS_PREFIX),
        Unit::Count,
        "Workflow scores computed, labelled by metric"
    );

    tracing::info!("Metrics registered");
}

/// Install the process-wide Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to install metrics recorder: {}", e),
        })
}

/// Write the current values in Prometheus text format to `path`
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    write_atomic(path, handle.render().as_bytes())?;
    tracing::debug!(path = %path.display(), "Metrics written");
    Ok(())
}

/// Helper to record resolver results
pub fn record_resolution(resolved: usize, dropped: usize) {
    counter!(format!("{}_tools_resolved_total", METRICS_PREFIX)).increment(resolved as u64);
    counter!(format!("{}_tools_dropped_total", METRICS_PREFIX)).increment(dropped as u64);
}

/// Helper to record one citation fetch outcome
pub fn record_citation_fetch(success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_citation_fetches_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Helper to record a retried request
pub fn record_http_retry(url: &str) {
    let host = url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("unknown")
        .to_string();

    counter!(
        format!("{}_http_retries_total", METRICS_PREFIX),
        "host" => host
    )
    .increment(1);
}

/// Helper to record the size of a freshly built graph
pub fn record_graph(nodes: usize, edges: usize) {
    gauge!(format!("{}_graph_nodes", METRICS_PREFIX)).set(nodes as f64);
    gauge!(format!("{}_graph_edges", METRICS_PREFIX)).set(edges as f64);
}

/// Helper to record a scoring call
pub fn record_score(metric: &str) {
    counter!(
        format!("{}_scores_total", METRICS_PREFIX),
        "metric" => metric.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: calls must be no-ops
        register_metrics();
        record_resolution(10, 2);
        record_citation_fetch(true);
        record_citation_fetch(false);
        record_http_retry("https://www.ebi.ac.uk/europepmc/webservices/rest");
        record_graph(5, 4);
        record_score("workflow_average");
    }

    #[test]
    fn test_textfile_contains_recorded_values() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_graph(5, 4);
            record_score("median_age");
        });

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("pubmetric.prom");
        write_textfile(&handle, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("pubmetric_graph_nodes"));
        assert!(text.contains("pubmetric_graph_edges"));
        assert!(text.contains(r#"pubmetric_scores_total{metric="median_age"}"#));
    }
}
