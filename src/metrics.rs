//! Metrics for the ingest run.
//!
//! Names follow `po_ingest_{phase}_{name}` with a `_total` suffix on
//! counters. A Prometheus recorder is installed once per process so a
//! finished run can render a text snapshot for a node-exporter textfile
//! collector or a pushgateway sidecar.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("po_ingest_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("po_ingest_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("po_ingest_", $phase, "_", $name)
    };
}

/// Install the Prometheus recorder. Idempotent.
pub fn init_metrics() {
    if HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_ok() {
                info!("Prometheus recorder installed");
            }
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Render the current snapshot in Prometheus text format, if installed.
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Write the rendered snapshot to `path`.
pub fn write_snapshot(path: &Path) -> std::io::Result<bool> {
    match render() {
        Some(text) => {
            std::fs::write(path, text)?;
            info!("Wrote metrics snapshot to {}", path.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Recording helpers, one per pipeline phase.
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_rows_loaded(rows: usize) {
        ::metrics::gauge!(phase_metric!(gauge, "loader", "rows")).set(rows as f64);
    }

    pub fn record_invalid_dates(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "transform", "invalid_dates"))
            .increment(count as u64);
    }

    pub fn record_node_batch(label: &'static str, rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "nodes", "batches"), "label" => label)
            .increment(1);
        ::metrics::counter!(phase_metric!(counter, "nodes", "rows_written"), "label" => label)
            .increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "nodes", "batch_duration_seconds"), "label" => label)
            .record(duration_secs);
    }

    pub fn record_rows_dropped(label: &'static str, dropped: usize) {
        ::metrics::counter!(phase_metric!(counter, "nodes", "rows_dropped"), "label" => label)
            .increment(dropped as u64);
    }

    pub fn record_relationship_batch(
        rel_type: &'static str,
        candidates: usize,
        matched: u64,
        duration_secs: f64,
    ) {
        ::metrics::counter!(phase_metric!(counter, "relationships", "batches"), "type" => rel_type)
            .increment(1);
        ::metrics::counter!(phase_metric!(counter, "relationships", "candidates"), "type" => rel_type)
            .increment(candidates as u64);
        ::metrics::counter!(phase_metric!(counter, "relationships", "matched"), "type" => rel_type)
            .increment(matched);
        ::metrics::histogram!(phase_metric!(histogram, "relationships", "batch_duration_seconds"), "type" => rel_type)
            .record(duration_secs);
    }

    pub fn record_step_duration(step: String, duration_secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "pipeline", "step_duration_seconds"), "step" => step)
            .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_metric_naming_convention() {
        assert_eq!(
            phase_metric!(counter, "nodes", "rows_written"),
            "po_ingest_nodes_rows_written_total"
        );
        assert_eq!(
            phase_metric!(histogram, "relationships", "batch_duration_seconds"),
            "po_ingest_relationships_batch_duration_seconds"
        );
        assert_eq!(phase_metric!(gauge, "loader", "rows"), "po_ingest_loader_rows");
    }
}
