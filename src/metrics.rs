//! Metrics for source loading and review computations.
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::sources::SourceProvenance;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install an in-process Prometheus recorder. Idempotent.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Some(handle);
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Metrics recorder installed");
            Some(HANDLE.get_or_init(|| handle))
        }
        Err(e) => {
            warn!("Metrics recorder install failed (possibly already installed): {}", e);
            None
        }
    }
}

/// Render the current exposition text, if a recorder is installed
pub fn render() -> Option<String> {
    HANDLE.get().map(PrometheusHandle::render)
}

pub struct SourceMetrics;

impl SourceMetrics {
    pub fn record_load(provenance: &SourceProvenance, duration_secs: f64) {
        let source = provenance.source_name.clone();
        counter!("rvu_sources_loaded_total", "source" => source.clone()).increment(1);
        counter!("rvu_sources_rows_read_total", "source" => source.clone())
            .increment(provenance.rows_read as u64);
        counter!("rvu_sources_rows_dropped_total", "source" => source.clone())
            .increment(provenance.rows_dropped as u64);
        counter!("rvu_sources_coercion_fallbacks_total", "source" => source.clone())
            .increment(provenance.coercion_fallbacks as u64);
        histogram!("rvu_sources_load_duration_seconds", "source" => source).record(duration_secs);
    }

    pub fn record_cache_hit() {
        counter!("rvu_sources_cache_hits_total").increment(1);
    }
}

pub struct ReviewMetrics;

impl ReviewMetrics {
    pub fn record_lookup(found: bool) {
        let outcome = if found { "found" } else { "not_found" };
        counter!("rvu_review_lookups_total", "outcome" => outcome).increment(1);
    }

    pub fn record_direct_expense(line_items: usize) {
        counter!("rvu_review_direct_expense_total").increment(1);
        histogram!("rvu_review_direct_expense_line_items").record(line_items as f64);
    }

    pub fn record_population(population: usize, quartile: usize) {
        if population == 0 {
            counter!("rvu_review_empty_populations_total").increment(1);
        }
        histogram!("rvu_review_population_size").record(population as f64);
        histogram!("rvu_review_quartile_size").record(quartile as f64);
    }

    pub fn record_session(duration_secs: f64) {
        counter!("rvu_review_sessions_computed_total").increment(1);
        histogram!("rvu_review_session_duration_seconds").record(duration_secs);
    }
}
