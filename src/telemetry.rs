// src/telemetry.rs
//! One-time registration of the engine's metric series. The crate only
//! talks to the `metrics` facade; the embedding service installs its own
//! recorder/exporter.

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scan_completed_total", "Scans completed, labeled by branch.");
        describe_counter!("scan_failed_total", "Scans failed (wall-clock ceiling).");
        describe_counter!(
            "scan_override_total",
            "Policy overrides applied, labeled by rule."
        );
        describe_counter!("ti_source_errors_total", "Threat-intel source errors/timeouts.");
        describe_counter!(
            "consensus_model_errors_total",
            "AI model call errors and timeouts."
        );
        describe_counter!(
            "consensus_aggregate_timeouts_total",
            "Consensus fan-outs cut short by the aggregate timeout."
        );
        describe_histogram!("scan_duration_ms", "End-to-end scan duration.");
        describe_histogram!("consensus_duration_ms", "AI consensus fan-out duration.");
        describe_histogram!("consensus_opinions", "Usable opinions per consensus pass.");
        describe_histogram!("ti_duration_ms", "Threat-intel fan-out duration.");
    });
}
