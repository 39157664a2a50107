//! Prometheus metrics for the reservation engine.
//!
//! Every component records through the `metrics` facade. Nothing is exported
//! until a recorder is installed, which the server binary does once at startup
//! with [`install_recorder`]. Tests can run without a recorder; the macros
//! become no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use seat_inventory_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use seat_inventory_core::CheckoutOutcome;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Describe all metrics and install the global Prometheus recorder.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed in
/// this process.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    let handle = builder
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Holds
    describe_counter!("seat_holds_placed_total", "Holds placed or refreshed");
    describe_counter!(
        "seat_holds_rejected_total",
        "Hold requests rejected with CapacityExceeded"
    );
    describe_counter!(
        "seat_holds_released_total",
        "Holds released explicitly, by disconnect, or on commit"
    );
    describe_counter!(
        "seat_holds_expired_total",
        "Holds evicted by the expiry sweep"
    );
    describe_gauge!("seat_active_holds", "Holds currently stored in the hold table");

    // Commits
    describe_counter!(
        "seat_commits_total",
        "Checkout attempts by outcome (committed, sold_out, failed)"
    );
    describe_histogram!(
        "seat_commit_duration_seconds",
        "Time taken by the commit pipeline"
    );
    describe_counter!(
        "seat_rollbacks_total",
        "Compensating ledger rollbacks that succeeded"
    );
    describe_counter!(
        "seat_rollback_failures_total",
        "Compensating ledger rollbacks that failed; each one is a ledger inconsistency"
    );

    // Broadcast
    describe_counter!(
        "seat_availability_notifications_total",
        "Availability snapshots pushed to subscribers"
    );
}

/// Hold table metrics recorder.
pub struct HoldMetrics;

impl HoldMetrics {
    /// Record a hold placed or refreshed.
    pub fn record_placed() {
        counter!("seat_holds_placed_total").increment(1);
    }

    /// Record a hold request rejected for lack of availability.
    pub fn record_rejected() {
        counter!("seat_holds_rejected_total").increment(1);
    }

    /// Record holds removed by release, disconnect or commit.
    pub fn record_released(count: usize) {
        counter!("seat_holds_released_total").increment(count as u64);
    }

    /// Record holds removed by the sweeper.
    pub fn record_expired(count: usize) {
        counter!("seat_holds_expired_total").increment(count as u64);
    }

    /// Set the number of stored holds.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_active(count: usize) {
        gauge!("seat_active_holds").set(count as f64);
    }
}

/// Commit pipeline metrics recorder.
pub struct CommitMetrics;

impl CommitMetrics {
    /// Record a finished checkout.
    pub fn record_outcome(outcome: &CheckoutOutcome, duration: Duration) {
        let label = match outcome {
            CheckoutOutcome::Committed(_) => "committed",
            CheckoutOutcome::SoldOut { .. } => "sold_out",
        };
        counter!("seat_commits_total", "outcome" => label).increment(1);
        histogram!("seat_commit_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a checkout that ended in an error.
    pub fn record_failure(duration: Duration) {
        counter!("seat_commits_total", "outcome" => "failed").increment(1);
        histogram!("seat_commit_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a successful compensating rollback.
    pub fn record_rollback() {
        counter!("seat_rollbacks_total").increment(1);
    }

    /// Record a failed compensating rollback.
    pub fn record_rollback_failure() {
        counter!("seat_rollback_failures_total").increment(1);
    }
}

/// Availability broadcast metrics recorder.
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    /// Record a snapshot delivered to `receivers` subscribers.
    pub fn record_notification(receivers: usize) {
        counter!("seat_availability_notifications_total").increment(receivers as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorders_are_noops_without_installed_recorder() {
        register_metrics();
        HoldMetrics::record_placed();
        HoldMetrics::record_active(3);
        CommitMetrics::record_rollback();
        BroadcastMetrics::record_notification(2);
    }
}
