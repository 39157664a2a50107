//! Application state shared by every handler.

use crate::catalog::UnitCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use seat_inventory_runtime::ReservationCoordinator;
use std::sync::Arc;

/// Application state shared across all HTTP and WebSocket handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entry point for holds, commits and availability
    pub coordinator: Arc<ReservationCoordinator>,
    /// Unit registration against the same ledger the coordinator uses
    pub catalog: Arc<dyn UnitCatalog>,
    /// Prometheus renderer; `None` when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state without a metrics endpoint.
    #[must_use]
    pub fn new(coordinator: Arc<ReservationCoordinator>, catalog: Arc<dyn UnitCatalog>) -> Self {
        Self {
            coordinator,
            catalog,
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        // Axum requires Clone state
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }
}
