//! Alert capture for tests.

use seat_inventory_core::{AlertSink, LedgerAlert};
use std::sync::{Mutex, PoisonError};

/// [`AlertSink`] that keeps every alert in memory.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<LedgerAlert>>,
}

impl RecordingAlertSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts raised so far, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<LedgerAlert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of alerts raised.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no alert has been raised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for RecordingAlertSink {
    fn raise(&self, alert: LedgerAlert) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
    }
}
