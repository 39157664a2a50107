//! Operational alerting for unrecoverable ledger inconsistencies.
//!
//! The only situation that can leave the ledger permanently out of step with
//! bookings is a failed compensating rollback. When that happens the commit
//! pipeline raises a [`LedgerAlert`] through an injected [`AlertSink`].

use crate::types::{BookingId, HolderId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit whose `confirmed_sold` may count seats no booking accounts for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAlert {
    /// Unit left over-counted
    pub unit_id: UnitId,
    /// Seats that could not be returned to the ledger
    pub quantity: u32,
    /// Checkout that triggered the rollback
    pub holder_id: HolderId,
    /// Booking that was being written, if one had been assigned
    pub booking_id: Option<BookingId>,
    /// Last storage error seen while rolling back
    pub reason: String,
    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

/// Receives fatal ledger alerts.
///
/// Implementations must not block: `raise` is called on the request path.
pub trait AlertSink: Send + Sync {
    /// Deliver an alert.
    fn raise(&self, alert: LedgerAlert);
}

/// Default sink: logs the alert at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: LedgerAlert) {
        tracing::error!(
            unit_id = %alert.unit_id,
            quantity = alert.quantity,
            holder_id = %alert.holder_id,
            booking_id = ?alert.booking_id,
            reason = %alert.reason,
            "LEDGER INCONSISTENT: compensating rollback failed, manual reconciliation required"
        );
    }
}
