//! Error taxonomy for the seat inventory engine.
//!
//! Only genuine failures live here. Contention outcomes (`CapacityExceeded`,
//! `SoldOut`, `InsufficientCapacity`) are values in [`crate::outcome`] because
//! they happen routinely and must not trip error logging or alerting.

use crate::types::{BookingId, UnitId};
use thiserror::Error;

/// Errors returned by [`crate::ledger::SeatLedger`] implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The unit has never been registered with the ledger.
    #[error("Unknown sellable unit: {0}")]
    UnknownUnit(UnitId),

    /// Backing store unreachable or the statement failed.
    #[error("Ledger storage error: {0}")]
    Storage(String),

    /// A compensating rollback would drive `confirmed_sold` below zero.
    #[error("Ledger inconsistency for unit {unit_id}: {reason}")]
    Inconsistent {
        /// Unit whose counters disagree with the requested operation.
        unit_id: UnitId,
        /// What was wrong.
        reason: String,
    },
}

/// Errors returned by [`crate::booking::BookingStore`] implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingStoreError {
    /// Backing store unreachable or the statement failed.
    #[error("Booking storage error: {0}")]
    Storage(String),

    /// A booking with this id already exists (bookings are append-only).
    #[error("Booking {0} already exists")]
    Duplicate(BookingId),
}

/// Errors surfaced by the reservation coordinator and commit pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Rejected before touching shared state (zero quantity, empty checkout, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The unit is not known to the ledger.
    #[error("Unknown sellable unit: {0}")]
    UnknownUnit(UnitId),

    /// Storage failed during the operation; any partial commit was compensated.
    ///
    /// Safe to retry.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// The compensating rollback itself failed. The ledger may now count seats
    /// that no booking accounts for; operators have been alerted.
    #[error("Compensating rollback failed for unit {unit_id} ({quantity} seats): {reason}")]
    RollbackFailed {
        /// Unit left with an over-counted `confirmed_sold`.
        unit_id: UnitId,
        /// Seats that could not be returned.
        quantity: u32,
        /// Last storage error seen.
        reason: String,
    },
}

impl ReservationError {
    /// Whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure(_))
    }

    /// Whether the ledger may now be inconsistent with bookings.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}

impl From<LedgerError> for ReservationError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::UnknownUnit(unit_id) => Self::UnknownUnit(unit_id),
            LedgerError::Storage(reason) => Self::PersistenceFailure(reason),
            LedgerError::Inconsistent { unit_id, reason } => {
                Self::PersistenceFailure(format!("unit {unit_id}: {reason}"))
            },
        }
    }
}

impl From<BookingStoreError> for ReservationError {
    fn from(error: BookingStoreError) -> Self {
        Self::PersistenceFailure(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventId;

    #[test]
    fn ledger_errors_map_to_reservation_errors() {
        let unit = UnitId::event(EventId::new());

        assert_eq!(
            ReservationError::from(LedgerError::UnknownUnit(unit)),
            ReservationError::UnknownUnit(unit)
        );

        let storage = ReservationError::from(LedgerError::Storage("connection reset".into()));
        assert!(storage.is_retryable());
        assert!(!storage.is_fatal());
    }

    #[test]
    fn rollback_failure_is_fatal_not_retryable() {
        let error = ReservationError::RollbackFailed {
            unit_id: UnitId::event(EventId::new()),
            quantity: 3,
            reason: "timeout".into(),
        };
        assert!(error.is_fatal());
        assert!(!error.is_retryable());
    }
}
