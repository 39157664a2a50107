//! In-memory storage backends.
//!
//! Used by the server when no database is configured and by tests. Each
//! operation takes a single short-lived `std::sync::Mutex` critical section
//! and never awaits while holding it, so the returned futures are immediately
//! ready.

use futures::future::{BoxFuture, ready};
use seat_inventory_core::{
    Booking, BookingId, BookingStore, BookingStoreError, CapacitySnapshot, CommitOutcome,
    LedgerError, SeatLedger, UnitId,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::Storage("ledger mutex poisoned".to_string())
}

/// Mutex-guarded seat counters.
///
/// `try_commit` checks and increments under the same lock acquisition, which
/// makes it the atomic conditional update the engine relies on.
#[derive(Debug, Default)]
pub struct InMemorySeatLedger {
    units: Mutex<HashMap<UnitId, CapacitySnapshot>>,
}

impl InMemorySeatLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register) for tests and seeding.
    #[must_use]
    pub fn with_unit(self, unit_id: UnitId, total: u32) -> Self {
        // A fresh ledger's mutex cannot be poisoned.
        let _ = self.register(unit_id, total);
        self
    }

    /// Register a unit with `total` seats, or change the total of an existing
    /// unit. Existing sales are kept.
    ///
    /// # Errors
    ///
    /// - `Inconsistent`: `total` is below the seats already sold
    /// - `Storage`: the ledger mutex is poisoned
    pub fn register(&self, unit_id: UnitId, total: u32) -> Result<(), LedgerError> {
        let mut units = self.units.lock().map_err(poisoned)?;
        let entry = units.entry(unit_id).or_insert(CapacitySnapshot {
            total,
            confirmed_sold: 0,
        });
        if entry.confirmed_sold > total {
            return Err(LedgerError::Inconsistent {
                unit_id,
                reason: format!(
                    "cannot shrink capacity to {total} below {} sold",
                    entry.confirmed_sold
                ),
            });
        }
        entry.total = total;
        Ok(())
    }

    fn locked(&self) -> Result<MutexGuard<'_, HashMap<UnitId, CapacitySnapshot>>, LedgerError> {
        self.units.lock().map_err(poisoned)
    }

    fn commit_now(&self, unit_id: UnitId, quantity: u32) -> Result<CommitOutcome, LedgerError> {
        let mut units = self.locked()?;
        let unit = units
            .get_mut(&unit_id)
            .ok_or(LedgerError::UnknownUnit(unit_id))?;

        match unit.confirmed_sold.checked_add(quantity) {
            Some(sold) if sold <= unit.total => {
                unit.confirmed_sold = sold;
                Ok(CommitOutcome::Committed {
                    confirmed_sold: sold,
                })
            },
            _ => Ok(CommitOutcome::InsufficientCapacity {
                remaining: unit.remaining(),
            }),
        }
    }

    fn rollback_now(&self, unit_id: UnitId, quantity: u32) -> Result<(), LedgerError> {
        let mut units = self.locked()?;
        let unit = units
            .get_mut(&unit_id)
            .ok_or(LedgerError::UnknownUnit(unit_id))?;

        let sold = unit.confirmed_sold;
        unit.confirmed_sold = sold
            .checked_sub(quantity)
            .ok_or_else(|| LedgerError::Inconsistent {
                unit_id,
                reason: format!("rollback of {quantity} exceeds {sold} confirmed sold"),
            })?;
        Ok(())
    }
}

impl SeatLedger for InMemorySeatLedger {
    fn capacity(&self, unit_id: UnitId) -> BoxFuture<'_, Result<CapacitySnapshot, LedgerError>> {
        let result = self.locked().and_then(|units| {
            units
                .get(&unit_id)
                .copied()
                .ok_or(LedgerError::UnknownUnit(unit_id))
        });
        Box::pin(ready(result))
    }

    fn try_commit(
        &self,
        unit_id: UnitId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<CommitOutcome, LedgerError>> {
        Box::pin(ready(self.commit_now(unit_id, quantity)))
    }

    fn rollback(&self, unit_id: UnitId, quantity: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        Box::pin(ready(self.rollback_now(unit_id, quantity)))
    }
}

/// Append-only booking list.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<Vec<Booking>>,
}

impl InMemoryBookingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bookings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.lock().map_or(0, |bookings| bookings.len())
    }

    /// Whether no booking has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored booking, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<Booking> {
        self.bookings
            .lock()
            .map(|bookings| bookings.clone())
            .unwrap_or_default()
    }

    fn locked(&self) -> Result<MutexGuard<'_, Vec<Booking>>, BookingStoreError> {
        self.bookings
            .lock()
            .map_err(|_| BookingStoreError::Storage("booking mutex poisoned".to_string()))
    }
}

impl BookingStore for InMemoryBookingStore {
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<(), BookingStoreError>> {
        let result = self.locked().and_then(|mut bookings| {
            if bookings.iter().any(|b| b.booking_id == booking.booking_id) {
                return Err(BookingStoreError::Duplicate(booking.booking_id));
            }
            bookings.push(booking.clone());
            Ok(())
        });
        Box::pin(ready(result))
    }

    fn get(&self, booking_id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, BookingStoreError>> {
        let result = self.locked().map(|bookings| {
            bookings
                .iter()
                .find(|b| b.booking_id == booking_id)
                .cloned()
        });
        Box::pin(ready(result))
    }

    fn bookings_for_unit(
        &self,
        unit_id: UnitId,
    ) -> BoxFuture<'_, Result<Vec<Booking>, BookingStoreError>> {
        let result = self.locked().map(|bookings| {
            bookings
                .iter()
                .filter(|b| b.lines.iter().any(|line| line.unit_id == unit_id))
                .cloned()
                .collect()
        });
        Box::pin(ready(result))
    }
}
