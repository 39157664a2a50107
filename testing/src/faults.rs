//! Fault-injecting storage wrappers.
//!
//! Both wrappers delegate to a real backend and fail selected calls with a
//! storage error, so tests can exercise the compensation paths of the commit
//! pipeline against realistic state.

use futures::future::{BoxFuture, ready};
use seat_inventory_core::{
    Booking, BookingId, BookingStore, BookingStoreError, CapacitySnapshot, CommitOutcome,
    LedgerError, SeatLedger, UnitId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Failure budget: `0` never fails, `usize::MAX` always fails, anything else
/// fails that many more calls.
#[derive(Debug, Default)]
struct FailureBudget(AtomicUsize);

impl FailureBudget {
    fn set(&self, failures: usize) {
        self.0.store(failures, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

/// [`SeatLedger`] wrapper that fails rollbacks or commits on demand.
pub struct FaultyLedger {
    inner: Arc<dyn SeatLedger>,
    rollback_failures: FailureBudget,
    failing_commit_units: Mutex<HashSet<UnitId>>,
    rollback_calls: AtomicUsize,
}

impl FaultyLedger {
    /// Wrap `inner`; no faults are armed.
    #[must_use]
    pub fn new(inner: Arc<dyn SeatLedger>) -> Self {
        Self {
            inner,
            rollback_failures: FailureBudget::default(),
            failing_commit_units: Mutex::new(HashSet::new()),
            rollback_calls: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` rollback calls with a storage error.
    pub fn fail_next_rollbacks(&self, count: usize) {
        self.rollback_failures.set(count);
    }

    /// Fail every rollback call from now on.
    pub fn fail_rollbacks_always(&self) {
        self.rollback_failures.set(usize::MAX);
    }

    /// Fail every `try_commit` for `unit_id` with a storage error.
    pub fn fail_commits_for(&self, unit_id: UnitId) {
        self.failing_commit_units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(unit_id);
    }

    /// Number of rollback calls seen, including failed ones.
    #[must_use]
    pub fn rollback_calls(&self) -> usize {
        self.rollback_calls.load(Ordering::SeqCst)
    }
}

impl SeatLedger for FaultyLedger {
    fn capacity(&self, unit_id: UnitId) -> BoxFuture<'_, Result<CapacitySnapshot, LedgerError>> {
        self.inner.capacity(unit_id)
    }

    fn try_commit(
        &self,
        unit_id: UnitId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<CommitOutcome, LedgerError>> {
        let failing = self
            .failing_commit_units
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&unit_id);
        if failing {
            return Box::pin(ready(Err(LedgerError::Storage(format!(
                "injected commit failure for {unit_id}"
            )))));
        }
        self.inner.try_commit(unit_id, quantity)
    }

    fn rollback(&self, unit_id: UnitId, quantity: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        self.rollback_calls.fetch_add(1, Ordering::SeqCst);
        if self.rollback_failures.take() {
            return Box::pin(ready(Err(LedgerError::Storage(
                "injected rollback failure".to_string(),
            ))));
        }
        self.inner.rollback(unit_id, quantity)
    }
}

/// [`BookingStore`] wrapper that fails inserts on demand.
pub struct FaultyBookingStore {
    inner: Arc<dyn BookingStore>,
    insert_failures: FailureBudget,
    insert_attempts: AtomicUsize,
}

impl FaultyBookingStore {
    /// Wrap `inner`; no faults are armed.
    #[must_use]
    pub fn new(inner: Arc<dyn BookingStore>) -> Self {
        Self {
            inner,
            insert_failures: FailureBudget::default(),
            insert_attempts: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` inserts with a storage error.
    pub fn fail_next(&self, count: usize) {
        self.insert_failures.set(count);
    }

    /// Fail every insert from now on.
    pub fn fail_always(&self) {
        self.insert_failures.set(usize::MAX);
    }

    /// Number of insert calls seen, including failed ones.
    #[must_use]
    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

impl BookingStore for FaultyBookingStore {
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<(), BookingStoreError>> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.insert_failures.take() {
            return Box::pin(ready(Err(BookingStoreError::Storage(
                "injected booking write failure".to_string(),
            ))));
        }
        self.inner.insert(booking)
    }

    fn get(&self, booking_id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, BookingStoreError>> {
        self.inner.get(booking_id)
    }

    fn bookings_for_unit(
        &self,
        unit_id: UnitId,
    ) -> BoxFuture<'_, Result<Vec<Booking>, BookingStoreError>> {
        self.inner.bookings_for_unit(unit_id)
    }
}
