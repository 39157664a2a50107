//! Shared fixtures for runtime integration tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use seat_inventory_core::{
    BookingStore, CapacitySnapshot, Clock, CommitOutcome, EventId, LedgerError, SeatLedger, UnitId,
};
use seat_inventory_runtime::{
    EngineConfig, InMemoryBookingStore, InMemorySeatLedger, ReservationCoordinator, RetryPolicy,
};
use seat_inventory_testing::{ManualClock, RecordingAlertSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub const HOLD_TTL: Duration = Duration::from_secs(600);

/// A coordinator over in-memory storage with a manual clock.
pub struct Harness {
    pub coordinator: Arc<ReservationCoordinator>,
    pub ledger: Arc<InMemorySeatLedger>,
    pub bookings: Arc<InMemoryBookingStore>,
    pub clock: Arc<ManualClock>,
    pub alerts: Arc<RecordingAlertSink>,
}

pub fn config() -> EngineConfig {
    EngineConfig {
        hold_ttl: HOLD_TTL,
        rollback_retry: RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
            .build(),
        ..EngineConfig::default()
    }
}

pub fn harness(units: &[(UnitId, u32)]) -> Harness {
    let ledger = Arc::new(InMemorySeatLedger::new());
    for &(unit, total) in units {
        ledger.register(unit, total).unwrap();
    }
    let bookings = Arc::new(InMemoryBookingStore::new());
    harness_with(ledger.clone(), bookings.clone(), ledger, bookings)
}

/// Build a harness whose coordinator talks to `ledger_view`/`bookings_view`
/// (e.g. fault-injecting wrappers) while the test inspects the real stores.
pub fn harness_with(
    ledger_view: Arc<dyn SeatLedger>,
    bookings_view: Arc<dyn BookingStore>,
    ledger: Arc<InMemorySeatLedger>,
    bookings: Arc<InMemoryBookingStore>,
) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let alerts = Arc::new(RecordingAlertSink::new());
    let coordinator = ReservationCoordinator::builder(ledger_view, bookings_view)
        .clock(Arc::clone(&clock) as Arc<dyn Clock>)
        .alert_sink(alerts.clone())
        .config(config())
        .build();

    Harness {
        coordinator: Arc::new(coordinator),
        ledger,
        bookings,
        clock,
        alerts,
    }
}

pub fn unit() -> UnitId {
    UnitId::event(EventId::new())
}

/// Ledger whose capacity reads report an untouched unit, so the pipeline's
/// early check passes and the atomic commit has to catch the sell-out.
pub struct StaleReadLedger(pub Arc<InMemorySeatLedger>);

impl SeatLedger for StaleReadLedger {
    fn capacity(&self, unit_id: UnitId) -> BoxFuture<'_, Result<CapacitySnapshot, LedgerError>> {
        Box::pin(async move {
            let real = self.0.capacity(unit_id).await?;
            Ok(CapacitySnapshot {
                total: real.total,
                confirmed_sold: 0,
            })
        })
    }

    fn try_commit(
        &self,
        unit_id: UnitId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<CommitOutcome, LedgerError>> {
        self.0.try_commit(unit_id, quantity)
    }

    fn rollback(&self, unit_id: UnitId, quantity: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        self.0.rollback(unit_id, quantity)
    }
}

/// Ledger that can park one capacity read, after the read, until the test
/// opens the gate. Models a slow storage round-trip at a chosen moment.
pub struct GatedLedger {
    inner: Arc<InMemorySeatLedger>,
    park_at: AtomicUsize,
    parked: Notify,
    gate: Notify,
}

impl GatedLedger {
    pub fn new(inner: Arc<InMemorySeatLedger>) -> Self {
        Self {
            inner,
            park_at: AtomicUsize::new(0),
            parked: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Park the `nth` capacity read from now (1 = the next one).
    pub fn park_read(&self, nth: usize) {
        self.park_at.store(nth, Ordering::SeqCst);
    }

    /// Wait until the armed read is parked.
    pub async fn wait_parked(&self) {
        self.parked.notified().await;
    }

    /// Let the parked read return.
    pub fn open(&self) {
        self.gate.notify_one();
    }
}

impl SeatLedger for GatedLedger {
    fn capacity(&self, unit_id: UnitId) -> BoxFuture<'_, Result<CapacitySnapshot, LedgerError>> {
        Box::pin(async move {
            let snapshot = self.inner.capacity(unit_id).await;
            let countdown = self
                .park_at
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if countdown == Ok(1) {
                self.parked.notify_one();
                self.gate.notified().await;
            }
            snapshot
        })
    }

    fn try_commit(
        &self,
        unit_id: UnitId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<CommitOutcome, LedgerError>> {
        self.inner.try_commit(unit_id, quantity)
    }

    fn rollback(&self, unit_id: UnitId, quantity: u32) -> BoxFuture<'_, Result<(), LedgerError>> {
        self.inner.rollback(unit_id, quantity)
    }
}
