//! Tests for the fault-injecting storage wrappers.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Utc;
use seat_inventory_core::{
    AlertSink, Booking, BookingId, BookingLine, BookingStore, BookingStoreError, CommitOutcome,
    EventId, HolderId, LedgerAlert, LedgerError, Money, SeatLedger, UnitId,
};
use seat_inventory_runtime::{InMemoryBookingStore, InMemorySeatLedger};
use seat_inventory_testing::{FaultyBookingStore, FaultyLedger, RecordingAlertSink};
use std::sync::Arc;

fn booking(unit_id: UnitId) -> Booking {
    Booking {
        booking_id: BookingId::new(),
        holder_id: HolderId::new("tab-1"),
        owner: None,
        lines: vec![BookingLine {
            unit_id,
            quantity: 1,
            unit_price: Money::from_cents(500),
        }],
        total_amount: Money::from_cents(500),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn faulty_ledger_fails_armed_rollbacks_then_recovers() {
    let unit = UnitId::event(EventId::new());
    let ledger = FaultyLedger::new(Arc::new(InMemorySeatLedger::new().with_unit(unit, 5)));
    ledger.try_commit(unit, 2).await.unwrap();
    ledger.fail_next_rollbacks(1);

    assert!(matches!(
        ledger.rollback(unit, 2).await,
        Err(LedgerError::Storage(_))
    ));
    ledger.rollback(unit, 2).await.unwrap();

    assert_eq!(ledger.rollback_calls(), 2);
    assert_eq!(ledger.capacity(unit).await.unwrap().confirmed_sold, 0);
}

#[tokio::test]
async fn faulty_ledger_fails_commits_for_selected_unit_only() {
    let event = EventId::new();
    let broken = UnitId::category(event, seat_inventory_core::CategoryId::new());
    let healthy = UnitId::category(event, seat_inventory_core::CategoryId::new());
    let ledger = FaultyLedger::new(Arc::new(
        InMemorySeatLedger::new()
            .with_unit(broken, 5)
            .with_unit(healthy, 5),
    ));
    ledger.fail_commits_for(broken);

    assert!(ledger.try_commit(broken, 1).await.is_err());
    assert_eq!(
        ledger.try_commit(healthy, 1).await.unwrap(),
        CommitOutcome::Committed { confirmed_sold: 1 }
    );
}

#[tokio::test]
async fn faulty_booking_store_fails_then_delegates() {
    let unit = UnitId::event(EventId::new());
    let inner = Arc::new(InMemoryBookingStore::new());
    let store = FaultyBookingStore::new(inner.clone());
    store.fail_next(1);

    let first = booking(unit);
    assert!(matches!(
        store.insert(&first).await,
        Err(BookingStoreError::Storage(_))
    ));
    store.insert(&first).await.unwrap();

    assert_eq!(store.insert_attempts(), 2);
    assert_eq!(inner.len(), 1);
    assert!(store.get(first.booking_id).await.unwrap().is_some());
}

#[test]
fn recording_sink_keeps_alerts_in_order() {
    let sink = RecordingAlertSink::new();
    let unit = UnitId::event(EventId::new());
    for quantity in [1, 2] {
        sink.raise(LedgerAlert {
            unit_id: unit,
            quantity,
            holder_id: HolderId::new("tab-1"),
            booking_id: None,
            reason: "timeout".to_string(),
            raised_at: Utc::now(),
        });
    }

    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].quantity, 1);
    assert_eq!(alerts[1].quantity, 2);
}
