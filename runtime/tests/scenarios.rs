//! End-to-end reservation scenarios against the in-memory backends.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{HOLD_TTL, StaleReadLedger, harness, harness_with, unit};
use seat_inventory_core::{
    BookingLine, BookingPayload, CategoryId, CheckoutOutcome, CheckoutRequest, EventId,
    HoldOutcome, HolderId, Money, SeatLedger, UnitId,
};
use seat_inventory_runtime::{InMemoryBookingStore, InMemorySeatLedger};
use seat_inventory_testing::FaultyLedger;
use std::sync::Arc;
use std::time::Duration;

fn payload(cents: u64) -> BookingPayload {
    BookingPayload {
        unit_price: Money::from_cents(cents),
        owner: None,
    }
}

/// Capacity 10, two concurrent commits of 6: one booking, one sell-out.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_concurrent_commits_for_six_of_ten() {
    let unit = unit();
    let h = harness(&[(unit, 10)]);

    let first = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .commit(unit, HolderId::new("alice"), 6, payload(2_000))
                .await
        })
    };
    let second = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .commit(unit, HolderId::new("bob"), 6, payload(2_000))
                .await
        })
    };

    let outcomes = [
        first.await.unwrap().unwrap(),
        second.await.unwrap().unwrap(),
    ];

    let committed = outcomes
        .iter()
        .filter(|o| matches!(o, CheckoutOutcome::Committed(_)))
        .count();
    let sold_out: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            CheckoutOutcome::SoldOut { remaining, .. } => Some(*remaining),
            CheckoutOutcome::Committed(_) => None,
        })
        .collect();

    assert_eq!(committed, 1);
    assert_eq!(sold_out, vec![4]);
    assert_eq!(h.bookings.len(), 1);
    assert_eq!(h.ledger.capacity(unit).await.unwrap().confirmed_sold, 6);
}

/// X holds 5 of 5; Y is refused until X's hold expires.
#[tokio::test]
async fn held_out_shopper_gets_seat_after_expiry() {
    let unit = unit();
    let h = harness(&[(unit, 5)]);
    let x = HolderId::new("x");
    let y = HolderId::new("y");

    assert!(matches!(
        h.coordinator.request_hold(unit, x.clone(), 5).await.unwrap(),
        HoldOutcome::Held(_)
    ));

    assert_eq!(
        h.coordinator.request_hold(unit, y.clone(), 1).await.unwrap(),
        HoldOutcome::CapacityExceeded {
            unit_id: unit,
            requested: 1,
            available: 0,
        }
    );

    h.clock.advance(HOLD_TTL);

    let outcome = h.coordinator.request_hold(unit, y.clone(), 1).await.unwrap();
    let HoldOutcome::Held(hold) = outcome else {
        panic!("expected Held, got {outcome:?}");
    };
    assert_eq!(hold.holder_id, y);
    assert_eq!(hold.quantity, 1);
    assert!(h.coordinator.active_hold(&unit, &x).is_none());
}

/// Two-unit checkout where the first unit commits and the second loses its
/// race at the ledger: the first unit is reverted and nothing is booked.
#[tokio::test]
async fn multi_unit_checkout_is_all_or_nothing() {
    let event = EventId::new();
    let stalls = UnitId::category(event, CategoryId::new());
    let balcony = UnitId::category(event, CategoryId::new());
    let ledger = Arc::new(
        InMemorySeatLedger::new()
            .with_unit(stalls, 10)
            .with_unit(balcony, 2),
    );
    // Capacity reads look untouched, so only the atomic commit sees the
    // balcony is gone and stalls is committed before the sell-out.
    let counted = Arc::new(FaultyLedger::new(Arc::new(StaleReadLedger(ledger.clone()))));
    let bookings = Arc::new(InMemoryBookingStore::new());
    let h = harness_with(counted.clone(), bookings.clone(), ledger, bookings);

    h.coordinator
        .commit(balcony, HolderId::new("early-bird"), 2, payload(3_000))
        .await
        .unwrap();

    let shopper = HolderId::new("tab-1");
    h.coordinator
        .request_hold(stalls, shopper.clone(), 3)
        .await
        .unwrap();

    let outcome = h
        .coordinator
        .checkout(CheckoutRequest {
            holder_id: shopper.clone(),
            owner: Some("user-42".to_string()),
            lines: vec![
                BookingLine {
                    unit_id: stalls,
                    quantity: 3,
                    unit_price: Money::from_cents(5_000),
                },
                BookingLine {
                    unit_id: balcony,
                    quantity: 1,
                    unit_price: Money::from_cents(3_000),
                },
            ],
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CheckoutOutcome::SoldOut {
            unit_id: balcony,
            requested: 1,
            remaining: 0,
        }
    );
    assert_eq!(counted.rollback_calls(), 1);
    assert_eq!(h.ledger.capacity(stalls).await.unwrap().confirmed_sold, 0);
    assert_eq!(h.ledger.capacity(balcony).await.unwrap().confirmed_sold, 2);
    assert_eq!(h.bookings.len(), 1);
    assert!(h.coordinator.bookings_for_unit(stalls).await.unwrap().is_empty());
    // Sold-out checkouts keep the shopper's holds.
    assert_eq!(h.coordinator.active_hold(&stalls, &shopper).unwrap().quantity, 3);
}

#[tokio::test]
async fn successful_checkout_books_all_lines_and_releases_holds() {
    let event = EventId::new();
    let stalls = UnitId::category(event, CategoryId::new());
    let balcony = UnitId::category(event, CategoryId::new());
    let h = harness(&[(stalls, 10), (balcony, 4)]);
    let shopper = HolderId::new("tab-1");

    h.coordinator.request_hold(stalls, shopper.clone(), 2).await.unwrap();
    h.coordinator.request_hold(balcony, shopper.clone(), 1).await.unwrap();

    let outcome = h
        .coordinator
        .checkout(
            CheckoutRequest {
                holder_id: shopper.clone(),
                owner: None,
                lines: vec![
                    BookingLine {
                        unit_id: stalls,
                        quantity: 2,
                        unit_price: Money::from_cents(5_000),
                    },
                    BookingLine {
                        unit_id: balcony,
                        quantity: 1,
                        unit_price: Money::from_cents(3_000),
                    },
                ],
            }
            .with_owner("user-7"),
        )
        .await
        .unwrap();

    let booking = outcome.booking().expect("checkout should commit").clone();
    assert_eq!(booking.total_amount, Money::from_cents(13_000));
    assert_eq!(booking.owner.as_deref(), Some("user-7"));
    assert_eq!(booking.quantity_for(&stalls), 2);
    assert_eq!(booking.quantity_for(&balcony), 1);

    assert!(h.coordinator.active_hold(&stalls, &shopper).is_none());
    assert!(h.coordinator.active_hold(&balcony, &shopper).is_none());
    assert_eq!(h.ledger.capacity(stalls).await.unwrap().confirmed_sold, 2);
    assert_eq!(h.ledger.capacity(balcony).await.unwrap().confirmed_sold, 1);

    assert_eq!(
        h.coordinator.booking(booking.booking_id).await.unwrap(),
        Some(booking.clone())
    );
    assert_eq!(
        h.coordinator.bookings_for_unit(balcony).await.unwrap(),
        vec![booking]
    );
}

#[tokio::test]
async fn commit_after_hold_expired_still_goes_through_ledger() {
    let unit = unit();
    let h = harness(&[(unit, 3)]);
    let shopper = HolderId::new("slow-payer");

    h.coordinator.request_hold(unit, shopper.clone(), 2).await.unwrap();
    h.clock.advance(HOLD_TTL + Duration::from_secs(1));

    // Someone else took the freed seats meanwhile.
    h.coordinator
        .commit(unit, HolderId::new("fast-payer"), 2, payload(1_000))
        .await
        .unwrap();

    let outcome = h
        .coordinator
        .commit(unit, shopper, 2, payload(1_000))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        CheckoutOutcome::SoldOut { remaining: 1, .. }
    ));
    assert!(outcome.user_message().contains("claimed by someone else"));
}
