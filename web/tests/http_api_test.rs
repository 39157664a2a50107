//! HTTP API tests against in-memory storage.
//!
//! The router is driven in-process through `axum-test`; no socket is bound.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use seat_inventory_core::{AvailabilitySnapshot, Booking, EventId, HoldOutcome, UnitId};
use seat_inventory_runtime::{InMemoryBookingStore, InMemorySeatLedger, ReservationCoordinator};
use seat_inventory_testing::FaultyBookingStore;
use seat_inventory_web::{AppState, HOLDER_ID_HEADER, Storage, build_router};
use serde_json::{Value, json};
use std::sync::Arc;

fn server_with(storage: Storage) -> TestServer {
    let coordinator = ReservationCoordinator::builder(storage.ledger, storage.bookings).build();
    let state = AppState::new(Arc::new(coordinator), storage.catalog);
    TestServer::new(build_router(state)).expect("test server")
}

fn server() -> TestServer {
    server_with(Storage::in_memory())
}

fn as_holder(request: TestRequest, holder: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-holder-id"),
        HeaderValue::from_str(holder).unwrap(),
    )
}

async fn register(server: &TestServer, unit: UnitId, total: u32) {
    server
        .put("/api/units")
        .json(&json!({ "unit": unit, "total_capacity": total }))
        .await
        .assert_status_ok();
}

fn checkout_body(unit: UnitId, quantity: u32) -> Value {
    json!({
        "owner": "user-1",
        "lines": [{ "unit_id": unit, "quantity": quantity, "unit_price": 2500 }]
    })
}

#[tokio::test]
async fn test_health_and_missing_metrics_recorder() {
    let server = server();

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    server
        .get("/metrics")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_register_unit_returns_availability() {
    let server = server();
    let unit = UnitId::event(EventId::new());

    let response = server
        .put("/api/units")
        .json(&json!({ "unit": unit, "total_capacity": 40 }))
        .await;

    response.assert_status_ok();
    let snapshot: AvailabilitySnapshot = response.json();
    assert_eq!(snapshot.total, 40);
    assert_eq!(snapshot.available, 40);
}

#[tokio::test]
async fn test_hold_is_reflected_in_availability() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    let hold = as_holder(server.post("/api/holds"), "tab-1")
        .json(&json!({ "unit": unit, "quantity": 4 }))
        .await;
    hold.assert_status_ok();
    assert!(matches!(hold.json::<HoldOutcome>(), HoldOutcome::Held(h) if h.quantity == 4));

    let query = [("event_id", unit.event_id.to_string())];
    let others: AvailabilitySnapshot = server
        .get("/api/availability")
        .add_query_params(query.clone())
        .await
        .json();
    assert_eq!(others.available, 6);

    let own: AvailabilitySnapshot = as_holder(server.get("/api/availability"), "tab-1")
        .add_query_params(query)
        .await
        .json();
    assert_eq!(own.available, 10);
}

#[tokio::test]
async fn test_capacity_exceeded_is_not_an_error() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 3).await;

    let response = as_holder(server.post("/api/holds"), "tab-1")
        .json(&json!({ "unit": unit, "quantity": 5 }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "capacity_exceeded");
    assert_eq!(body["available"], 3);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    as_holder(server.post("/api/holds"), "tab-1")
        .json(&json!({ "unit": unit, "quantity": 2 }))
        .await
        .assert_status_ok();

    for expected in [true, false] {
        let response = as_holder(server.post("/api/holds/release"), "tab-1")
            .json(&json!({ "unit": unit }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["released"], expected);
    }
}

#[tokio::test]
async fn test_hold_requires_holder_header() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    let response = server
        .post("/api/holds")
        .json(&json!({ "unit": unit, "quantity": 1 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(
        response.json::<Value>()["message"]
            .as_str()
            .unwrap()
            .contains(HOLDER_ID_HEADER)
    );
}

#[tokio::test]
async fn test_zero_quantity_is_unprocessable() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    let response = as_holder(server.post("/api/holds"), "tab-1")
        .json(&json!({ "unit": unit, "quantity": 0 }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_unit_is_not_found() {
    let server = server();
    let unit = UnitId::event(EventId::new());

    as_holder(server.post("/api/holds"), "tab-1")
        .json(&json!({ "unit": unit, "quantity": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .get("/api/availability")
        .add_query_param("event_id", unit.event_id)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_then_lookup_booking() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    let response = as_holder(server.post("/api/checkout"), "tab-1")
        .json(&checkout_body(unit, 3))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body = response.json::<Value>();
    assert_eq!(body["status"], "committed");
    assert_eq!(body["total_amount"], 7500);
    let booking_id = body["booking_id"].as_str().unwrap().to_string();

    let booking: Booking = server.get(&format!("/api/bookings/{booking_id}")).await.json();
    assert_eq!(booking.booking_id.to_string(), booking_id);
    assert_eq!(booking.quantity_for(&unit), 3);
    assert_eq!(booking.owner.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_lost_race_reports_sold_out() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    as_holder(server.post("/api/checkout"), "alice")
        .json(&checkout_body(unit, 6))
        .await
        .assert_status(StatusCode::CREATED);

    let response = as_holder(server.post("/api/checkout"), "bob")
        .json(&checkout_body(unit, 6))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "sold_out");
    assert_eq!(body["remaining"], 4);
    assert!(body["message"].as_str().unwrap().contains("claimed by someone else"));
}

#[tokio::test]
async fn test_storage_failure_is_retryable_and_sells_nothing() {
    let ledger = Arc::new(InMemorySeatLedger::new());
    let bookings = Arc::new(FaultyBookingStore::new(Arc::new(InMemoryBookingStore::new())));
    bookings.fail_next(1);
    let server = server_with(Storage {
        ledger: ledger.clone(),
        bookings: bookings.clone(),
        catalog: ledger.clone(),
    });
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    let failed = as_holder(server.post("/api/checkout"), "tab-1")
        .json(&checkout_body(unit, 2))
        .await;
    failed.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(failed.json::<Value>()["retryable"], true);

    let snapshot: AvailabilitySnapshot = server
        .get("/api/availability")
        .add_query_param("event_id", unit.event_id)
        .await
        .json();
    assert_eq!(snapshot.confirmed_sold, 0);

    as_holder(server.post("/api/checkout"), "tab-1")
        .json(&checkout_body(unit, 2))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let server = server();

    server
        .get(&format!("/api/bookings/{}", uuid::Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shrinking_below_sold_conflicts() {
    let server = server();
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;

    as_holder(server.post("/api/checkout"), "tab-1")
        .json(&checkout_body(unit, 8))
        .await
        .assert_status(StatusCode::CREATED);

    server
        .put("/api/units")
        .json(&json!({ "unit": unit, "total_capacity": 5 }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_capacity_change_is_pushed_to_subscribers() {
    let storage = Storage::in_memory();
    let coordinator = Arc::new(
        ReservationCoordinator::builder(storage.ledger, storage.bookings).build(),
    );
    let server = TestServer::new(build_router(AppState::new(
        coordinator.clone(),
        storage.catalog,
    )))
    .expect("test server");
    let unit = UnitId::event(EventId::new());
    register(&server, unit, 10).await;
    let mut feed = coordinator.subscribe(unit).await;

    register(&server, unit, 25).await;

    let pushed = feed.try_recv().expect("resize should push a snapshot");
    assert_eq!((pushed.total, pushed.available), (25, 25));
}
