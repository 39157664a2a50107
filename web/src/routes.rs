//! Router for the seat inventory service.

use crate::handlers::{availability, bookings, health, holds, units, websocket};
use crate::middleware::track_requests;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete router.
///
/// ```text
/// PUT  /api/units                register or resize a unit
/// POST /api/holds                place or refresh a hold
/// POST /api/holds/release        release a hold
/// POST /api/checkout             commit a checkout
/// GET  /api/availability         effective availability of a unit
/// GET  /api/bookings/:id         read a booking
/// GET  /ws                       live availability and holds
/// GET  /health                   liveness
/// GET  /metrics                  Prometheus scrape
/// ```
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/units", put(units::register_unit))
        .route("/holds", post(holds::place_hold))
        .route("/holds/release", post(holds::release_hold))
        .route("/checkout", post(bookings::checkout))
        .route("/availability", get(availability::get_availability))
        .route("/bookings/:id", get(bookings::get_booking));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics_endpoint))
        .route("/ws", get(websocket::handle))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
