//! Checkout and booking lookup.
//!
//! - `POST /api/checkout`: buy every line or nothing
//! - `GET /api/bookings/:id`: read a confirmed booking
//!
//! A lost race is not an error: it is answered with `200 OK` and
//! `"status": "sold_out"`, together with a message explaining that someone
//! else got the seats. A successful checkout answers `201 Created`.

use crate::{error::AppError, extractors::HolderIdentity, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use seat_inventory_core::{Booking, BookingId, BookingLine, CheckoutOutcome, CheckoutRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /api/checkout`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutBody {
    /// Owner reference (user id, email, ...)
    #[serde(default)]
    pub owner: Option<String>,
    /// Units, quantities and prices to buy
    pub lines: Vec<BookingLine>,
}

/// Response of `POST /api/checkout`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    /// Committed booking or sold-out details
    #[serde(flatten)]
    pub outcome: CheckoutOutcome,
    /// Message to show the shopper
    pub message: String,
}

/// Commit a checkout.
///
/// # Errors
///
/// - `422`: empty checkout, zero quantity or repeated unit
/// - `404`: unknown unit
/// - `503`: storage failed; nothing was sold, safe to retry
/// - `500`: a compensating rollback failed; operators were alerted
pub async fn checkout(
    State(state): State<AppState>,
    HolderIdentity(holder): HolderIdentity,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let request = CheckoutRequest {
        holder_id: holder,
        owner: body.owner,
        lines: body.lines,
    };

    let outcome = state.coordinator.checkout(request).await?;
    let status = match outcome {
        CheckoutOutcome::Committed(_) => StatusCode::CREATED,
        CheckoutOutcome::SoldOut { .. } => StatusCode::OK,
    };

    Ok((
        status,
        Json(CheckoutResponse {
            message: outcome.user_message(),
            outcome,
        }),
    ))
}

/// Read a booking by id.
///
/// # Errors
///
/// - `404`: no such booking
/// - `503`: booking store unavailable
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    state
        .coordinator
        .booking(BookingId::from_uuid(booking_id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Booking", booking_id))
}
