//! Hold endpoints.
//!
//! - `POST /api/holds`: place or refresh the caller's hold on a unit
//! - `POST /api/holds/release`: drop it
//!
//! Both identify the caller with the `X-Holder-Id` header. A hold that does
//! not fit is answered with `200 OK` and `"status": "capacity_exceeded"` so
//! the UI can clamp the selection to `available`.

use crate::{error::AppError, extractors::HolderIdentity, state::AppState};
use axum::{Json, extract::State};
use seat_inventory_core::{HoldOutcome, UnitId};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/holds`.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldRequest {
    /// Unit to hold seats of
    pub unit: UnitId,
    /// Seats wanted; replaces any previous hold of the caller on this unit
    pub quantity: u32,
}

/// Body of `POST /api/holds/release`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRequest {
    /// Unit to release
    pub unit: UnitId,
}

/// Response of `POST /api/holds/release`.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResponse {
    /// Whether a hold existed and was removed
    pub released: bool,
}

/// Place or refresh a hold.
///
/// # Errors
///
/// - `422`: zero quantity
/// - `404`: unknown unit
/// - `503`: ledger unavailable
pub async fn place_hold(
    State(state): State<AppState>,
    HolderIdentity(holder): HolderIdentity,
    Json(request): Json<HoldRequest>,
) -> Result<Json<HoldOutcome>, AppError> {
    let outcome = state
        .coordinator
        .request_hold(request.unit, holder, request.quantity)
        .await?;
    Ok(Json(outcome))
}

/// Release the caller's hold. Releasing nothing is not an error.
pub async fn release_hold(
    State(state): State<AppState>,
    HolderIdentity(holder): HolderIdentity,
    Json(request): Json<ReleaseRequest>,
) -> Json<ReleaseResponse> {
    let released = state.coordinator.release_hold(request.unit, &holder).await;
    Json(ReleaseResponse { released })
}
