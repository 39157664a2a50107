//! `PUT /api/units`: register a sellable unit or resize it.

use crate::{error::AppError, state::AppState};
use axum::{Json, extract::State, http::StatusCode};
use seat_inventory_core::{AvailabilitySnapshot, LedgerError, UnitId};
use serde::Deserialize;

/// Body of `PUT /api/units`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUnit {
    /// Unit to create or resize
    pub unit: UnitId,
    /// Total seats
    pub total_capacity: u32,
}

/// Register `unit` with `total_capacity` seats, push the new availability to
/// its subscribers and return it.
///
/// # Errors
///
/// - `409`: the new total is below the seats already sold
/// - `503`: ledger unavailable
pub async fn register_unit(
    State(state): State<AppState>,
    Json(request): Json<RegisterUnit>,
) -> Result<(StatusCode, Json<AvailabilitySnapshot>), AppError> {
    state
        .catalog
        .register(request.unit, request.total_capacity)
        .await
        .map_err(|error| match error {
            LedgerError::Inconsistent { reason, .. } => AppError::conflict(reason),
            other => AppError::from(seat_inventory_core::ReservationError::from(other)),
        })?;

    tracing::info!(unit_id = %request.unit, total = request.total_capacity, "Unit registered");
    state.coordinator.publish_availability(request.unit).await;
    let snapshot = state.coordinator.availability(request.unit, None).await?;
    Ok((StatusCode::OK, Json(snapshot)))
}
