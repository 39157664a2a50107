//! `GET /api/availability?event_id=..&category_id=..`
//!
//! Sent with `X-Holder-Id`, the caller's own hold is not subtracted.

use crate::{error::AppError, extractors::HolderIdentity, state::AppState};
use axum::{
    Json,
    extract::{Query, State},
};
use seat_inventory_core::{AvailabilitySnapshot, CategoryId, EventId, UnitId};
use serde::Deserialize;
use uuid::Uuid;

/// Query string identifying a unit.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    /// Event id
    pub event_id: Uuid,
    /// Category id; omit for whole-event units
    pub category_id: Option<Uuid>,
}

impl AvailabilityQuery {
    /// Unit addressed by the query.
    #[must_use]
    pub fn unit_id(&self) -> UnitId {
        let event_id = EventId::from_uuid(self.event_id);
        match self.category_id {
            Some(category_id) => UnitId::category(event_id, CategoryId::from_uuid(category_id)),
            None => UnitId::event(event_id),
        }
    }
}

/// Effective availability of one unit.
///
/// # Errors
///
/// - `404`: unknown unit
/// - `503`: ledger unavailable
pub async fn get_availability(
    State(state): State<AppState>,
    viewer: Option<HolderIdentity>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilitySnapshot>, AppError> {
    let viewer = viewer.map(|HolderIdentity(holder)| holder);
    let snapshot = state
        .coordinator
        .availability(query.unit_id(), viewer.as_ref())
        .await?;
    Ok(Json(snapshot))
}
