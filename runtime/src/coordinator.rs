//! Entry point for every reservation operation.
//!
//! The coordinator owns the [`HoldTable`], the [`AvailabilityBroadcaster`]
//! and the [`BookingCommitPipeline`], and is the only component that mutates
//! holds or drives a ledger commit.
//!
//! # Per-holder state machine
//!
//! ```text
//! NoHold ──request_hold──> Held ──commit──────> Committed
//!                          │  ^ ──release────> Released
//!                          │  │ ──ttl passes─> Expired
//!                          └──┘ request_hold (refresh, new ttl)
//! ```
//!
//! Every terminal state can go straight back to `Held`. The TTL is fixed from
//! the last `request_hold`; nothing else extends it.
//!
//! Operations on one `(unit, holder)` pair take the pair's
//! [`HolderLane`](crate::hold_table::HolderLane), so they apply in request
//! order even though `request_hold` reads the ledger before placing.

use crate::broadcaster::{AvailabilityBroadcaster, AvailabilitySubscription};
use crate::config::EngineConfig;
use crate::hold_table::HoldTable;
use crate::metrics::HoldMetrics;
use crate::pipeline::BookingCommitPipeline;
use seat_inventory_core::{
    AlertSink, AvailabilitySnapshot, Booking, BookingId, BookingPayload, BookingStore,
    CheckoutOutcome, CheckoutRequest, Clock, Hold, HoldOutcome, HolderId, ReservationError,
    SeatLedger, SystemClock, TracingAlertSink, UnitId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Orchestrates holds, availability and commits.
pub struct ReservationCoordinator {
    ledger: Arc<dyn SeatLedger>,
    bookings: Arc<dyn BookingStore>,
    holds: Arc<HoldTable>,
    broadcaster: Arc<AvailabilityBroadcaster>,
    pipeline: BookingCommitPipeline,
    config: EngineConfig,
}

impl ReservationCoordinator {
    /// Start building a coordinator over the given storage.
    #[must_use]
    pub fn builder(
        ledger: Arc<dyn SeatLedger>,
        bookings: Arc<dyn BookingStore>,
    ) -> ReservationCoordinatorBuilder {
        ReservationCoordinatorBuilder {
            ledger,
            bookings,
            clock: Arc::new(SystemClock),
            alerts: Arc::new(TracingAlertSink),
            config: EngineConfig::default(),
        }
    }

    /// Place or refresh the holder's hold on `unit_id`.
    ///
    /// Availability is computed excluding the holder's own hold, so asking
    /// again for the same or a smaller quantity always fits unless seats were
    /// sold meanwhile. This check is advisory; the ledger still decides at
    /// commit.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: `quantity` is zero
    /// - `UnknownUnit`: the ledger does not know the unit
    /// - `PersistenceFailure`: the ledger read failed
    pub async fn request_hold(
        &self,
        unit_id: UnitId,
        holder_id: HolderId,
        quantity: u32,
    ) -> Result<HoldOutcome, ReservationError> {
        if quantity == 0 {
            return Err(ReservationError::InvalidRequest(
                "hold quantity must be positive".to_string(),
            ));
        }

        let lane = self.holds.lane(unit_id, &holder_id).await;
        let snapshot = self.broadcaster.snapshot(unit_id, Some(&holder_id)).await?;
        if quantity > snapshot.available {
            HoldMetrics::record_rejected();
            tracing::debug!(
                %unit_id,
                %holder_id,
                requested = quantity,
                available = snapshot.available,
                "Hold rejected, capacity exceeded"
            );
            return Ok(HoldOutcome::CapacityExceeded {
                unit_id,
                requested: quantity,
                available: snapshot.available,
            });
        }

        let hold = self
            .holds
            .place(unit_id, holder_id, quantity, self.config.hold_ttl)?;
        HoldMetrics::record_placed();
        tracing::debug!(
            %unit_id,
            holder_id = %hold.holder_id,
            quantity,
            expires_at = %hold.expires_at,
            "Hold placed"
        );
        drop(lane);

        self.broadcaster.notify(unit_id).await;
        Ok(HoldOutcome::Held(hold))
    }

    /// Release the holder's hold on `unit_id`. Always succeeds.
    ///
    /// Returns whether a hold was removed.
    pub async fn release_hold(&self, unit_id: UnitId, holder_id: &HolderId) -> bool {
        let lane = self.holds.lane(unit_id, holder_id).await;
        let released = self.holds.release(&unit_id, holder_id);
        drop(lane);
        let Some(hold) = released else {
            return false;
        };

        HoldMetrics::record_released(1);
        tracing::debug!(%unit_id, %holder_id, quantity = hold.quantity, "Hold released");
        self.broadcaster.notify(unit_id).await;
        true
    }

    /// Buy `quantity` seats of one unit.
    ///
    /// A hold is not required: an expired or missing hold is treated as a
    /// fresh request and still goes through the ledger.
    ///
    /// # Errors
    ///
    /// See [`BookingCommitPipeline::commit`].
    pub async fn commit(
        &self,
        unit_id: UnitId,
        holder_id: HolderId,
        quantity: u32,
        payload: BookingPayload,
    ) -> Result<CheckoutOutcome, ReservationError> {
        let mut request = CheckoutRequest::single(unit_id, holder_id, quantity, payload.unit_price);
        request.owner = payload.owner;
        self.checkout(request).await
    }

    /// Buy seats across one or more units, all or nothing.
    ///
    /// # Errors
    ///
    /// See [`BookingCommitPipeline::commit`].
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ReservationError> {
        self.pipeline.commit(request).await
    }

    /// Effective availability of `unit_id`, relative to `viewer` if given.
    ///
    /// # Errors
    ///
    /// - `UnknownUnit`: the ledger does not know the unit
    /// - `PersistenceFailure`: the ledger read failed
    pub async fn availability(
        &self,
        unit_id: UnitId,
        viewer: Option<&HolderId>,
    ) -> Result<AvailabilitySnapshot, ReservationError> {
        Ok(self.broadcaster.snapshot(unit_id, viewer).await?)
    }

    /// Follow availability pushes for `unit_id`.
    pub async fn subscribe(&self, unit_id: UnitId) -> AvailabilitySubscription {
        self.broadcaster.subscribe(unit_id).await
    }

    /// Stop following a unit.
    pub async fn unsubscribe(&self, subscription: AvailabilitySubscription) {
        self.broadcaster.unsubscribe(subscription).await;
    }

    /// Push a fresh snapshot of `unit_id` to its subscribers.
    ///
    /// For changes made outside the coordinator, such as a capacity change
    /// through the catalog. Returns the number of subscribers reached.
    pub async fn publish_availability(&self, unit_id: UnitId) -> usize {
        self.broadcaster.notify(unit_id).await
    }

    /// Release every hold of a holder whose connection went away.
    ///
    /// The caller must have stopped issuing requests for this holder; a
    /// hold placed after the call is kept.
    ///
    /// Returns the number of holds released.
    pub async fn disconnect(&self, holder_id: &HolderId) -> usize {
        let released = self.holds.release_holder(holder_id);
        if released.is_empty() {
            return 0;
        }

        HoldMetrics::record_released(released.len());
        tracing::debug!(%holder_id, holds = released.len(), "Holder disconnected, holds released");
        self.notify_units(&released).await;
        released.len()
    }

    /// Evict expired holds and push fresh availability for affected units.
    ///
    /// Returns the number of holds evicted.
    pub async fn sweep_expired(&self) -> usize {
        let expired = self.holds.sweep_expired();
        if expired.is_empty() {
            return 0;
        }

        HoldMetrics::record_expired(expired.len());
        tracing::debug!(holds = expired.len(), "Expired holds swept");
        self.notify_units(&expired).await;
        expired.len()
    }

    /// The holder's active hold on `unit_id`, if any.
    #[must_use]
    pub fn active_hold(&self, unit_id: &UnitId, holder_id: &HolderId) -> Option<Hold> {
        self.holds.active_hold(unit_id, holder_id)
    }

    /// Look up a confirmed booking.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the booking store failed.
    pub async fn booking(&self, booking_id: BookingId) -> Result<Option<Booking>, ReservationError> {
        Ok(self.bookings.get(booking_id).await?)
    }

    /// Bookings that include `unit_id`.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceFailure` if the booking store failed.
    pub async fn bookings_for_unit(&self, unit_id: UnitId) -> Result<Vec<Booking>, ReservationError> {
        Ok(self.bookings.bookings_for_unit(unit_id).await?)
    }

    /// The ledger this coordinator commits against.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn SeatLedger> {
        &self.ledger
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn notify_units(&self, holds: &[Hold]) {
        let units: BTreeSet<UnitId> = holds.iter().map(|hold| hold.unit_id).collect();
        for unit_id in units {
            self.broadcaster.notify(unit_id).await;
        }
    }
}

impl std::fmt::Debug for ReservationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationCoordinator")
            .field("holds", &self.holds)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ReservationCoordinator`].
pub struct ReservationCoordinatorBuilder {
    ledger: Arc<dyn SeatLedger>,
    bookings: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    alerts: Arc<dyn AlertSink>,
    config: EngineConfig,
}

impl ReservationCoordinatorBuilder {
    /// Use a custom clock (defaults to [`SystemClock`]).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a custom alert sink (defaults to [`TracingAlertSink`]).
    #[must_use]
    pub fn alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Override the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the coordinator.
    #[must_use]
    pub fn build(self) -> ReservationCoordinator {
        let holds = Arc::new(HoldTable::new(Arc::clone(&self.clock)));
        let broadcaster = Arc::new(AvailabilityBroadcaster::new(
            Arc::clone(&self.ledger),
            Arc::clone(&holds),
            Arc::clone(&self.clock),
            self.config.broadcast_capacity,
        ));
        let pipeline = BookingCommitPipeline::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.bookings),
            Arc::clone(&holds),
            Arc::clone(&broadcaster),
            self.clock,
            self.alerts,
            self.config.rollback_retry.clone(),
        );

        ReservationCoordinator {
            ledger: self.ledger,
            bookings: self.bookings,
            holds,
            broadcaster,
            pipeline,
            config: self.config,
        }
    }
}
