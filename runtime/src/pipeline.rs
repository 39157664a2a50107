//! Failure-atomic conversion of a checkout into a confirmed booking.
//!
//! # Steps
//!
//! ```text
//! validate ─> read capacity ─> try_commit each line ─> insert booking ─> release holds ─> notify
//!                  │                    │                      │
//!                  └─ SoldOut           ├─ SoldOut ──┐         │
//!                                       └─ error ────┴─ roll back committed lines
//! ```
//!
//! A checkout spanning several units is all-or-nothing. Whenever a later step
//! fails, every line already committed for the same checkout is rolled back
//! (newest first) before the outcome is returned, so the ledger never keeps a
//! sale without a booking.
//!
//! Holds are neither required nor consulted: the ledger decides. A sold-out
//! checkout leaves the holder's holds in place. Holds are released in each
//! pair's lane, after any hold request for the pair that was already queued.
//!
//! If a rollback itself fails after retries, the ledger over-counts. That is
//! reported through the [`AlertSink`] and returned as
//! [`ReservationError::RollbackFailed`].

use crate::broadcaster::AvailabilityBroadcaster;
use crate::hold_table::HoldTable;
use crate::metrics::{CommitMetrics, HoldMetrics};
use crate::retry::{RetryPolicy, retry_with_predicate};
use seat_inventory_core::{
    AlertSink, Booking, BookingId, BookingStore, CheckoutOutcome, CheckoutRequest, Clock,
    CommitOutcome, HolderId, LedgerAlert, LedgerError, Money, ReservationError, SeatLedger, UnitId,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Executes checkouts against the ledger and booking store.
pub struct BookingCommitPipeline {
    ledger: Arc<dyn SeatLedger>,
    bookings: Arc<dyn BookingStore>,
    holds: Arc<HoldTable>,
    broadcaster: Arc<AvailabilityBroadcaster>,
    clock: Arc<dyn Clock>,
    alerts: Arc<dyn AlertSink>,
    rollback_policy: RetryPolicy,
}

impl BookingCommitPipeline {
    /// Wire a pipeline to its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        bookings: Arc<dyn BookingStore>,
        holds: Arc<HoldTable>,
        broadcaster: Arc<AvailabilityBroadcaster>,
        clock: Arc<dyn Clock>,
        alerts: Arc<dyn AlertSink>,
        rollback_policy: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            bookings,
            holds,
            broadcaster,
            clock,
            alerts,
            rollback_policy,
        }
    }

    /// Run a checkout to completion.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: empty checkout, zero quantity, repeated unit, or a
    ///   total that overflows
    /// - `UnknownUnit`: a line names a unit the ledger does not know
    /// - `PersistenceFailure`: storage failed; every committed line was
    ///   rolled back
    /// - `RollbackFailed`: storage failed and a rollback failed too
    pub async fn commit(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, ReservationError> {
        let started = Instant::now();
        let result = self.run(request).await;

        match &result {
            Ok(outcome) => CommitMetrics::record_outcome(outcome, started.elapsed()),
            Err(_) => CommitMetrics::record_failure(started.elapsed()),
        }
        result
    }

    async fn run(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, ReservationError> {
        let total_amount = validate(&request)?;
        let holder_id = &request.holder_id;

        // Cheap early exit; the ledger re-checks atomically below.
        for line in &request.lines {
            let capacity = self.ledger.capacity(line.unit_id).await?;
            if capacity.remaining() < line.quantity {
                tracing::info!(
                    unit_id = %line.unit_id,
                    holder_id = %holder_id,
                    requested = line.quantity,
                    remaining = capacity.remaining(),
                    "Checkout sold out"
                );
                return Ok(CheckoutOutcome::SoldOut {
                    unit_id: line.unit_id,
                    requested: line.quantity,
                    remaining: capacity.remaining(),
                });
            }
        }

        let mut committed: Vec<(UnitId, u32)> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            match self.ledger.try_commit(line.unit_id, line.quantity).await {
                Ok(CommitOutcome::Committed { confirmed_sold }) => {
                    tracing::debug!(
                        unit_id = %line.unit_id,
                        quantity = line.quantity,
                        confirmed_sold,
                        "Ledger line committed"
                    );
                    committed.push((line.unit_id, line.quantity));
                },
                Ok(CommitOutcome::InsufficientCapacity { remaining }) => {
                    tracing::info!(
                        unit_id = %line.unit_id,
                        holder_id = %holder_id,
                        requested = line.quantity,
                        remaining,
                        "Checkout lost the race for the last seats"
                    );
                    self.compensate(&committed, holder_id, None).await?;
                    return Ok(CheckoutOutcome::SoldOut {
                        unit_id: line.unit_id,
                        requested: line.quantity,
                        remaining,
                    });
                },
                Err(error) => {
                    tracing::warn!(
                        unit_id = %line.unit_id,
                        holder_id = %holder_id,
                        error = %error,
                        "Ledger commit failed"
                    );
                    self.compensate(&committed, holder_id, None).await?;
                    return Err(error.into());
                },
            }
        }

        let booking = Booking {
            booking_id: BookingId::new(),
            holder_id: holder_id.clone(),
            owner: request.owner.clone(),
            lines: request.lines.clone(),
            total_amount,
            created_at: self.clock.now(),
        };

        if let Err(error) = self.bookings.insert(&booking).await {
            tracing::warn!(
                booking_id = %booking.booking_id,
                holder_id = %holder_id,
                error = %error,
                "Booking write failed, rolling back ledger"
            );
            self.compensate(&committed, holder_id, Some(booking.booking_id))
                .await?;
            return Err(error.into());
        }

        let mut released = 0;
        for line in &request.lines {
            let _lane = self.holds.lane(line.unit_id, holder_id).await;
            if self.holds.release(&line.unit_id, holder_id).is_some() {
                released += 1;
            }
        }
        HoldMetrics::record_released(released);

        for line in &request.lines {
            self.broadcaster.notify(line.unit_id).await;
        }

        tracing::info!(
            booking_id = %booking.booking_id,
            holder_id = %holder_id,
            lines = booking.lines.len(),
            total_amount = %booking.total_amount,
            "Booking committed"
        );
        Ok(CheckoutOutcome::Committed(booking))
    }

    /// Roll back committed lines, newest first.
    ///
    /// Keeps going after a failed rollback so that as many units as possible
    /// are restored, then reports the first failure.
    async fn compensate(
        &self,
        committed: &[(UnitId, u32)],
        holder_id: &HolderId,
        booking_id: Option<BookingId>,
    ) -> Result<(), ReservationError> {
        let mut first_failure = None;

        for &(unit_id, quantity) in committed.iter().rev() {
            let result = retry_with_predicate(
                self.rollback_policy.clone(),
                || self.ledger.rollback(unit_id, quantity),
                |error: &LedgerError| matches!(error, LedgerError::Storage(_)),
            )
            .await;

            match result {
                Ok(()) => {
                    CommitMetrics::record_rollback();
                    tracing::debug!(%unit_id, quantity, "Ledger line rolled back");
                },
                Err(error) => {
                    CommitMetrics::record_rollback_failure();
                    self.alerts.raise(LedgerAlert {
                        unit_id,
                        quantity,
                        holder_id: holder_id.clone(),
                        booking_id,
                        reason: error.to_string(),
                        raised_at: self.clock.now(),
                    });
                    first_failure.get_or_insert(ReservationError::RollbackFailed {
                        unit_id,
                        quantity,
                        reason: error.to_string(),
                    });
                },
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for BookingCommitPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingCommitPipeline")
            .field("rollback_policy", &self.rollback_policy)
            .finish_non_exhaustive()
    }
}

/// Reject malformed checkouts before any shared state is touched.
///
/// Returns the booking total.
fn validate(request: &CheckoutRequest) -> Result<Money, ReservationError> {
    if request.lines.is_empty() {
        return Err(ReservationError::InvalidRequest(
            "checkout has no lines".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(request.lines.len());
    let mut total = Money::ZERO;
    for line in &request.lines {
        if line.quantity == 0 {
            return Err(ReservationError::InvalidRequest(format!(
                "quantity for unit {} must be positive",
                line.unit_id
            )));
        }
        if !seen.insert(line.unit_id) {
            return Err(ReservationError::InvalidRequest(format!(
                "unit {} appears more than once",
                line.unit_id
            )));
        }
        total = line
            .line_total()
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| {
                ReservationError::InvalidRequest("checkout total overflows".to_string())
            })?;
    }
    Ok(total)
}
