//! Seat ledger trait: the authoritative capacity counters.
//!
//! # Design
//!
//! The ledger is the only place where "is there room?" is actually decided.
//! Holds, availability broadcasts and UI checks are advisory; every sale goes
//! through [`SeatLedger::try_commit`], which must be a single atomic
//! conditional increment against the backing store:
//!
//! ```text
//! confirmed_sold += quantity   IF confirmed_sold + quantity <= total_capacity
//! ```
//!
//! # Implementations
//!
//! - `InMemorySeatLedger` (in `seat-inventory-runtime`): mutex-guarded map
//! - `PostgresSeatLedger` (in `seat-inventory-postgres`): one conditional `UPDATE`
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] instead of using `async fn` so the ledger can be
//! shared as `Arc<dyn SeatLedger>`.

use crate::error::LedgerError;
use crate::outcome::CommitOutcome;
use crate::types::{CapacitySnapshot, UnitId};
use futures::future::BoxFuture;

/// Authoritative per-unit seat counters.
///
/// Implementations must be `Send + Sync`; they are called concurrently from
/// many request handlers.
pub trait SeatLedger: Send + Sync {
    /// Read the current counters for a unit.
    ///
    /// The result may be stale as soon as it is returned. Use it for display
    /// and advisory checks only.
    ///
    /// # Errors
    ///
    /// - `UnknownUnit`: the unit was never registered
    /// - `Storage`: the backing store failed
    fn capacity(&self, unit_id: UnitId) -> BoxFuture<'_, Result<CapacitySnapshot, LedgerError>>;

    /// Atomically sell `quantity` seats if they fit.
    ///
    /// Returns [`CommitOutcome::InsufficientCapacity`] (not an error) when the
    /// increment would exceed `total_capacity`. Must never allow
    /// `confirmed_sold > total_capacity`, regardless of how many callers race.
    ///
    /// # Errors
    ///
    /// - `UnknownUnit`: the unit was never registered
    /// - `Storage`: the backing store failed (nothing was committed)
    fn try_commit(
        &self,
        unit_id: UnitId,
        quantity: u32,
    ) -> BoxFuture<'_, Result<CommitOutcome, LedgerError>>;

    /// Compensate a previous successful [`try_commit`](Self::try_commit).
    ///
    /// Decrements `confirmed_sold` by `quantity`. Used only by the commit
    /// pipeline when a later step of the same checkout fails.
    ///
    /// # Errors
    ///
    /// - `UnknownUnit`: the unit was never registered
    /// - `Inconsistent`: `confirmed_sold` is smaller than `quantity`
    /// - `Storage`: the backing store failed
    fn rollback(&self, unit_id: UnitId, quantity: u32) -> BoxFuture<'_, Result<(), LedgerError>>;
}
