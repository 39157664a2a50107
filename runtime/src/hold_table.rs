//! Transient registry of soft seat holds.
//!
//! Holds are advisory: they shape what shoppers see and what the coordinator
//! offers, but the ledger never consults them. Losing the whole table (process
//! restart) only loses in-flight holds, never a sale.
//!
//! # Locking
//!
//! Holds are sharded by unit in a [`DashMap`]. Every method takes one shard
//! guard at a time and releases it before returning; no method awaits, so no
//! guard is ever held across storage I/O.
//!
//! Callers that read storage between deciding and placing a hold take the
//! pair's [`HolderLane`] first. Lanes are FIFO per `(unit, holder)`, so a
//! place followed by a release for the same pair is applied in that order.

use crate::metrics::HoldMetrics;
use dashmap::DashMap;
use seat_inventory_core::{Clock, Hold, HolderId, ReservationError, UnitId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LaneMap = DashMap<(UnitId, HolderId), Arc<Mutex<()>>>;

/// In-memory holds keyed by `(unit, holder)`.
///
/// At most one hold exists per `(unit, holder)`; placing again replaces it.
pub struct HoldTable {
    holds: DashMap<UnitId, HashMap<HolderId, Hold>>,
    stored: AtomicUsize,
    lanes: Arc<LaneMap>,
    clock: Arc<dyn Clock>,
}

/// Exclusive turn for one `(unit, holder)` pair.
///
/// Dropping the lane lets the next queued operation for the pair run, and
/// frees the pair's entry once nobody else is waiting.
pub struct HolderLane {
    key: (UnitId, HolderId),
    lanes: Arc<LaneMap>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for HolderLane {
    fn drop(&mut self) {
        // Drop the guard (and its Arc) before checking who else holds the lane.
        drop(self.guard.take());
        self.lanes
            .remove_if(&self.key, |_, lane| Arc::strong_count(lane) == 1);
    }
}

impl std::fmt::Debug for HolderLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolderLane")
            .field("unit_id", &self.key.0)
            .field("holder_id", &self.key.1)
            .finish()
    }
}

impl HoldTable {
    /// Create an empty table that reads time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            holds: DashMap::new(),
            stored: AtomicUsize::new(0),
            lanes: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Wait for this pair's turn.
    ///
    /// Operations on the same `(unit_id, holder_id)` run one at a time in the
    /// order they asked for the lane. Different pairs never wait on each
    /// other. The lane may be held across storage I/O; it is not a shard lock.
    pub async fn lane(&self, unit_id: UnitId, holder_id: &HolderId) -> HolderLane {
        let key = (unit_id, holder_id.clone());
        let lane = Arc::clone(self.lanes.entry(key.clone()).or_default().value());
        let guard = lane.lock_owned().await;
        HolderLane {
            key,
            lanes: Arc::clone(&self.lanes),
            guard: Some(guard),
        }
    }

    /// Insert or replace the hold for `(unit_id, holder_id)`.
    ///
    /// The hold expires `ttl` after the current clock time. Calls for the same
    /// key serialize on the shard lock; the last one wins.
    ///
    /// # Errors
    ///
    /// Returns [`ReservationError::InvalidRequest`] if `quantity` is zero or
    /// `ttl` cannot be represented as an expiry time. A zero quantity is never
    /// treated as a release.
    pub fn place(
        &self,
        unit_id: UnitId,
        holder_id: HolderId,
        quantity: u32,
        ttl: Duration,
    ) -> Result<Hold, ReservationError> {
        if quantity == 0 {
            return Err(ReservationError::InvalidRequest(
                "hold quantity must be positive".to_string(),
            ));
        }

        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                ReservationError::InvalidRequest(format!("hold ttl {ttl:?} is out of range"))
            })?;

        let hold = Hold {
            unit_id,
            holder_id: holder_id.clone(),
            quantity,
            created_at: now,
            expires_at,
        };

        let replaced = self
            .holds
            .entry(unit_id)
            .or_default()
            .insert(holder_id, hold.clone());

        if replaced.is_none() {
            let stored = self.stored.fetch_add(1, Ordering::Relaxed) + 1;
            HoldMetrics::record_active(stored);
        }

        Ok(hold)
    }

    /// Remove the hold for `(unit_id, holder_id)`, if any.
    ///
    /// Idempotent: releasing a missing hold is a no-op returning `None`.
    pub fn release(&self, unit_id: &UnitId, holder_id: &HolderId) -> Option<Hold> {
        let removed = self
            .holds
            .get_mut(unit_id)
            .and_then(|mut unit_holds| unit_holds.remove(holder_id));

        if removed.is_some() {
            self.holds.remove_if(unit_id, |_, unit_holds| unit_holds.is_empty());
            self.forget(1);
        }
        removed
    }

    /// Sum of active (non-expired) hold quantities for `unit_id`, optionally
    /// leaving out one holder's own hold.
    #[must_use]
    pub fn active_quantity(&self, unit_id: &UnitId, excluding: Option<&HolderId>) -> u32 {
        let now = self.clock.now();
        self.holds.get(unit_id).map_or(0, |unit_holds| {
            unit_holds
                .values()
                .filter(|hold| Some(&hold.holder_id) != excluding)
                .filter(|hold| hold.is_active_at(now))
                .fold(0u32, |sum, hold| sum.saturating_add(hold.quantity))
        })
    }

    /// The holder's hold on `unit_id`, if it is still active.
    #[must_use]
    pub fn active_hold(&self, unit_id: &UnitId, holder_id: &HolderId) -> Option<Hold> {
        let now = self.clock.now();
        self.holds
            .get(unit_id)
            .and_then(|unit_holds| unit_holds.get(holder_id).cloned())
            .filter(|hold| hold.is_active_at(now))
    }

    /// All active holds on `unit_id`.
    #[must_use]
    pub fn holds_for(&self, unit_id: &UnitId) -> Vec<Hold> {
        let now = self.clock.now();
        self.holds.get(unit_id).map_or_else(Vec::new, |unit_holds| {
            unit_holds
                .values()
                .filter(|hold| hold.is_active_at(now))
                .cloned()
                .collect()
        })
    }

    /// Remove every hold belonging to `holder_id` (connection closed).
    pub fn release_holder(&self, holder_id: &HolderId) -> Vec<Hold> {
        let mut removed = Vec::new();
        for mut unit_holds in self.holds.iter_mut() {
            if let Some(hold) = unit_holds.remove(holder_id) {
                removed.push(hold);
            }
        }

        if !removed.is_empty() {
            self.holds.retain(|_, unit_holds| !unit_holds.is_empty());
            self.forget(removed.len());
        }
        removed
    }

    /// Evict every hold whose expiry has passed and return them.
    pub fn sweep_expired(&self) -> Vec<Hold> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        for mut unit_holds in self.holds.iter_mut() {
            unit_holds.retain(|_, hold| {
                if hold.is_active_at(now) {
                    true
                } else {
                    expired.push(hold.clone());
                    false
                }
            });
        }

        if !expired.is_empty() {
            self.holds.retain(|_, unit_holds| !unit_holds.is_empty());
            self.forget(expired.len());
        }
        expired
    }

    /// Number of stored holds, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stored.load(Ordering::Relaxed)
    }

    /// Whether the table stores no holds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget(&self, count: usize) {
        let before = self
            .stored
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |stored| {
                Some(stored.saturating_sub(count))
            })
            .unwrap_or_default();
        HoldMetrics::record_active(before.saturating_sub(count));
    }
}

impl std::fmt::Debug for HoldTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldTable")
            .field("units", &self.holds.len())
            .field("stored", &self.len())
            .finish_non_exhaustive()
    }
}
