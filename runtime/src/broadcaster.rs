//! Live effective-availability push per sellable unit.
//!
//! Each unit with at least one subscriber has its own
//! `tokio::sync::broadcast` channel. [`AvailabilityBroadcaster::notify`]
//! recomputes the holder-agnostic snapshot (`total - sold - all active holds`)
//! and sends it to every subscriber of that unit.
//!
//! Pushes for one unit are computed and sent one at a time, so the last
//! snapshot a subscriber receives was read after every change that preceded
//! the last `notify`.
//!
//! Delivery is best-effort. A slow subscriber that falls behind the channel
//! buffer sees `RecvError::Lagged` and should fetch a fresh snapshot; missed
//! pushes are never replayed. Nothing on the purchase path waits for delivery.

use crate::hold_table::HoldTable;
use crate::metrics::BroadcastMetrics;
use seat_inventory_core::{
    AvailabilitySnapshot, Clock, HolderId, LedgerError, SeatLedger, UnitId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};

/// Type alias for the channels map to reduce complexity.
type ChannelsMap = RwLock<HashMap<UnitId, UnitChannel>>;

/// One unit's sender plus the lock that orders its pushes.
#[derive(Clone)]
struct UnitChannel {
    sender: broadcast::Sender<AvailabilitySnapshot>,
    push: Arc<Mutex<()>>,
}

impl UnitChannel {
    fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
            push: Arc::new(Mutex::new(())),
        }
    }
}

/// A live feed of availability snapshots for one unit.
///
/// Dropping the subscription unsubscribes; pass it to
/// [`AvailabilityBroadcaster::unsubscribe`] to also free the unit's channel
/// once nobody else listens.
#[derive(Debug)]
pub struct AvailabilitySubscription {
    unit_id: UnitId,
    receiver: broadcast::Receiver<AvailabilitySnapshot>,
}

impl AvailabilitySubscription {
    /// Unit this subscription follows.
    #[must_use]
    pub const fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    /// Wait for the next snapshot.
    ///
    /// # Errors
    ///
    /// - `Lagged(n)`: `n` snapshots were dropped; fetch a fresh one
    /// - `Closed`: the broadcaster was dropped
    pub async fn recv(&mut self) -> Result<AvailabilitySnapshot, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    ///
    /// # Errors
    ///
    /// Returns `Empty` when no snapshot is pending.
    pub fn try_recv(&mut self) -> Result<AvailabilitySnapshot, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Publishes effective availability to per-unit subscribers.
pub struct AvailabilityBroadcaster {
    ledger: Arc<dyn SeatLedger>,
    holds: Arc<HoldTable>,
    clock: Arc<dyn Clock>,
    channels: ChannelsMap,
    capacity: usize,
}

impl AvailabilityBroadcaster {
    /// Create a broadcaster whose per-unit channels buffer `capacity`
    /// snapshots.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn SeatLedger>,
        holds: Arc<HoldTable>,
        clock: Arc<dyn Clock>,
        capacity: usize,
    ) -> Self {
        Self {
            ledger,
            holds,
            clock,
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Start following `unit_id`.
    pub async fn subscribe(&self, unit_id: UnitId) -> AvailabilitySubscription {
        let mut channels = self.channels.write().await;
        let channel = channels
            .entry(unit_id)
            .or_insert_with(|| UnitChannel::new(self.capacity));

        tracing::debug!(%unit_id, subscribers = channel.sender.receiver_count() + 1, "Availability subscription added");
        AvailabilitySubscription {
            unit_id,
            receiver: channel.sender.subscribe(),
        }
    }

    /// Stop following a unit, freeing its channel if this was the last
    /// subscriber.
    pub async fn unsubscribe(&self, subscription: AvailabilitySubscription) {
        let unit_id = subscription.unit_id;
        drop(subscription);

        let mut channels = self.channels.write().await;
        if channels
            .get(&unit_id)
            .is_some_and(|channel| channel.sender.receiver_count() == 0)
        {
            channels.remove(&unit_id);
            tracing::debug!(%unit_id, "Availability channel closed");
        }
    }

    /// Recompute the unit's holder-agnostic availability and push it.
    ///
    /// Returns the number of subscribers the snapshot was delivered to. A
    /// ledger read failure is logged and skipped; the next change will push a
    /// fresh snapshot.
    pub async fn notify(&self, unit_id: UnitId) -> usize {
        // Clone the channel so the map lock is not held across the ledger read.
        let channel = self.channels.read().await.get(&unit_id).cloned();
        let Some(channel) = channel.filter(|channel| channel.sender.receiver_count() > 0) else {
            return 0;
        };

        // Read and send under the unit's push lock so an older snapshot can
        // never be sent after a newer one.
        let _push = channel.push.lock().await;
        let snapshot = match self.snapshot(unit_id, None).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(%unit_id, error = %error, "Skipping availability push, ledger read failed");
                return 0;
            },
        };

        let delivered = channel.sender.send(snapshot).unwrap_or(0);
        BroadcastMetrics::record_notification(delivered);
        tracing::trace!(%unit_id, delivered, "Availability pushed");
        delivered
    }

    /// Current effective availability of `unit_id`.
    ///
    /// With `viewer`, the viewer's own hold is not subtracted, so a shopper
    /// always sees the seats they are holding as still available to them.
    ///
    /// # Errors
    ///
    /// Propagates the ledger read error.
    pub async fn snapshot(
        &self,
        unit_id: UnitId,
        viewer: Option<&HolderId>,
    ) -> Result<AvailabilitySnapshot, LedgerError> {
        let capacity = self.ledger.capacity(unit_id).await?;
        let held = self.holds.active_quantity(&unit_id, viewer);
        Ok(AvailabilitySnapshot::compute(
            unit_id,
            capacity,
            held,
            self.clock.now(),
        ))
    }

    /// Number of live subscriptions for `unit_id`.
    pub async fn subscriber_count(&self, unit_id: &UnitId) -> usize {
        self.channels
            .read()
            .await
            .get(unit_id)
            .map_or(0, |channel| channel.sender.receiver_count())
    }

    /// Number of units with an open channel.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl std::fmt::Debug for AvailabilityBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityBroadcaster")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::InMemorySeatLedger;
    use seat_inventory_core::EventId;
    use seat_inventory_testing::ManualClock;
    use std::time::Duration;

    fn setup(total: u32) -> (AvailabilityBroadcaster, Arc<HoldTable>, UnitId) {
        let unit = UnitId::event(EventId::new());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let ledger = Arc::new(InMemorySeatLedger::new().with_unit(unit, total));
        let holds = Arc::new(HoldTable::new(Arc::clone(&clock)));
        let broadcaster = AvailabilityBroadcaster::new(ledger, Arc::clone(&holds), clock, 16);
        (broadcaster, holds, unit)
    }

    #[tokio::test]
    async fn notify_without_subscribers_is_a_noop() {
        let (broadcaster, _, unit) = setup(10);
        assert_eq!(broadcaster.notify(unit).await, 0);
        assert_eq!(broadcaster.channel_count().await, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_holder_agnostic_availability() {
        let (broadcaster, holds, unit) = setup(10);
        let mut first = broadcaster.subscribe(unit).await;
        let mut second = broadcaster.subscribe(unit).await;

        holds
            .place(unit, HolderId::new("tab-1"), 4, Duration::from_secs(60))
            .unwrap();
        assert_eq!(broadcaster.notify(unit).await, 2);

        let snapshot = first.recv().await.unwrap();
        assert_eq!(snapshot.held, 4);
        assert_eq!(snapshot.available, 6);
        assert_eq!(second.recv().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn viewer_snapshot_excludes_own_hold() {
        let (broadcaster, holds, unit) = setup(10);
        let viewer = HolderId::new("tab-1");
        holds
            .place(unit, viewer.clone(), 4, Duration::from_secs(60))
            .unwrap();

        let own = broadcaster.snapshot(unit, Some(&viewer)).await.unwrap();
        let public = broadcaster.snapshot(unit, None).await.unwrap();

        assert_eq!(own.available, 10);
        assert_eq!(public.available, 6);
    }

    #[tokio::test]
    async fn last_unsubscribe_frees_channel() {
        let (broadcaster, _, unit) = setup(10);
        let first = broadcaster.subscribe(unit).await;
        let second = broadcaster.subscribe(unit).await;

        broadcaster.unsubscribe(first).await;
        assert_eq!(broadcaster.subscriber_count(&unit).await, 1);
        assert_eq!(broadcaster.channel_count().await, 1);

        broadcaster.unsubscribe(second).await;
        assert_eq!(broadcaster.channel_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_unit_push_is_skipped() {
        let (broadcaster, _, _) = setup(10);
        let stranger = UnitId::event(EventId::new());
        let _subscription = broadcaster.subscribe(stranger).await;

        assert_eq!(broadcaster.notify(stranger).await, 0);
    }
}
