//! Background expiry sweep.
//!
//! Expired holds already stop counting the moment their TTL passes; the sweep
//! frees their memory and pushes fresh availability to subscribers so that
//! shoppers see released seats without anyone acting.

use crate::coordinator::ReservationCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run [`ReservationCoordinator::sweep_expired`] every `interval` until a
/// message arrives on `shutdown` (or its sender is dropped).
#[must_use = "dropping the handle detaches the sweeper"]
pub fn spawn_sweeper(
    coordinator: Arc<ReservationCoordinator>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX), "Hold sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Hold sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = coordinator.sweep_expired().await;
                    if evicted > 0 {
                        tracing::debug!(evicted, "Sweep evicted expired holds");
                    }
                }
            }
        }
    })
}
