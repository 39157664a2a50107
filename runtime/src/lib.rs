//! # Seat Inventory Runtime
//!
//! The reservation engine: soft holds, live availability and the atomic
//! booking commit, wired together by the [`ReservationCoordinator`].
//!
//! ## Components
//!
//! - **[`HoldTable`]**: transient, TTL-bound holds keyed by `(unit, holder)`
//! - **[`AvailabilityBroadcaster`]**: per-unit push of effective availability
//! - **[`BookingCommitPipeline`]**: ledger commit, booking write, compensation
//! - **[`ReservationCoordinator`]**: the public surface over all of the above
//! - **[`spawn_sweeper`]**: background expiry of stale holds
//! - **[`memory`]**: in-memory ledger and booking store
//!
//! ## Example
//!
//! ```ignore
//! use seat_inventory_runtime::{ReservationCoordinator, memory::*};
//!
//! let ledger = Arc::new(InMemorySeatLedger::new().with_unit(unit, 10));
//! let coordinator = ReservationCoordinator::builder(ledger, Arc::new(InMemoryBookingStore::new()))
//!     .build();
//!
//! match coordinator.request_hold(unit, holder.clone(), 2).await? {
//!     HoldOutcome::Held(hold) => { /* show countdown to hold.expires_at */ }
//!     HoldOutcome::CapacityExceeded { available, .. } => { /* clamp selector */ }
//! }
//!
//! let outcome = coordinator.commit(unit, holder, 2, payload).await?;
//! ```

/// Live availability push
pub mod broadcaster;

/// Engine tuning
pub mod config;

/// Reservation orchestration
pub mod coordinator;

/// Soft hold registry
pub mod hold_table;

/// In-memory storage backends
pub mod memory;

/// Prometheus metrics for observability
pub mod metrics;

/// Booking commit and compensation
pub mod pipeline;

/// Retry logic with exponential backoff
pub mod retry;

/// Background hold expiry
pub mod sweeper;

pub use broadcaster::{AvailabilityBroadcaster, AvailabilitySubscription};
pub use config::EngineConfig;
pub use coordinator::{ReservationCoordinator, ReservationCoordinatorBuilder};
pub use hold_table::{HoldTable, HolderLane};
pub use memory::{InMemoryBookingStore, InMemorySeatLedger};
pub use pipeline::BookingCommitPipeline;
pub use retry::RetryPolicy;
pub use sweeper::spawn_sweeper;
