//! # Seat Inventory Core
//!
//! Core types and traits for the seat inventory and reservation engine.
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace. It performs no I/O and holds no state of its own.
//!
//! ## Core Concepts
//!
//! - **Sellable unit** ([`types::UnitId`]): an event, or a ticket category within an event
//! - **Seat ledger** ([`ledger::SeatLedger`]): authoritative `(total, confirmed_sold)` counters
//! - **Hold** ([`types::Hold`]): a soft, time-limited claim on seats by one shopper
//! - **Booking** ([`types::Booking`]): the immutable record of a confirmed sale
//! - **Booking store** ([`booking::BookingStore`]): append-only booking persistence
//! - **Clock** ([`environment::Clock`]): injected time source
//! - **Alert sink** ([`alert::AlertSink`]): operational alerting for fatal inconsistencies
//!
//! ## Outcomes vs Errors
//!
//! Losing a race for the last seats is routine under contention, so those
//! results are modelled as values ([`outcome::HoldOutcome`],
//! [`outcome::CheckoutOutcome`], [`outcome::CommitOutcome`]). The error enums in
//! [`error`] are reserved for invalid requests and storage failures.
//!
//! ## Example
//!
//! ```ignore
//! use seat_inventory_core::ledger::SeatLedger;
//! use seat_inventory_core::outcome::CommitOutcome;
//!
//! async fn sell_two(ledger: &dyn SeatLedger, unit: UnitId) -> Result<bool, LedgerError> {
//!     match ledger.try_commit(unit, 2).await? {
//!         CommitOutcome::Committed { .. } => Ok(true),
//!         CommitOutcome::InsufficientCapacity { .. } => Ok(false),
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod booking;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod outcome;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use futures::future::BoxFuture;

pub use alert::{AlertSink, LedgerAlert, TracingAlertSink};
pub use booking::BookingStore;
pub use environment::{Clock, SystemClock};
pub use error::{BookingStoreError, LedgerError, ReservationError};
pub use ledger::SeatLedger;
pub use outcome::{CheckoutOutcome, CommitOutcome, HoldOutcome};
pub use types::{
    AvailabilitySnapshot, Booking, BookingId, BookingLine, BookingPayload, CapacitySnapshot,
    CategoryId, CheckoutRequest, EventId, Hold, HolderId, Money, UnitId,
};
