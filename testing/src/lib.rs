//! # Seat Inventory Testing
//!
//! Testing utilities for the seat inventory engine.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Fault-injecting storage wrappers ([`FaultyLedger`], [`FaultyBookingStore`])
//! - An alert sink that records instead of logging ([`RecordingAlertSink`])
//! - proptest strategies for checkout workloads ([`properties`])
//!
//! ## Example
//!
//! ```ignore
//! use seat_inventory_testing::{ManualClock, FaultyBookingStore};
//!
//! #[tokio::test]
//! async fn hold_expires() {
//!     let clock = Arc::new(ManualClock::default());
//!     let coordinator = ReservationCoordinator::builder(ledger, bookings)
//!         .clock(clock.clone())
//!         .build();
//!
//!     coordinator.request_hold(unit, holder, 2).await?;
//!     clock.advance(Duration::from_secs(600));
//!     assert_eq!(coordinator.availability(unit, None).await?.held, 0);
//! }
//! ```

pub mod alerts;
pub mod faults;

/// Mock implementations of the injected clock.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use seat_inventory_core::Clock;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use seat_inventory_testing::mocks::FixedClock;
    /// use seat_inventory_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Used to drive hold expiry without sleeping.
    ///
    /// ```
    /// use seat_inventory_testing::mocks::ManualClock;
    /// use seat_inventory_core::Clock;
    /// use std::time::Duration;
    ///
    /// let clock = ManualClock::default();
    /// let start = clock.now();
    /// clock.advance(Duration::from_secs(30));
    /// assert_eq!((clock.now() - start).num_seconds(), 30);
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start the clock at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Jump to `time` (may go backwards).
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move forward by `by`.
        ///
        /// Saturates at the latest representable time.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time = chrono::Duration::from_std(by)
                .ok()
                .and_then(|by| time.checked_add_signed(by))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(test_clock().now())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// A batch of concurrent purchase quantities, each between 1 and
    /// `max_quantity`.
    pub fn purchase_batch(
        max_quantity: u32,
        max_buyers: usize,
    ) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(1..=max_quantity.max(1), 1..=max_buyers.max(1))
    }

    /// A unit capacity between 0 and `max_total`.
    pub fn capacity(max_total: u32) -> impl Strategy<Value = u32> {
        0..=max_total
    }
}

// Re-export commonly used items
pub use alerts::RecordingAlertSink;
pub use faults::{FaultyBookingStore, FaultyLedger};
pub use mocks::{FixedClock, ManualClock, test_clock};
