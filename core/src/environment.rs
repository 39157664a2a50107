//! Injected dependencies that are not storage.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Hold expiry is computed from this clock, so tests can move time forward
/// without sleeping.
///
/// # Examples
///
/// ```
/// use seat_inventory_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let earlier = clock.now();
/// assert!(clock.now() >= earlier);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
