//! Append-only booking persistence.

use crate::error::BookingStoreError;
use crate::types::{Booking, BookingId, UnitId};
use futures::future::BoxFuture;

/// Storage for confirmed bookings.
///
/// Bookings are immutable once inserted; the engine never updates or deletes
/// them.
pub trait BookingStore: Send + Sync {
    /// Persist a new booking.
    ///
    /// # Errors
    ///
    /// - `Duplicate`: a booking with the same id exists
    /// - `Storage`: the backing store failed (nothing was written)
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<(), BookingStoreError>>;

    /// Look up a booking by id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backing store failed.
    fn get(&self, booking_id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, BookingStoreError>>;

    /// All bookings containing a line for `unit_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backing store failed.
    fn bookings_for_unit(
        &self,
        unit_id: UnitId,
    ) -> BoxFuture<'_, Result<Vec<Booking>, BookingStoreError>>;
}
