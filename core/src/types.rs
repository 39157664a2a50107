//! Domain types for the seat inventory engine.
//!
//! Identifiers, counters, holds and bookings. Everything here is plain owned
//! data: cheap to clone, serializable, and free of interior mutability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket category within an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(Uuid);

impl CategoryId {
    /// Creates a new random `CategoryId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CategoryId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies the inventory being tracked: a whole event, or one ticket
/// category within it.
///
/// Events without categories are tracked as a single unit
/// (`category_id == None`). A multi-category event has one unit per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    /// Event this unit belongs to
    pub event_id: EventId,
    /// Ticket category within the event, if the event is split into categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl UnitId {
    /// Unit covering a whole event.
    #[must_use]
    pub const fn event(event_id: EventId) -> Self {
        Self {
            event_id,
            category_id: None,
        }
    }

    /// Unit covering one ticket category of an event.
    #[must_use]
    pub const fn category(event_id: EventId, category_id: CategoryId) -> Self {
        Self {
            event_id,
            category_id: Some(category_id),
        }
    }

    /// Stable string key, used as the primary key by storage backends.
    ///
    /// Format: `"{event_id}"` or `"{event_id}/{category_id}"`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category_id {
            Some(category_id) => write!(f, "{}/{category_id}", self.event_id),
            None => write!(f, "{}", self.event_id),
        }
    }
}

/// Opaque identifier for a requesting session or connection.
///
/// This is deliberately not a persisted user id: a shopper with two browser
/// tabs is two holders.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(String);

impl HolderId {
    /// Wrap an existing session/connection identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random holder id (used for new connections).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Money amount in cents
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Multiply by a seat count, returning `None` on overflow
    #[must_use]
    pub const fn checked_mul(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Add two amounts, returning `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Point-in-time read of a unit's ledger counters.
///
/// Stale the moment it is returned; only [`crate::ledger::SeatLedger::try_commit`]
/// decides whether seats can actually be sold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Total seats for the unit
    pub total: u32,
    /// Seats sold and paid for
    pub confirmed_sold: u32,
}

impl CapacitySnapshot {
    /// Seats not yet confirmed sold (ignores holds).
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.confirmed_sold)
    }
}

/// A soft, non-authoritative claim on seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    /// Unit being held
    pub unit_id: UnitId,
    /// Session or connection holding the seats
    pub holder_id: HolderId,
    /// Seats held (always > 0)
    pub quantity: u32,
    /// When the hold was placed or last refreshed
    pub created_at: DateTime<Utc>,
    /// When the hold stops counting against availability
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// Whether the hold still counts at `now`.
    ///
    /// A hold is void from `expires_at` onwards (inclusive).
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Effective availability of a unit, as shown to shoppers.
///
/// `available = total - confirmed_sold - held`, where `held` excludes the
/// viewing holder's own hold when the snapshot is holder-relative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySnapshot {
    /// Unit this snapshot describes
    pub unit_id: UnitId,
    /// Total seats
    pub total: u32,
    /// Seats confirmed sold
    pub confirmed_sold: u32,
    /// Seats under active holds that count against this view
    pub held: u32,
    /// Seats a shopper can still select
    pub available: u32,
    /// When the snapshot was computed
    pub as_of: DateTime<Utc>,
}

impl AvailabilitySnapshot {
    /// Build a snapshot from ledger counters and a held-seat sum.
    #[must_use]
    pub const fn compute(
        unit_id: UnitId,
        capacity: CapacitySnapshot,
        held: u32,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            unit_id,
            total: capacity.total,
            confirmed_sold: capacity.confirmed_sold,
            held,
            available: capacity.remaining().saturating_sub(held),
            as_of,
        }
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// One unit's share of a checkout or booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLine {
    /// Unit purchased
    pub unit_id: UnitId,
    /// Seats purchased
    pub quantity: u32,
    /// Price per seat
    pub unit_price: Money,
}

impl BookingLine {
    /// Line total, `None` on overflow.
    #[must_use]
    pub const fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// A purchase intent submitted at checkout.
///
/// May span several units (ticket categories); the commit is all-or-nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Session or connection submitting the checkout
    pub holder_id: HolderId,
    /// Owner reference supplied by the surrounding system (user id, email, ...)
    #[serde(default)]
    pub owner: Option<String>,
    /// Units and quantities to purchase
    pub lines: Vec<BookingLine>,
}

impl CheckoutRequest {
    /// Checkout for a single unit.
    #[must_use]
    pub fn single(unit_id: UnitId, holder_id: HolderId, quantity: u32, unit_price: Money) -> Self {
        Self {
            holder_id,
            owner: None,
            lines: vec![BookingLine {
                unit_id,
                quantity,
                unit_price,
            }],
        }
    }

    /// Attach an owner reference.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Pricing and ownership details for a single-unit commit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPayload {
    /// Price per seat
    pub unit_price: Money,
    /// Owner reference supplied by the surrounding system
    #[serde(default)]
    pub owner: Option<String>,
}

/// Immutable record of a confirmed sale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier
    pub booking_id: BookingId,
    /// Session or connection that checked out
    pub holder_id: HolderId,
    /// Owner reference supplied at checkout
    pub owner: Option<String>,
    /// Purchased lines
    pub lines: Vec<BookingLine>,
    /// Sum of all line totals
    pub total_amount: Money,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Seats this booking holds for `unit_id` (0 if the unit is not part of it).
    #[must_use]
    pub fn quantity_for(&self, unit_id: &UnitId) -> u32 {
        self.lines
            .iter()
            .filter(|line| line.unit_id == *unit_id)
            .map(|line| line.quantity)
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn unit_id_display_includes_category() {
        let event = EventId::from_uuid(Uuid::nil());
        let category = CategoryId::from_uuid(Uuid::from_u128(1));

        assert_eq!(
            UnitId::event(event).to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            UnitId::category(event, category).storage_key(),
            "00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn unit_id_without_category_omits_field() {
        let unit = UnitId::event(EventId::from_uuid(Uuid::nil()));
        let json = serde_json::to_value(unit).unwrap();
        assert!(json.get("category_id").is_none());

        let parsed: UnitId =
            serde_json::from_str(r#"{"event_id":"00000000-0000-0000-0000-000000000000"}"#)
                .unwrap();
        assert_eq!(parsed, unit);
    }

    #[test]
    fn hold_expires_at_boundary() {
        let now = Utc::now();
        let hold = Hold {
            unit_id: UnitId::event(EventId::new()),
            holder_id: HolderId::new("tab-1"),
            quantity: 2,
            created_at: now,
            expires_at: now + Duration::seconds(30),
        };

        assert!(hold.is_active_at(now));
        assert!(hold.is_active_at(now + Duration::seconds(29)));
        assert!(!hold.is_active_at(now + Duration::seconds(30)));
    }

    #[test]
    fn availability_never_underflows() {
        let capacity = CapacitySnapshot {
            total: 5,
            confirmed_sold: 4,
        };
        let snapshot =
            AvailabilitySnapshot::compute(UnitId::event(EventId::new()), capacity, 3, Utc::now());
        assert_eq!(snapshot.available, 0);
    }

    #[test]
    fn money_display_and_overflow() {
        assert_eq!(Money::from_cents(4_250).to_string(), "$42.50");
        assert_eq!(
            Money::from_cents(2_500).checked_mul(3),
            Some(Money::from_cents(7_500))
        );
        assert_eq!(Money::from_cents(u64::MAX).checked_mul(2), None);
    }

    #[test]
    fn booking_quantity_for_sums_matching_lines() {
        let event = EventId::new();
        let vip = UnitId::category(event, CategoryId::new());
        let floor = UnitId::category(event, CategoryId::new());
        let booking = Booking {
            booking_id: BookingId::new(),
            holder_id: HolderId::new("tab-1"),
            owner: None,
            lines: vec![
                BookingLine {
                    unit_id: vip,
                    quantity: 2,
                    unit_price: Money::from_cents(10_000),
                },
                BookingLine {
                    unit_id: floor,
                    quantity: 4,
                    unit_price: Money::from_cents(5_000),
                },
            ],
            total_amount: Money::from_cents(40_000),
            created_at: Utc::now(),
        };

        assert_eq!(booking.quantity_for(&vip), 2);
        assert_eq!(booking.quantity_for(&floor), 4);
        assert_eq!(booking.quantity_for(&UnitId::event(event)), 0);
    }
}
