//! Expected business outcomes.
//!
//! These are returned in `Ok(..)`: a shopper losing the race for the last
//! seats is normal operation, not a fault.

use crate::types::{Booking, Hold, UnitId};
use serde::{Deserialize, Serialize};

/// Result of a single atomic ledger commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// `confirmed_sold` was incremented.
    Committed {
        /// `confirmed_sold` after the increment.
        confirmed_sold: u32,
    },
    /// The increment would have exceeded `total_capacity`; nothing changed.
    InsufficientCapacity {
        /// Seats remaining at the time of the check.
        remaining: u32,
    },
}

impl CommitOutcome {
    /// Whether the ledger was incremented.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Result of a hold request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HoldOutcome {
    /// The hold was placed (or refreshed).
    Held(Hold),
    /// Not enough effective availability; the UI should clamp to `available`.
    CapacityExceeded {
        /// Unit requested
        unit_id: UnitId,
        /// Seats requested
        requested: u32,
        /// Effective availability for this holder
        available: u32,
    },
}

/// Result of a checkout commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Every line was committed and the booking persisted.
    Committed(Booking),
    /// A line could not be committed; nothing was sold and holds were kept.
    SoldOut {
        /// First unit that could not satisfy its line
        unit_id: UnitId,
        /// Seats requested for that unit
        requested: u32,
        /// Seats remaining in the ledger for that unit
        remaining: u32,
    },
}

impl CheckoutOutcome {
    /// Message to show the shopper.
    ///
    /// A sell-out after a successful hold is a legitimate race, so it is
    /// explained as such rather than as a generic failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Committed(booking) => format!("Booking {} confirmed", booking.booking_id),
            Self::SoldOut {
                requested,
                remaining,
                ..
            } => format!(
                "Sorry, those seats were claimed by someone else: {requested} requested, {remaining} left"
            ),
        }
    }

    /// The booking, if the checkout committed.
    #[must_use]
    pub const fn booking(&self) -> Option<&Booking> {
        match self {
            Self::Committed(booking) => Some(booking),
            Self::SoldOut { .. } => None,
        }
    }
}
