//! Booking requests and their outcomes.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schedule::TimeSlot;
use crate::types::ResourceName;

/// A single (date, slot, resource) combination to reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub resource: ResourceName,
    /// Numeric portal ID resolved from `resource`.
    pub resource_id: u64,
}

impl BookingRequest {
    /// Date as the portal expects it (`YYYY-MM-DD`).
    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Terminal outcome of one booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookingOutcome {
    /// The portal accepted the reservation.
    Confirmed { hint: String },
    /// The portal explicitly declined the reservation.
    Rejected { reason: String },
    /// The request failed in transit or the response was unreadable.
    TransportError { message: String },
}

impl BookingOutcome {
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

impl fmt::Display for BookingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed { hint } => write!(f, "confirmed ({hint})"),
            Self::Rejected { reason } => write!(f, "rejected ({reason})"),
            Self::TransportError { message } => write!(f, "transport error ({message})"),
        }
    }
}

/// Anything that can submit a reservation to the portal.
///
/// Implementations absorb their own failures into [`BookingOutcome`];
/// an attempt never returns an error.
pub trait Booker {
    fn attempt(&self, request: &BookingRequest) -> BookingOutcome;
}
