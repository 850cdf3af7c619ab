//! Per-slot results of a scheduled booking run.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::booking::BookingOutcome;
use crate::schedule::TimeSlot;
use crate::types::ResourceName;

/// One resource tried for a slot and what the portal said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAttempt {
    pub resource: ResourceName,
    pub outcome: BookingOutcome,
}

/// What happened to a single slot during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotOutcome {
    /// A resource was confirmed and recorded.
    Booked {
        resource: ResourceName,
        attempts: Vec<SlotAttempt>,
    },
    /// The calendar already held a booking for this slot; nothing was sent.
    AlreadyBooked { location: String },
    /// Every preferred resource was declined or failed.
    Unbooked { attempts: Vec<SlotAttempt> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotReport {
    pub slot: TimeSlot,
    pub outcome: SlotOutcome,
}

/// Result of `run(day_offset)`: the target date and one entry per slot.
///
/// A run with zero bookings is still a completed run; callers decide how to
/// treat partial results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub date: NaiveDate,
    pub slots: Vec<SlotReport>,
}

impl ScheduleReport {
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            slots: Vec::new(),
        }
    }

    /// Number of slots newly booked in this run.
    pub fn booked_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.outcome, SlotOutcome::Booked { .. }))
            .count()
    }

    /// Number of slots that ended the run without a reservation.
    pub fn unbooked_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.outcome, SlotOutcome::Unbooked { .. }))
            .count()
    }
}

impl fmt::Display for ScheduleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:?})", self.date.format("%Y-%m-%d"), self.date.weekday())?;
        if self.slots.is_empty() {
            return writeln!(f, "  no slots configured");
        }
        for report in &self.slots {
            match &report.outcome {
                SlotOutcome::Booked { resource, attempts } => writeln!(
                    f,
                    "  {}  booked {resource} after {} attempt(s)",
                    report.slot,
                    attempts.len()
                )?,
                SlotOutcome::AlreadyBooked { location } => {
                    writeln!(f, "  {}  already booked ({location})", report.slot)?;
                }
                SlotOutcome::Unbooked { attempts } => {
                    writeln!(f, "  {}  not booked", report.slot)?;
                    for attempt in attempts {
                        writeln!(f, "    {}: {}", attempt.resource, attempt.outcome)?;
                    }
                }
            }
        }
        writeln!(
            f,
            "booked {}, unbooked {}",
            self.booked_count(),
            self.unbooked_count()
        )
    }
}
