//! Core domain types for the library room reservation bot.
//!
//! This crate contains the fundamental types shared by the portal client,
//! the booking log and the scheduler:
//! - Schedules: weekly time slots eligible for reservation
//! - Resources: preferred rooms and their portal IDs
//! - Bookings: requests, outcomes and per-run reports
//! - Events: confirmed bookings as recorded in the calendar

mod booking;
mod event;
mod report;
mod resource;
mod schedule;
pub mod time;
mod types;

pub use booking::{Booker, BookingOutcome, BookingRequest};
pub use event::{CalendarEvent, EventKey};
pub use report::{ScheduleReport, SlotAttempt, SlotOutcome, SlotReport};
pub use resource::ResourceCatalog;
pub use schedule::{Schedule, TimeSlot};
pub use types::{ResourceName, UserId, ValidationError};
