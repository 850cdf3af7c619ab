//! Confirmed bookings as calendar events.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::BookingRequest;
use crate::schedule::TimeSlot;

/// Domain suffix appended to generated event UIDs.
const UID_DOMAIN: &str = "library-reserve";

/// A confirmed booking recorded in the calendar.
///
/// Times are wall-clock times at the library; they carry no zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Name of the booked resource.
    pub location: String,
}

/// The implicit identity of an event: two events with equal keys describe
/// the same booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: String,
}

impl CalendarEvent {
    /// Creates an event with a UID derived from its key.
    pub fn new(
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        location: impl Into<String>,
    ) -> Self {
        let location = location.into();
        Self {
            uid: event_uid(start, end, &location),
            title: title.into(),
            start,
            end,
            location,
        }
    }

    /// Builds the event for a confirmed booking request.
    pub fn for_booking(title: impl Into<String>, request: &BookingRequest) -> Self {
        Self::new(
            title,
            request.date.and_time(request.slot.start()),
            request.date.and_time(request.slot.end()),
            request.resource.as_str(),
        )
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            start: self.start,
            end: self.end,
            location: self.location.clone(),
        }
    }

    /// Whether this event occupies exactly `slot` on `date`, in any room.
    pub fn covers_slot(&self, date: NaiveDate, slot: &TimeSlot) -> bool {
        self.start == date.and_time(slot.start()) && self.end == date.and_time(slot.end())
    }
}

/// Deterministic UID so the same booking always maps to the same identifier.
fn event_uid(start: NaiveDateTime, end: NaiveDateTime, location: &str) -> String {
    let name = format!(
        "{}|{}|{location}",
        start.format("%Y%m%dT%H%M%S"),
        end.format("%Y%m%dT%H%M%S")
    );
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
    format!("{id}@{UID_DOMAIN}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceName;

    fn request(resource: &str) -> BookingRequest {
        BookingRequest {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            slot: TimeSlot::parse("09:00", "11:00").unwrap(),
            resource: ResourceName::new(resource).unwrap(),
            resource_id: 1,
        }
    }

    #[test]
    fn for_booking_spans_the_slot() {
        let event = CalendarEvent::for_booking("课程讨论", &request("704A"));
        assert_eq!(event.start.to_string(), "2024-03-05 09:00:00");
        assert_eq!(event.end.to_string(), "2024-03-05 11:00:00");
        assert_eq!(event.location, "704A");
        assert_eq!(event.title, "课程讨论");
    }

    #[test]
    fn uid_is_deterministic_per_key() {
        let a = CalendarEvent::for_booking("x", &request("704A"));
        let b = CalendarEvent::for_booking("y", &request("704A"));
        let c = CalendarEvent::for_booking("x", &request("707A"));
        assert_eq!(a.uid, b.uid);
        assert_ne!(a.uid, c.uid);
        assert!(a.uid.ends_with("@library-reserve"));
    }

    #[test]
    fn covers_slot_ignores_location() {
        let event = CalendarEvent::for_booking("x", &request("707A"));
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert!(event.covers_slot(date, &TimeSlot::parse("09:00", "11:00").unwrap()));
        assert!(!event.covers_slot(date, &TimeSlot::parse("09:00", "10:00").unwrap()));
        assert!(!event.covers_slot(
            date.succ_opt().unwrap(),
            &TimeSlot::parse("09:00", "11:00").unwrap()
        ));
    }
}
