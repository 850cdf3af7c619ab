//! Weekly reservation schedule.

use std::fmt;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

const TIME_FORMAT: &str = "%H:%M";

/// A contiguous time-of-day interval eligible for reservation.
///
/// Serialized as a `["HH:MM", "HH:MM"]` pair, which is how slots are written
/// in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(String, String)", into = "(String, String)")]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    /// Creates a slot, rejecting empty or inverted intervals.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::SlotOrder {
                start: start.format(TIME_FORMAT).to_string(),
                end: end.format(TIME_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses a slot from two `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Start time as the portal expects it (`HH:MM`).
    pub fn start_str(&self) -> String {
        self.start.format(TIME_FORMAT).to_string()
    }

    /// End time as the portal expects it (`HH:MM`).
    pub fn end_str(&self) -> String {
        self.end.format(TIME_FORMAT).to_string()
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| {
        ValidationError::InvalidTime {
            value: value.to_string(),
        }
    })
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_str(), self.end_str())
    }
}

impl TryFrom<(String, String)> for TimeSlot {
    type Error = ValidationError;

    fn try_from((start, end): (String, String)) -> Result<Self, Self::Error> {
        Self::parse(&start, &end)
    }
}

impl From<TimeSlot> for (String, String) {
    fn from(slot: TimeSlot) -> Self {
        (slot.start_str(), slot.end_str())
    }
}

/// Ordered slots to try for each day of the week.
///
/// Days without an entry have no slots and are skipped by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub monday: Vec<TimeSlot>,
    pub tuesday: Vec<TimeSlot>,
    pub wednesday: Vec<TimeSlot>,
    pub thursday: Vec<TimeSlot>,
    pub friday: Vec<TimeSlot>,
    pub saturday: Vec<TimeSlot>,
    pub sunday: Vec<TimeSlot>,
}

impl Schedule {
    /// Returns the slots configured for `weekday`, in preference order.
    pub fn slots_for(&self, weekday: Weekday) -> &[TimeSlot] {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Mutable access for building schedules in code.
    pub fn slots_for_mut(&mut self, weekday: Weekday) -> &mut Vec<TimeSlot> {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_portal_format() {
        let slot = TimeSlot::parse("09:00", "11:30").unwrap();
        assert_eq!(slot.start_str(), "09:00");
        assert_eq!(slot.end_str(), "11:30");
        assert_eq!(slot.to_string(), "09:00-11:30");
    }

    #[test]
    fn parse_rejects_inverted_and_empty_slots() {
        assert!(matches!(
            TimeSlot::parse("11:00", "09:00"),
            Err(ValidationError::SlotOrder { .. })
        ));
        assert!(matches!(
            TimeSlot::parse("09:00", "09:00"),
            Err(ValidationError::SlotOrder { .. })
        ));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            TimeSlot::parse("9am", "11:00"),
            Err(ValidationError::InvalidTime { .. })
        ));
    }

    #[test]
    fn slot_deserializes_from_pair() {
        let slot: TimeSlot = serde_json::from_str(r#"["14:00", "17:00"]"#).unwrap();
        assert_eq!(slot, TimeSlot::parse("14:00", "17:00").unwrap());
        assert_eq!(
            serde_json::to_string(&slot).unwrap(),
            r#"["14:00","17:00"]"#
        );
    }

    #[test]
    fn schedule_lookup_by_weekday() {
        let json = r#"{"tuesday": [["08:00", "10:00"], ["14:00", "16:00"]]}"#;
        let schedule: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.slots_for(Weekday::Tue).len(), 2);
        assert!(schedule.slots_for(Weekday::Mon).is_empty());
        assert_eq!(schedule.slots_for(Weekday::Tue)[1].start_str(), "14:00");
    }
}
