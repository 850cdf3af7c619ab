//! Wall-clock time at the library.
//!
//! The portal works in China Standard Time, which has been a fixed UTC+8
//! without daylight saving since 1991, so a constant offset is exact.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::schedule::TimeSlot;
use crate::types::ValidationError;

/// Offset of Asia/Shanghai from UTC.
pub const PORTAL_UTC_OFFSET_HOURS: i64 = 8;

/// Current wall-clock time at the library.
pub fn portal_now() -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(PORTAL_UTC_OFFSET_HOURS)
}

/// The date `day_offset` days after `today`, if representable.
pub fn target_date(today: NaiveDate, day_offset: i64) -> Option<NaiveDate> {
    today.checked_add_signed(Duration::days(day_offset))
}

/// Rounds up to the next whole minute; exact minutes are returned unchanged.
pub fn ceil_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    let Some(truncated) = at.with_second(0).and_then(|t| t.with_nanosecond(0)) else {
        return at;
    };
    if truncated == at {
        at
    } else {
        truncated + Duration::minutes(1)
    }
}

/// Computes the window for an immediate booking.
///
/// The window starts at `now + lead`, rounded up to a whole minute because
/// the portal only accepts `HH:MM`, and lasts `length`. Windows that would
/// cross midnight are rejected.
pub fn immediate_window(
    now: NaiveDateTime,
    lead: Duration,
    length: Duration,
) -> Result<(NaiveDate, TimeSlot), ValidationError> {
    let start = ceil_to_minute(now + lead);
    let end = start + length;
    if end.date() != start.date() {
        return Err(ValidationError::SlotOrder {
            start: start.format("%H:%M").to_string(),
            end: end.format("%H:%M").to_string(),
        });
    }
    let slot = TimeSlot::new(start.time(), end.time())?;
    Ok((start.date(), slot))
}
