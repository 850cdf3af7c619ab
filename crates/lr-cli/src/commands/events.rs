//! Events command for listing recorded bookings.

use std::io::Write;

use anyhow::Result;
use lr_calendar::CalendarStore;
use lr_core::CalendarEvent;

use crate::Config;

/// Runs the events command.
///
/// Bookings are listed oldest first, either as aligned text or as JSONL.
pub fn run<W: Write>(writer: &mut W, config: &Config, json: bool) -> Result<()> {
    CalendarStore::scoped(&config.calendar_path, |calendar| -> Result<()> {
        let mut events: Vec<&CalendarEvent> = calendar.events().iter().collect();
        events.sort_by_key(|event| (event.start, event.end));

        if json {
            for event in events {
                writeln!(writer, "{}", serde_json::to_string(event)?)?;
            }
            return Ok(());
        }

        if events.is_empty() {
            writeln!(writer, "No bookings recorded.")?;
            return Ok(());
        }
        for event in events {
            writeln!(
                writer,
                "{} {}-{}  {}  {}",
                event.start.format("%Y-%m-%d"),
                event.start.format("%H:%M"),
                event.end.format("%H:%M"),
                event.location,
                event.title
            )?;
        }
        Ok(())
    })
}
