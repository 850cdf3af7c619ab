//! Now command: a single half-hour booking starting right away.

use std::io::Write;

use anyhow::Result;
use lr_calendar::CalendarStore;
use lr_core::{Booker, BookingOutcome, BookingRequest, ResourceCatalog};
use lr_portal::BookingClient;

use crate::Config;
use crate::commands::authenticate;
use crate::scheduler::ReservationScheduler;

/// Runs the now command.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let credentials = config.credentials()?;
    let catalog = config.catalog()?;

    CalendarStore::scoped(&config.calendar_path, |calendar| -> Result<()> {
        let auth = authenticate(config, &credentials)?;
        let client = BookingClient::new(
            auth.session(),
            &config.portal,
            credentials.username().clone(),
            config.appointment.clone(),
        );
        execute(writer, config, &client, calendar, &catalog)
    })
}

/// Makes the immediate attempt with `booker` at the current time.
pub fn execute<W: Write, B: Booker>(
    writer: &mut W,
    config: &Config,
    booker: &B,
    calendar: &mut CalendarStore,
    catalog: &ResourceCatalog,
) -> Result<()> {
    let (request, outcome) =
        ReservationScheduler::new(booker, calendar, &config.schedule, catalog, &config.booking)
            .run_now()?;
    print_outcome(writer, &request, &outcome)
}

fn print_outcome<W: Write>(
    writer: &mut W,
    request: &BookingRequest,
    outcome: &BookingOutcome,
) -> Result<()> {
    writeln!(
        writer,
        "{} {}  {}: {outcome}",
        request.date_str(),
        request.slot,
        request.resource
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use lr_core::{ResourceName, TimeSlot};

    use super::*;

    #[test]
    fn outcome_line_names_window_and_resource() {
        let request = BookingRequest {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            slot: TimeSlot::parse("10:17", "10:47").unwrap(),
            resource: ResourceName::new("704A").unwrap(),
            resource_id: 41,
        };
        let outcome = BookingOutcome::Confirmed {
            hint: "预约成功".to_string(),
        };

        let mut output = Vec::new();
        print_outcome(&mut output, &request, &outcome).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output.trim_end(), @"2024-03-05 10:17-10:47  704A: confirmed (预约成功)");
    }
}
