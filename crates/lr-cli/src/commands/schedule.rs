//! Schedule command: book the configured slots for a day.

use std::io::Write;

use anyhow::Result;
use lr_calendar::CalendarStore;
use lr_core::{Booker, ResourceCatalog};
use lr_portal::BookingClient;

use crate::Config;
use crate::commands::{authenticate, now};
use crate::scheduler::ReservationScheduler;

/// Runs the schedule command.
///
/// A negative offset books immediately instead, like `lr now`.
pub fn run<W: Write>(writer: &mut W, config: &Config, days: i64) -> Result<()> {
    if days < 0 {
        return now::run(writer, config);
    }

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
        execute(writer, config, &client, calendar, &catalog, days)
    })
}

/// Books the slots `days` from today with `booker` and prints the report.
pub fn execute<W: Write, B: Booker>(
    writer: &mut W,
    config: &Config,
    booker: &B,
    calendar: &mut CalendarStore,
    catalog: &ResourceCatalog,
    days: i64,
) -> Result<()> {
    let report =
        ReservationScheduler::new(booker, calendar, &config.schedule, catalog, &config.booking)
            .run(days)?;
    write!(writer, "{report}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use chrono::Weekday;
    use lr_core::{BookingOutcome, BookingRequest, ResourceName, TimeSlot};

    use super::*;

    struct RejectAll(Cell<u32>);

    impl Booker for RejectAll {
        fn attempt(&self, _request: &BookingRequest) -> BookingOutcome {
            self.0.set(self.0.get() + 1);
            BookingOutcome::Rejected {
                reason: "full".to_string(),
            }
        }
    }

    fn config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config {
            calendar_path: dir.path().join("library.ics"),
            resources: vec![ResourceName::new("704A").unwrap()],
            resource_ids: BTreeMap::from([("704A".to_string(), 41)]),
            ..Config::default()
        };
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            config
                .schedule
                .slots_for_mut(weekday)
                .push(TimeSlot::parse("09:00", "11:00").unwrap());
        }
        config
    }

    #[test]
    fn unbooked_run_still_succeeds_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        CalendarStore::create(&config.calendar_path).unwrap();
        let catalog = config.catalog().unwrap();
        let booker = RejectAll(Cell::new(0));

        let mut output = Vec::new();
        CalendarStore::scoped(&config.calendar_path, |calendar| {
            execute(&mut output, &config, &booker, calendar, &catalog, 1)
        })
        .unwrap();

        let output = String::from_utf8(output).unwrap();
        let body: Vec<&str> = output.lines().skip(1).collect();
        assert_eq!(
            body,
            vec![
                "  09:00-11:00  not booked",
                "    704A: rejected (full)",
                "booked 0, unbooked 1",
            ]
        );
        assert_eq!(booker.0.get(), 1);
    }

    #[test]
    fn missing_credentials_fail_before_touching_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let mut output = Vec::new();
        let err = run(&mut output, &config, 1).unwrap_err();
        assert!(err.to_string().contains("username"));
        assert!(!config.calendar_path.exists());
        assert!(output.is_empty());
    }

    #[test]
    fn missing_calendar_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            username: Some("PB20000001".to_string()),
            password: Some("hunter2".to_string()),
            ..config(&dir)
        };

        let mut output = Vec::new();
        let err = run(&mut output, &config, 1).unwrap_err();
        assert!(err.to_string().contains("lr init"));
    }
}
