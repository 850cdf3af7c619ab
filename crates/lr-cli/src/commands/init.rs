//! Init command for creating the booking calendar.

use std::io::Write;

use anyhow::{Context, Result};
use lr_calendar::{CalendarError, CalendarStore};

use crate::Config;

/// Runs the init command.
///
/// Missing parent directories are created. An existing calendar is left
/// untouched.
pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let path = &config.calendar_path;
    match CalendarStore::create(path) {
        Ok(()) => writeln!(writer, "Created calendar: {}", path.display())?,
        Err(CalendarError::AlreadyExists { .. }) => {
            writeln!(writer, "Calendar already exists: {}", path.display())?;
        }
        Err(err) => return Err(err).context("failed to create calendar"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn init_creates_then_keeps_calendar() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("library.ics");
        let config = Config {
            calendar_path: path.clone(),
            ..Config::default()
        };

        let mut output = Vec::new();
        run(&mut output, &config).unwrap();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&path.display().to_string(), "[TEMP]/library.ics");
        assert_snapshot!(output.trim_end(), @r"
        Created calendar: [TEMP]/library.ics
        Calendar already exists: [TEMP]/library.ics
        ");
        assert!(CalendarStore::open(&path).unwrap().events().is_empty());
    }
}
