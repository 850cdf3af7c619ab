//! Configuration loading and management.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use lr_core::{ResourceCatalog, ResourceName, Schedule, UserId};
use lr_portal::{BookingFields, Credentials, PortalConfig};
use serde::{Deserialize, Serialize};

/// Resource booked by `lr now` unless configured otherwise.
const DEFAULT_IMMEDIATE_RESOURCE: &str = "704A";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the iCalendar booking log.
    pub calendar_path: PathBuf,
    /// Portal account (student number).
    pub username: Option<String>,
    pub password: Option<String>,
    pub portal: PortalConfig,
    /// Fixed fields sent with every reservation.
    pub appointment: BookingFields,
    pub booking: BookingConfig,
    pub schedule: Schedule,
    /// Resources to try for each slot, most preferred first.
    pub resources: Vec<ResourceName>,
    /// Resource name → portal resource ID.
    pub resource_ids: BTreeMap<String, u64>,
}

/// Scheduler behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Summary of the calendar events created for bookings.
    pub event_title: String,
    /// Skip slots the calendar already shows as booked.
    pub skip_booked_slots: bool,
    /// Resource used by immediate bookings.
    pub immediate_resource: ResourceName,
    /// Minutes between now and the start of an immediate booking.
    pub immediate_lead_minutes: i64,
    /// Length of an immediate booking in minutes.
    pub immediate_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            event_title: "课程讨论".to_string(),
            skip_booked_slots: true,
            immediate_resource: ResourceName::new(DEFAULT_IMMEDIATE_RESOURCE)
                .expect("default immediate resource name is not blank"),
            immediate_lead_minutes: 1,
            immediate_minutes: 30,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("calendar_path", &self.calendar_path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("portal", &self.portal)
            .field("appointment", &self.appointment)
            .field("booking", &self.booking)
            .field("schedule", &self.schedule)
            .field("resources", &self.resources)
            .field("resource_ids", &self.resource_ids)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            calendar_path: data_dir.join("library.ics"),
            username: None,
            password: None,
            portal: PortalConfig::default(),
            appointment: BookingFields::default(),
            booking: BookingConfig::default(),
            schedule: Schedule::default(),
            resources: Vec::new(),
            resource_ids: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (LR_*, nested keys split on __)
        figment = figment.merge(Env::prefixed("LR_").split("__"));

        figment.extract()
    }

    /// Account credentials; both username and password must be set.
    pub fn credentials(&self) -> Result<Credentials> {
        let username = self
            .username
            .as_deref()
            .context("username is not configured (set LR_USERNAME or `username` in config.toml)")?;
        let password = self
            .password
            .as_deref()
            .context("password is not configured (set LR_PASSWORD or `password` in config.toml)")?;
        let username = UserId::new(username).context("invalid username")?;
        Ok(Credentials::new(username, password))
    }

    /// Resolves the preferred resources and checks the immediate resource.
    pub fn catalog(&self) -> Result<ResourceCatalog> {
        let catalog = ResourceCatalog::new(&self.resources, &self.resource_ids)
            .context("invalid resource configuration")?;
        catalog
            .resolve(&self.booking.immediate_resource)
            .context("invalid booking.immediate_resource")?;
        Ok(catalog)
    }
}

/// Returns the platform-specific config directory for lr.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lr"))
}

/// Returns the platform-specific data directory for lr.
///
/// On Linux: `~/.local/share/lr`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("lr"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Weekday;
    use tempfile::NamedTempFile;

    use super::*;

    const SAMPLE: &str = r#"
calendar_path = "/tmp/lr-test/library.ics"
username = "PB20000001"
password = "hunter2"
resources = ["707A", "704A"]

[resource_ids]
"704A" = 41
"707A" = 44

[schedule]
monday = [["09:00", "11:00"], ["14:00", "17:00"]]

[portal]
request_timeout_secs = 10

[booking]
skip_booked_slots = false
"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_dirs_data_path_ends_with_lr() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "lr");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_calendar() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.calendar_path, data_dir.join("library.ics"));
        assert_eq!(config.portal.max_login_attempts, 3);
        assert_eq!(config.appointment.partition_id, 38);
        assert_eq!(config.booking.immediate_resource.as_str(), "704A");
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let file = write_config(SAMPLE);
        let config = Config::load_from(Some(file.path())).unwrap();

        assert_eq!(config.calendar_path, PathBuf::from("/tmp/lr-test/library.ics"));
        assert_eq!(config.portal.request_timeout_secs, 10);
        assert_eq!(config.portal.max_login_attempts, 3);
        assert!(!config.booking.skip_booked_slots);
        assert_eq!(config.booking.event_title, "课程讨论");
        assert_eq!(config.schedule.slots_for(Weekday::Mon).len(), 2);
        assert!(config.schedule.slots_for(Weekday::Sun).is_empty());

        let catalog = config.catalog().unwrap();
        let order: Vec<_> = catalog.candidates().map(|(name, id)| (name.to_string(), id)).collect();
        assert_eq!(order, vec![("707A".to_string(), 44), ("704A".to_string(), 41)]);
        assert_eq!(config.credentials().unwrap().username().as_str(), "PB20000001");
    }

    #[test]
    fn test_invalid_slot_is_rejected_at_load() {
        let file = write_config("[schedule]\nfriday = [[\"11:00\", \"09:00\"]]\n");
        assert!(Config::load_from(Some(file.path())).is_err());
    }

    #[test]
    fn test_unknown_resource_fails_validation() {
        let file = write_config("resources = [\"999\"]\n[resource_ids]\n\"704A\" = 41\n");
        let config = Config::load_from(Some(file.path())).unwrap();
        assert!(config.catalog().is_err());
    }

    #[test]
    fn test_missing_immediate_resource_fails_validation() {
        let file = write_config("resources = [\"707A\"]\n[resource_ids]\n\"707A\" = 44\n");
        let config = Config::load_from(Some(file.path())).unwrap();
        let err = config.catalog().unwrap_err();
        assert!(err.to_string().contains("immediate_resource"));
    }

    #[test]
    fn test_missing_password_is_reported() {
        let config = Config {
            username: Some("PB20000001".to_string()),
            password: None,
            ..Config::default()
        };
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = Config {
            password: Some("hunter2".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
