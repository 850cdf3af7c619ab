//! Portal endpoints and fixed booking fields.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Where and how to talk to the passport and appointment services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// CAS login endpoint, without the `service` query.
    pub passport_url: String,
    /// Captcha image endpoint.
    pub captcha_url: String,
    /// Service the CAS ticket is issued for.
    pub service_url: String,
    /// Base URL of the appointment API.
    pub appointment_url: String,
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Full login handshakes to try before giving up.
    pub max_login_attempts: u32,
    /// The `tesseract` executable used for captcha OCR.
    pub tesseract_path: PathBuf,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            passport_url: "https://passport.ustc.edu.cn/login".to_string(),
            captcha_url: "https://passport.ustc.edu.cn/validatecode.jsp?type=login".to_string(),
            service_url: "http://hs.lib.ustc.edu.cn/account/Login".to_string(),
            appointment_url: "https://hs.lib.ustc.edu.cn/desktopAppointment".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            max_login_attempts: 3,
            tesseract_path: PathBuf::from("tesseract"),
        }
    }
}

impl PortalConfig {
    /// Login page URL; the form is posted back to the same address.
    pub fn login_url(&self) -> String {
        format!("{}?service={}", self.passport_url, self.service_url)
    }

    pub fn booking_url(&self) -> String {
        format!(
            "{}/affirmAppointment",
            self.appointment_url.trim_end_matches('/')
        )
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Institutional fields sent unchanged with every reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingFields {
    /// Library partition (`PartionID` on the wire).
    pub partition_id: u32,
    /// Meeting theme shown on the booking.
    pub theme: String,
    /// Comma-separated co-appointees; empty for solo bookings.
    pub other_appointees: String,
    pub is_chair: bool,
}

impl Default for BookingFields {
    fn default() -> Self {
        Self {
            partition_id: 38,
            theme: "【科研讨论】".to_string(),
            other_appointees: String::new(),
            is_chair: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_carries_service() {
        let config = PortalConfig::default();
        assert_eq!(
            config.login_url(),
            "https://passport.ustc.edu.cn/login?service=http://hs.lib.ustc.edu.cn/account/Login"
        );
    }

    #[test]
    fn booking_url_tolerates_trailing_slash() {
        let config = PortalConfig {
            appointment_url: "https://example.test/desktopAppointment/".to_string(),
            ..PortalConfig::default()
        };
        assert_eq!(
            config.booking_url(),
            "https://example.test/desktopAppointment/affirmAppointment"
        );
    }
}
