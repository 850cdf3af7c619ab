//! Client for the library's passport login and appointment API.
//!
//! Provides:
//! - [`HttpSession`]: the cookie-carrying session behind the [`Transport`] seam
//! - [`CaptchaSolver`]: color-band binarization plus digit OCR
//! - [`CasAuthenticator`]: the passport login handshake with retries
//! - [`BookingClient`]: single reservation attempts and response classification
//!
//! Everything here is blocking and single-threaded. Components absorb their
//! own failures into tagged results; nothing below the caller panics or
//! aborts a run.

mod auth;
mod booking;
pub mod captcha;
mod config;
mod session;

use thiserror::Error;

pub use auth::{AuthError, CasAuthenticator, Credentials, TICKET_COOKIE, extract_login_ticket};
pub use booking::{BookingClient, classify};
pub use captcha::{CaptchaError, CaptchaSolver, OcrEngine, TesseractCli};
pub use config::{BookingFields, PortalConfig};
pub use session::{HttpSession, Transport};

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The request failed in transit or returned an error status.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The portal answered with something other than what was asked for.
    #[error("unexpected response from {url}: {message}")]
    Status { url: String, message: String },
}

/// The production authenticator: real HTTP and the `tesseract` binary.
pub type PortalAuthenticator = CasAuthenticator<HttpSession, TesseractCli>;

/// Builds a [`PortalAuthenticator`] from configuration.
pub fn connect(config: &PortalConfig) -> Result<PortalAuthenticator, PortalError> {
    let session = HttpSession::new(config.user_agent.clone(), config.request_timeout())?;
    let solver = CaptchaSolver::new(TesseractCli::new(config.tesseract_path.clone()));
    Ok(CasAuthenticator::new(session, solver, config))
}
