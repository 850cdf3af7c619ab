//! CAS login handshake against the passport service.

use std::fmt;
use std::sync::LazyLock;

use lr_core::UserId;
use regex::Regex;
use thiserror::Error;

use crate::captcha::{CaptchaError, CaptchaSolver, OcrEngine};
use crate::config::PortalConfig;
use crate::session::Transport;
use crate::PortalError;

/// Name of the ticket-granting cookie set on a successful login.
pub const TICKET_COOKIE: &str = "TGC";

/// Pre-compiled pattern for the login ticket embedded in the login page.
static LOGIN_TICKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"LT-\w+").unwrap());

/// Login failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A request failed or returned an error status.
    #[error(transparent)]
    Portal(#[from] PortalError),
    /// The captcha could not be read.
    #[error(transparent)]
    Captcha(#[from] CaptchaError),
    /// The login page carried no `LT-` ticket.
    #[error("login page contained no login ticket")]
    MissingTicket,
    /// The form was accepted but no ticket-granting cookie was issued.
    ///
    /// A misread captcha, wrong credentials and a portal hiccup all look
    /// the same from here.
    #[error("no ticket-granting cookie after login")]
    Rejected,
    /// Every attempt failed.
    #[error("login failed after {attempts} attempt(s), last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<AuthError>,
    },
}

/// Account identifier and password, supplied once.
#[derive(Clone)]
pub struct Credentials {
    username: UserId,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: UserId, password: impl Into<String>) -> Self {
        Self {
            username,
            password: password.into(),
        }
    }

    pub const fn username(&self) -> &UserId {
        &self.username
    }
}

/// Returns the first `LT-...` login ticket in `page`.
pub fn extract_login_ticket(page: &str) -> Option<&str> {
    LOGIN_TICKET_RE.find(page).map(|m| m.as_str())
}

/// Drives the passport login and owns the resulting session.
///
/// Once [`login`](Self::login) succeeds, [`session`](Self::session) lends the
/// authenticated session to the booking client.
#[derive(Debug)]
pub struct CasAuthenticator<T, O> {
    session: T,
    solver: CaptchaSolver<O>,
    login_url: String,
    captcha_url: String,
    max_attempts: u32,
}

impl<T: Transport, O: OcrEngine> CasAuthenticator<T, O> {
    pub fn new(session: T, solver: CaptchaSolver<O>, config: &PortalConfig) -> Self {
        Self {
            session,
            solver,
            login_url: config.login_url(),
            captcha_url: config.captcha_url.clone(),
            max_attempts: config.max_login_attempts.max(1),
        }
    }

    /// Logs in, retrying the full handshake up to the configured limit.
    ///
    /// Each attempt starts from an empty cookie jar with a fresh captcha and
    /// login ticket. There is no backoff: the usual failure is a misread
    /// captcha, and the next captcha is independent of the last.
    pub fn login(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        let mut last = AuthError::Rejected;
        for attempt in 1..=self.max_attempts {
            match self.attempt(credentials) {
                Ok(()) => {
                    tracing::info!(
                        username = %credentials.username,
                        attempt,
                        "logged in"
                    );
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(attempt, max = self.max_attempts, error = %err, "login attempt failed");
                    last = err;
                }
            }
        }
        Err(AuthError::Exhausted {
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }

    /// Runs one complete handshake.
    pub fn attempt(&mut self, credentials: &Credentials) -> Result<(), AuthError> {
        self.session.clear_cookies()?;

        let image = self.session.get_bytes(&self.captcha_url)?;
        let digits = self.solver.solve(&image)?;

        let page = self.session.get_text(&self.login_url)?;
        let ticket = extract_login_ticket(&page)
            .ok_or(AuthError::MissingTicket)?
            .to_string();
        tracing::debug!(%ticket, %digits, "submitting login form");

        let form = [
            ("model", "uplogin.jsp".to_string()),
            ("CAS_LT", ticket),
            ("showCode", "1".to_string()),
            ("username", credentials.username.to_string()),
            ("password", credentials.password.clone()),
            ("LT", digits),
        ];
        // The ticket cookie decides success, not the status of the page the
        // redirect chain lands on.
        match self.session.post_form(&self.login_url, &form) {
            Ok(_) | Err(PortalError::Status { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        if self.is_authenticated() {
            Ok(())
        } else {
            Err(AuthError::Rejected)
        }
    }

    /// Whether the session currently holds the ticket-granting cookie.
    pub fn is_authenticated(&self) -> bool {
        self.session.has_cookie(&self.login_url, TICKET_COOKIE)
    }

    pub const fn session(&self) -> &T {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io::Cursor;

    use image::{GrayImage, ImageFormat, Rgb, RgbImage};

    use super::*;

    const LOGIN_PAGE: &str = r#"<form><input type="hidden" name="CAS_LT" value="LT-8c1f2e9aBc"></form>"#;

    fn captcha_png() -> Vec<u8> {
        let image = RgbImage::from_pixel(3, 3, Rgb([20, 90, 20]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Scripted portal: each POST consumes one entry of `grants` to decide
    /// whether the ticket cookie gets set.
    #[derive(Default)]
    struct FakePortal {
        login_page: String,
        grants: RefCell<VecDeque<bool>>,
        authenticated: Cell<bool>,
        clears: Cell<u32>,
        captcha_gets: Cell<u32>,
        page_gets: Cell<u32>,
        posts: RefCell<Vec<Vec<(String, String)>>>,
    }

    impl FakePortal {
        fn new(grants: &[bool]) -> Self {
            Self {
                login_page: LOGIN_PAGE.to_string(),
                grants: RefCell::new(grants.iter().copied().collect()),
                ..Self::default()
            }
        }
    }

    impl Transport for FakePortal {
        fn get_bytes(&self, url: &str) -> Result<Vec<u8>, PortalError> {
            assert!(url.contains("validatecode"));
            self.captcha_gets.set(self.captcha_gets.get() + 1);
            Ok(captcha_png())
        }

        fn get_text(&self, url: &str) -> Result<String, PortalError> {
            assert!(url.contains("login?service="));
            self.page_gets.set(self.page_gets.get() + 1);
            Ok(self.login_page.clone())
        }

        fn post_form(&self, _url: &str, form: &[(&str, String)]) -> Result<String, PortalError> {
            self.posts.borrow_mut().push(
                form.iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            );
            let granted = self.grants.borrow_mut().pop_front().unwrap_or(false);
            self.authenticated.set(granted);
            Ok(String::new())
        }

        fn has_cookie(&self, _url: &str, name: &str) -> bool {
            name == TICKET_COOKIE && self.authenticated.get()
        }

        fn clear_cookies(&mut self) -> Result<(), PortalError> {
            self.clears.set(self.clears.get() + 1);
            self.authenticated.set(false);
            Ok(())
        }
    }

    struct FixedOcr(&'static str);

    impl OcrEngine for FixedOcr {
        fn recognize_digits(&self, _image: &GrayImage) -> Result<String, CaptchaError> {
            Ok(self.0.to_string())
        }
    }

    fn credentials() -> Credentials {
        Credentials::new(UserId::new("PB20000001").unwrap(), "hunter2")
    }

    fn authenticator(
        portal: FakePortal,
        ocr: &'static str,
    ) -> CasAuthenticator<FakePortal, FixedOcr> {
        CasAuthenticator::new(
            portal,
            CaptchaSolver::new(FixedOcr(ocr)),
            &PortalConfig::default(),
        )
    }

    #[test]
    fn extracts_first_login_ticket() {
        assert_eq!(
            extract_login_ticket("a LT-123abc b LT-999"),
            Some("LT-123abc")
        );
        assert_eq!(extract_login_ticket("<html>no ticket</html>"), None);
    }

    #[test]
    fn login_submits_expected_form() {
        let mut auth = authenticator(FakePortal::new(&[true]), "5821");
        auth.login(&credentials()).unwrap();

        let posts = auth.session().posts.borrow();
        assert_eq!(posts.len(), 1);
        let form: Vec<(&str, &str)> = posts[0]
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            form,
            vec![
                ("model", "uplogin.jsp"),
                ("CAS_LT", "LT-8c1f2e9aBc"),
                ("showCode", "1"),
                ("username", "PB20000001"),
                ("password", "hunter2"),
                ("LT", "5821"),
            ]
        );
        assert!(auth.is_authenticated());
    }

    #[test]
    fn login_retries_with_fresh_handshake() {
        let mut auth = authenticator(FakePortal::new(&[false, true]), "5821");
        auth.login(&credentials()).unwrap();

        let portal = auth.session();
        assert_eq!(portal.clears.get(), 2);
        assert_eq!(portal.captcha_gets.get(), 2);
        assert_eq!(portal.page_gets.get(), 2);
        assert_eq!(portal.posts.borrow().len(), 2);
    }

    #[test]
    fn login_gives_up_after_max_attempts() {
        let mut auth = authenticator(FakePortal::new(&[false, false, false, true]), "5821");
        let err = auth.login(&credentials()).unwrap_err();

        assert!(matches!(
            err,
            AuthError::Exhausted { attempts: 3, ref last } if matches!(**last, AuthError::Rejected)
        ));
        let portal = auth.session();
        assert_eq!(portal.clears.get(), 3);
        assert_eq!(portal.captcha_gets.get(), 3);
        assert_eq!(portal.page_gets.get(), 3);
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn unreadable_captcha_fails_attempt_without_posting() {
        let mut auth = authenticator(FakePortal::new(&[true]), "");
        let err = auth.login(&credentials()).unwrap_err();

        assert!(matches!(
            err,
            AuthError::Exhausted { ref last, .. } if matches!(**last, AuthError::Captcha(_))
        ));
        assert!(auth.session().posts.borrow().is_empty());
        assert_eq!(auth.session().captcha_gets.get(), 3);
    }

    #[test]
    fn missing_ticket_fails_attempt() {
        let mut portal = FakePortal::new(&[true]);
        portal.login_page = "<html>maintenance</html>".to_string();
        let mut auth = authenticator(portal, "5821");

        let err = auth.attempt(&credentials()).unwrap_err();
        assert!(matches!(err, AuthError::MissingTicket));
        assert!(auth.session().posts.borrow().is_empty());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("PB20000001"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
