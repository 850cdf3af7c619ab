//! HTTP session shared by the login handshake and the booking client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};

use crate::PortalError;

/// The operations the portal components need from an HTTP session.
///
/// [`HttpSession`] is the production implementation. Every call blocks
/// until a response arrives, the transport fails or the timeout elapses.
pub trait Transport {
    /// GETs `url` and returns the raw body.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, PortalError>;

    /// GETs `url` and returns the body as text.
    fn get_text(&self, url: &str) -> Result<String, PortalError>;

    /// POSTs a URL-encoded form and returns the body as text.
    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, PortalError>;

    /// Whether the cookie jar would send a cookie called `name` to `url`.
    fn has_cookie(&self, url: &str, name: &str) -> bool;

    /// Drops every cookie in the session.
    fn clear_cookies(&mut self) -> Result<(), PortalError>;
}

/// Cookie-carrying blocking HTTP client.
///
/// `reqwest`'s jar cannot be emptied in place, so clearing cookies swaps in
/// a fresh jar and a client bound to it.
pub struct HttpSession {
    client: Client,
    jar: Arc<Jar>,
    user_agent: String,
    timeout: Duration,
}

impl fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSession")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpSession {
    /// Creates a session with an empty cookie jar.
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, PortalError> {
        let user_agent = user_agent.into();
        let (client, jar) = build_client(&user_agent, timeout)?;
        Ok(Self {
            client,
            jar,
            user_agent,
            timeout,
        })
    }
}

fn build_client(user_agent: &str, timeout: Duration) -> Result<(Client, Arc<Jar>), PortalError> {
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .cookie_provider(Arc::clone(&jar))
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(PortalError::ClientBuild)?;
    Ok((client, jar))
}

fn transport_error(url: &str) -> impl FnOnce(reqwest::Error) -> PortalError + '_ {
    move |source| PortalError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Sends a request and turns non-success statuses into errors.
fn send(url: &str, request: RequestBuilder) -> Result<Response, PortalError> {
    let response = request.send().map_err(transport_error(url))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::Status {
            url: url.to_string(),
            message: format!("status {status}"),
        });
    }
    Ok(response)
}

impl Transport for HttpSession {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, PortalError> {
        let response = send(url, self.client.get(url))?;
        let bytes = response.bytes().map_err(transport_error(url))?;
        tracing::debug!(url, len = bytes.len(), "GET bytes");
        Ok(bytes.to_vec())
    }

    fn get_text(&self, url: &str) -> Result<String, PortalError> {
        let response = send(url, self.client.get(url))?;
        let text = response.text().map_err(transport_error(url))?;
        tracing::debug!(url, len = text.len(), "GET text");
        Ok(text)
    }

    fn post_form(&self, url: &str, form: &[(&str, String)]) -> Result<String, PortalError> {
        let response = send(url, self.client.post(url).form(form))?;
        let text = response.text().map_err(transport_error(url))?;
        tracing::debug!(url, len = text.len(), "POST form");
        Ok(text)
    }

    fn has_cookie(&self, url: &str, name: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        self.jar
            .cookies(&url)
            .and_then(|header| header.to_str().ok().map(|h| cookie_header_has(h, name)))
            .unwrap_or(false)
    }

    fn clear_cookies(&mut self) -> Result<(), PortalError> {
        let (client, jar) = build_client(&self.user_agent, self.timeout)?;
        self.client = client;
        self.jar = jar;
        Ok(())
    }
}

/// Checks a `Cookie` header value (`a=1; b=2`) for a cookie named `name`.
fn cookie_header_has(header: &str, name: &str) -> bool {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, _)| key.trim() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_lookup_matches_exact_names() {
        let header = "JSESSIONID=abc; TGC=TGT-1-xyz; lang=zh";
        assert!(cookie_header_has(header, "TGC"));
        assert!(cookie_header_has(header, "lang"));
        assert!(!cookie_header_has(header, "TG"));
        assert!(!cookie_header_has("", "TGC"));
    }

    #[test]
    fn new_session_has_no_cookies() {
        let session = HttpSession::new("test-agent", Duration::from_secs(5)).unwrap();
        assert!(!session.has_cookie("https://passport.ustc.edu.cn/login", "TGC"));
    }

    #[test]
    fn clear_cookies_drops_stored_cookies() {
        let mut session = HttpSession::new("test-agent", Duration::from_secs(5)).unwrap();
        let url = Url::parse("https://passport.ustc.edu.cn/login").unwrap();
        let cookie = reqwest::header::HeaderValue::from_static("TGC=TGT-1; Path=/");
        session.jar.set_cookies(&mut std::iter::once(&cookie), &url);
        assert!(session.has_cookie(url.as_str(), "TGC"));

        session.clear_cookies().unwrap();
        assert!(!session.has_cookie(url.as_str(), "TGC"));
    }

    #[test]
    fn debug_omits_cookie_jar() {
        let session = HttpSession::new("test-agent", Duration::from_secs(5)).unwrap();
        let debug = format!("{session:?}");
        assert!(debug.contains("test-agent"));
        assert!(!debug.contains("jar"));
    }
}
