//! Reservation requests against the appointment API.

use lr_core::{Booker, BookingOutcome, BookingRequest, UserId};
use serde_json::Value;

use crate::config::{BookingFields, PortalConfig};
use crate::session::Transport;

/// Submits reservations over an authenticated session.
///
/// The client borrows the session from the authenticator; it never logs in
/// on its own.
#[derive(Debug)]
pub struct BookingClient<'a, T> {
    session: &'a T,
    url: String,
    user_id: UserId,
    fields: BookingFields,
}

impl<'a, T: Transport> BookingClient<'a, T> {
    pub fn new(session: &'a T, config: &PortalConfig, user_id: UserId, fields: BookingFields) -> Self {
        Self {
            session,
            url: config.booking_url(),
            user_id,
            fields,
        }
    }

    /// Form payload for one reservation, in the order the portal sends it.
    fn form(&self, request: &BookingRequest) -> Vec<(&'static str, String)> {
        vec![
            ("PartionID", self.fields.partition_id.to_string()),
            ("theme", self.fields.theme.clone()),
            ("otherAppointees", self.fields.other_appointees.clone()),
            ("isChair", python_bool(self.fields.is_chair).to_string()),
            ("userId", self.user_id.to_string()),
            ("dateName", request.date_str()),
            ("startTime", request.slot.start_str()),
            ("endTime", request.slot.end_str()),
            ("resourceId", request.resource_id.to_string()),
        ]
    }
}

impl<T: Transport> Booker for BookingClient<'_, T> {
    fn attempt(&self, request: &BookingRequest) -> BookingOutcome {
        tracing::debug!(
            date = %request.date,
            slot = %request.slot,
            resource = %request.resource,
            "requesting appointment"
        );
        let outcome = match self.session.post_form(&self.url, &self.form(request)) {
            Ok(body) => classify(&body),
            Err(err) => BookingOutcome::TransportError {
                message: err.to_string(),
            },
        };
        match &outcome {
            BookingOutcome::Confirmed { hint } => {
                tracing::info!(resource = %request.resource, slot = %request.slot, %hint, "appointment confirmed");
            }
            BookingOutcome::Rejected { reason } => {
                tracing::warn!(resource = %request.resource, slot = %request.slot, %reason, "appointment rejected");
            }
            BookingOutcome::TransportError { message } => {
                tracing::warn!(resource = %request.resource, slot = %request.slot, %message, "appointment request failed");
            }
        }
        outcome
    }
}

/// The portal's form decoder expects Python-style booleans.
const fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Interprets an `affirmAppointment` response body.
///
/// - `message` falsy: rejected, with `content` as the reason
/// - `message` truthy: confirmed iff `content[0].appointmentState` is truthy
/// - anything unparseable: transport error
pub fn classify(body: &str) -> BookingOutcome {
    let payload: Value = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(err) => {
            return BookingOutcome::TransportError {
                message: format!("invalid response: {err}"),
            };
        }
    };

    let Some(message) = payload.get("message") else {
        return BookingOutcome::TransportError {
            message: "response has no message field".to_string(),
        };
    };
    let content = payload.get("content").unwrap_or(&Value::Null);

    if !is_truthy(message) {
        return BookingOutcome::Rejected {
            reason: render(content),
        };
    }

    let Some(first) = content.as_array().and_then(|items| items.first()) else {
        return BookingOutcome::TransportError {
            message: format!("unexpected content: {}", render(content)),
        };
    };
    let hint = first.get("appointmentHint").map(render).unwrap_or_default();
    let confirmed = first.get("appointmentState").is_some_and(is_truthy);
    if confirmed {
        BookingOutcome::Confirmed { hint }
    } else {
        BookingOutcome::Rejected { reason: hint }
    }
}

/// Truthiness as the portal's own client evaluates it.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Strings verbatim, everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
