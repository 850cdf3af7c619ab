//! Minimal iCalendar (RFC 5545) reader and writer.
//!
//! VEVENTs with a DTSTART and DTEND are decoded into [`CalendarEvent`]s, but
//! an event read from a file is written back from its original lines, so
//! properties the event type does not model (DESCRIPTION, DTSTAMP, TZID
//! parameters, ...) survive a rewrite. Other components and calendar-level
//! properties are kept verbatim too. Only VERSION and PRODID are regenerated.

use chrono::{Duration, NaiveDateTime};
use lr_core::CalendarEvent;
use lr_core::time::PORTAL_UTC_OFFSET_HOURS;
use thiserror::Error;

const CRLF: &str = "\r\n";
const MAX_LINE_OCTETS: usize = 75;
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const PRODID: &str = "-//library-reserve//lr//EN";

/// Parse failure with the 1-based line where it was detected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Decoded calendar contents.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Document {
    /// Calendar-level property lines other than VERSION and PRODID.
    pub properties: Vec<String>,
    events: Vec<CalendarEvent>,
    /// Original lines of each event in `events`; `None` for appended events.
    sources: Vec<Option<Vec<String>>>,
    /// Unfolded content lines of components kept as-is, one block each.
    pub foreign: Vec<Vec<String>>,
}

impl Document {
    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Adds a new event, rendered from its fields on write.
    pub fn push(&mut self, event: CalendarEvent) {
        self.events.push(event);
        self.sources.push(None);
    }

    fn push_decoded(&mut self, event: CalendarEvent, source: Vec<String>) {
        self.events.push(event);
        self.sources.push(Some(source));
    }
}

/// A content line split into its parts.
struct ContentLine<'a> {
    name: String,
    params: &'a str,
    value: &'a str,
}

/// Parses a calendar file. An empty input is an empty calendar.
pub fn parse(input: &str) -> Result<Document, ParseError> {
    let lines = unfold(input);
    let mut doc = Document::default();
    let mut iter = lines.into_iter();

    let Some((first_no, first)) = iter.next() else {
        return Ok(doc);
    };
    if !first.eq_ignore_ascii_case("BEGIN:VCALENDAR") {
        return Err(ParseError::new(first_no, "expected BEGIN:VCALENDAR"));
    }

    let mut last_no = first_no;
    while let Some((no, line)) = iter.next() {
        last_no = no;
        let upper = line.to_ascii_uppercase();
        if upper == "END:VCALENDAR" {
            return Ok(doc);
        }
        let Some(kind) = upper.strip_prefix("BEGIN:") else {
            if !is_regenerated_property(&upper) {
                doc.properties.push(line);
            }
            continue;
        };
        let kind = kind.to_string();
        let block = collect_component(&kind, no, line, &mut iter)?;
        if kind == "VEVENT" {
            match decode_event(&block) {
                Ok(event) => doc.push_decoded(event, block),
                Err(reason) => {
                    tracing::warn!(line = no, %reason, "keeping unrecognized event verbatim");
                    doc.foreign.push(block);
                }
            }
        } else {
            doc.foreign.push(block);
        }
    }
    Err(ParseError::new(last_no, "missing END:VCALENDAR"))
}

/// VERSION and PRODID are always written fresh.
fn is_regenerated_property(upper: &str) -> bool {
    ["VERSION", "PRODID"].iter().any(|name| {
        upper
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with([':', ';']))
    })
}

/// Collects a component's lines, including nested components, through its END.
fn collect_component(
    kind: &str,
    begin_no: usize,
    begin: String,
    iter: &mut impl Iterator<Item = (usize, String)>,
) -> Result<Vec<String>, ParseError> {
    let mut block = vec![begin];
    let mut depth = 1usize;
    for (_, line) in iter.by_ref() {
        let upper = line.to_ascii_uppercase();
        if upper.starts_with("BEGIN:") {
            depth += 1;
        } else if upper.starts_with("END:") {
            depth -= 1;
        }
        block.push(line);
        if depth == 0 {
            return Ok(block);
        }
    }
    Err(ParseError::new(begin_no, format!("unterminated {kind}")))
}

fn decode_event(block: &[String]) -> Result<CalendarEvent, String> {
    let mut uid = None;
    let mut title = None;
    let mut start = None;
    let mut end = None;
    let mut location = None;

    // First and last lines are BEGIN/END of the event itself.
    for line in &block[1..block.len() - 1] {
        let content = split_content_line(line).ok_or_else(|| format!("malformed line {line:?}"))?;
        match content.name.as_str() {
            "BEGIN" => return Err(format!("nested {} not supported", content.value)),
            "UID" => uid = Some(content.value.to_string()),
            "SUMMARY" => title = Some(unescape_text(content.value)),
            "LOCATION" => location = Some(unescape_text(content.value)),
            "DTSTART" => start = Some(decode_date_time(content.params, content.value)?),
            "DTEND" => end = Some(decode_date_time(content.params, content.value)?),
            _ => {}
        }
    }

    let start = start.ok_or("missing DTSTART")?;
    let end = end.ok_or("missing DTEND")?;
    let mut event = CalendarEvent::new(
        title.unwrap_or_default(),
        start,
        end,
        location.unwrap_or_default(),
    );
    if let Some(uid) = uid {
        event.uid = uid;
    }
    Ok(event)
}

/// Decodes a date-time into library wall-clock time.
///
/// Floating and TZID-qualified values are taken as library time; UTC values
/// are shifted by the portal offset. The result is only used for slot
/// matching; the original lines are what gets written back.
fn decode_date_time(params: &str, value: &str) -> Result<NaiveDateTime, String> {
    if params
        .split(';')
        .any(|param| param.eq_ignore_ascii_case("VALUE=DATE"))
    {
        return Err("all-day events are not supported".to_string());
    }
    let (raw, utc) = value
        .strip_suffix('Z')
        .map_or((value, false), |stripped| (stripped, true));
    let parsed = NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
        .map_err(|err| format!("invalid date-time {value:?}: {err}"))?;
    if utc {
        Ok(parsed + Duration::hours(PORTAL_UTC_OFFSET_HOURS))
    } else {
        Ok(parsed)
    }
}

/// Splits `NAME;PARAMS:VALUE`, honoring quoted parameter values.
fn split_content_line(line: &str) -> Option<ContentLine<'_>> {
    let mut in_quotes = false;
    let mut colon = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let colon = colon?;
    let head = &line[..colon];
    let (name, params) = head.find(';').map_or((head, ""), |idx| head.split_at(idx));
    if name.is_empty() {
        return None;
    }
    Some(ContentLine {
        name: name.to_ascii_uppercase(),
        params,
        value: &line[colon + 1..],
    })
}

/// Joins folded lines. Returns (starting line number, content) pairs.
fn unfold(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (idx, raw) in input.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(continued) = line.strip_prefix([' ', '\t']) {
            if let Some((_, last)) = lines.last_mut() {
                last.push_str(continued);
                continue;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        lines.push((idx + 1, line.to_string()));
    }
    lines
}

/// Renders a full calendar with CRLF line endings and folded long lines.
pub fn render(doc: &Document) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{PRODID}"));
    for line in &doc.properties {
        push_line(&mut out, line);
    }
    for (event, source) in doc.events.iter().zip(&doc.sources) {
        if let Some(lines) = source {
            for line in lines {
                push_line(&mut out, line);
            }
            continue;
        }
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}", event.uid));
        push_line(&mut out, &format!("SUMMARY:{}", escape_text(&event.title)));
        push_line(
            &mut out,
            &format!("DTSTART:{}", event.start.format(DATE_TIME_FORMAT)),
        );
        push_line(
            &mut out,
            &format!("DTEND:{}", event.end.format(DATE_TIME_FORMAT)),
        );
        push_line(&mut out, &format!("LOCATION:{}", escape_text(&event.location)));
        push_line(&mut out, "END:VEVENT");
    }
    for block in &doc.foreign {
        for line in block {
            push_line(&mut out, line);
        }
    }
    push_line(&mut out, "END:VCALENDAR");
    out
}

/// Appends one content line, folding at 75 octets on char boundaries.
fn push_line(out: &mut String, line: &str) {
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if used + len > budget {
            out.push_str(CRLF);
            out.push(' ');
            // the leading space counts toward the limit
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(ch);
        used += len;
    }
    out.push_str(CRLF);
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
