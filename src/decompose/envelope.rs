//! Envelope parsing - `<13-digit timestamp>|<json object>`
//!
//! Validation happens in two passes. The shallow pass only looks at the
//! separator count, the timestamp characters and the braces around the body,
//! so malformed records are rejected without attempting a JSON parse. The
//! full pass then parses the body and requires a JSON object.

use crate::decompose::types::{Envelope, ENVELOPE_SEPARATOR, TIMESTAMP_LEN};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^[0-9]{{{}}}$", TIMESTAMP_LEN)).unwrap()
});

/// Why a record could not be read as an envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("expected exactly one '|' separator, found {separators}")]
    MalformedEnvelope { separators: usize },

    #[error("timestamp must be exactly 13 ASCII digits")]
    InvalidTimestamp,

    #[error("body is not a JSON object")]
    InvalidBody,
}

/// Splits and validates envelope records
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeParser;

impl EnvelopeParser {
    pub fn new() -> Self {
        EnvelopeParser
    }

    /// Shallow check: separator count, timestamp digits, braced body.
    ///
    /// Returns the timestamp and the untrimmed body text on success.
    pub fn split<'a>(&self, raw: &'a str) -> Result<(&'a str, &'a str), ParseFailure> {
        let separators = raw.matches(ENVELOPE_SEPARATOR).count();
        let Some((timestamp, body)) = raw.split_once(ENVELOPE_SEPARATOR) else {
            return Err(ParseFailure::MalformedEnvelope { separators });
        };
        if separators != 1 {
            return Err(ParseFailure::MalformedEnvelope { separators });
        }

        if !is_valid_timestamp(timestamp) {
            return Err(ParseFailure::InvalidTimestamp);
        }

        if !is_braced(body) {
            return Err(ParseFailure::InvalidBody);
        }

        Ok((timestamp, body))
    }

    /// Full parse: shallow check, then the body must parse as a JSON object
    pub fn parse(&self, raw: &str) -> Result<Envelope, ParseFailure> {
        let (timestamp, body) = self.split(raw)?;
        let body = parse_object_body(body).ok_or(ParseFailure::InvalidBody)?;

        Ok(Envelope {
            timestamp: timestamp.to_string(),
            body,
        })
    }
}

/// Exactly 13 ASCII digits
pub fn is_valid_timestamp(text: &str) -> bool {
    TIMESTAMP_REGEX.is_match(text)
}

/// Trimmed text starts with `{` and ends with `}`
pub fn is_braced(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

/// Parse text as a JSON object, after the cheap brace check
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    if !is_braced(text) {
        return None;
    }
    parse_object_body(text)
}

/// Parse text as a JSON array, after a cheap bracket check
pub fn parse_json_array(text: &str) -> Option<Vec<Value>> {
    let trimmed = text.trim();
    if !trimmed.starts_with('[') || !trimmed.ends_with(']') {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn parse_object_body(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str(text.trim()) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}
