use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Separator between the timestamp and the body of an envelope
pub const ENVELOPE_SEPARATOR: char = '|';

/// Number of digits in an envelope timestamp (epoch millis)
pub const TIMESTAMP_LEN: usize = 13;

/// Body key holding the common fields object
pub const COMMON_FIELDS_KEY: &str = "cm";

/// Body key holding the event array
pub const EVENT_ARRAY_KEY: &str = "et";

/// Event key holding the event name
pub const EVENT_NAME_KEY: &str = "en";

pub const SERVER_TIME_COLUMN: &str = "server_time";
pub const EVENT_NAME_COLUMN: &str = "event_name";
pub const EVENT_BODY_COLUMN: &str = "event_body";
pub const SPLIT_EXPLODE_COLUMN: &str = "split_explode_col";

/// Which table-generating transform a pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Bare JSON object in, one row of projected cells out
    Projection,
    /// Envelope in, projected common fields + server time out
    EnvelopeProjection,
    /// Bare JSON event array in, one (name, body) row per element
    ArrayExpansion,
    /// Envelope in, common fields + server time + one event per row
    Combined,
    /// Plain string in, one row per piece split on a regex
    SplitExplode,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Projection => "projection",
            Mode::EnvelopeProjection => "envelope-projection",
            Mode::ArrayExpansion => "array-expansion",
            Mode::Combined => "combined",
            Mode::SplitExplode => "split-explode",
        }
    }

    /// Whether records in this mode are `<timestamp>|<json>` envelopes
    pub fn reads_envelope(self) -> bool {
        matches!(self, Mode::EnvelopeProjection | Mode::Combined)
    }

    /// Whether rows in this mode end with the event name and body columns
    pub fn emits_events(self) -> bool {
        matches!(self, Mode::ArrayExpansion | Mode::Combined)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log record split into its server timestamp and JSON object body
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Exactly 13 ASCII digits
    pub timestamp: String,

    /// The parsed body, always a JSON object
    pub body: Map<String, Value>,
}

impl Envelope {
    /// The `"cm"` object, if present and actually an object
    pub fn common_fields(&self) -> Option<&Map<String, Value>> {
        self.body.get(COMMON_FIELDS_KEY).and_then(Value::as_object)
    }

    /// Take the `"et"` section out of the body, whatever its JSON type
    pub fn take_event_section(&mut self) -> Option<Value> {
        self.body.remove(EVENT_ARRAY_KEY)
    }
}

/// One element of an event array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    /// Value of `"en"`, empty when absent
    pub name: String,

    /// The element serialized back to JSON text
    pub raw: String,
}

impl EventEntry {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        EventEntry {
            name: name.into(),
            raw: raw.into(),
        }
    }

    /// The entry used for non-object elements and missing arrays
    pub fn blank() -> Self {
        EventEntry::default()
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty() && self.raw.is_empty()
    }
}

/// One emitted output row - a fixed-width list of text cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Row { cells }
    }

    /// A row of `width` empty cells, emitted in place of rejected records
    pub fn blank(width: usize) -> Self {
        Row {
            cells: vec![String::new(); width],
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(String::is_empty)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(String::as_str)
    }

    pub fn into_cells(self) -> Vec<String> {
        self.cells
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Row::new(iter.into_iter().map(Into::into).collect())
    }
}
