//! Record-source interceptors
//!
//! Interceptors run on raw records before they reach a decomposition
//! pipeline. Each one returns a [`Verdict`]: keep the record as it is,
//! drop it, or replace it with a rewritten copy. Unlike the pipeline, which
//! turns bad input into blank rows, a dropped record produces no rows at all.

use crate::decompose::envelope::{is_braced, EnvelopeParser};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Header set by [`TypeInterceptor`]
pub const TOPIC_HEADER: &str = "topic";

/// Marker removed by [`MarkerInterceptor::default`]
pub const DEFAULT_MARKER: &str = ">>>";

/// A raw record travelling from the source, with free-form headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogRecord {
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl LogRecord {
    pub fn new(body: impl Into<String>) -> Self {
        LogRecord {
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// Outcome of intercepting one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep(LogRecord),
    Drop,
    Replace(LogRecord),
}

impl Verdict {
    /// The record to pass on, if any
    pub fn into_record(self) -> Option<LogRecord> {
        match self {
            Verdict::Keep(record) | Verdict::Replace(record) => Some(record),
            Verdict::Drop => None,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Verdict::Drop)
    }
}

pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept(&self, record: LogRecord) -> Verdict;

    /// Intercept a batch, keeping order and leaving dropped records out
    fn intercept_batch(&self, records: Vec<LogRecord>) -> Vec<LogRecord> {
        records
            .into_iter()
            .filter_map(|record| self.intercept(record).into_record())
            .collect()
    }
}

/// Start logs are bare JSON objects; event logs are timestamped envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Start,
    Event,
}

impl LogKind {
    /// Any record mentioning `start` is a start log
    pub fn classify(body: &str) -> Self {
        if body.contains("start") {
            LogKind::Start
        } else {
            LogKind::Event
        }
    }

    pub fn topic(self) -> &'static str {
        match self {
            LogKind::Start => "topic_start",
            LogKind::Event => "topic_event",
        }
    }
}

/// Cheap shape check for a start log: a braced body
pub fn verify_start_log(log: &str) -> bool {
    is_braced(log)
}

/// Cheap shape check for an event log: one separator, 13-digit timestamp,
/// braced body. The body is not parsed.
pub fn verify_event_log(log: &str) -> bool {
    EnvelopeParser::new().split(log).is_ok()
}

/// Tags every record with the topic for its log kind
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeInterceptor;

impl Interceptor for TypeInterceptor {
    fn name(&self) -> &'static str {
        "type"
    }

    fn intercept(&self, record: LogRecord) -> Verdict {
        let topic = LogKind::classify(&record.body).topic();
        Verdict::Replace(record.with_header(TOPIC_HEADER, topic))
    }
}

/// Drops records that fail the shape check for their kind
#[derive(Debug, Clone, Copy, Default)]
pub struct EtlInterceptor;

impl Interceptor for EtlInterceptor {
    fn name(&self) -> &'static str {
        "etl"
    }

    fn intercept(&self, record: LogRecord) -> Verdict {
        let valid = match LogKind::classify(&record.body) {
            LogKind::Start => verify_start_log(&record.body),
            LogKind::Event => verify_event_log(&record.body),
        };
        if valid {
            Verdict::Keep(record)
        } else {
            Verdict::Drop
        }
    }
}

/// Keeps only records routed to one topic. Records without a topic header
/// are classified on the spot.
#[derive(Debug, Clone, Copy)]
pub struct RouteInterceptor {
    kind: LogKind,
}

impl RouteInterceptor {
    pub fn new(kind: LogKind) -> Self {
        RouteInterceptor { kind }
    }
}

impl Interceptor for RouteInterceptor {
    fn name(&self) -> &'static str {
        "route"
    }

    fn intercept(&self, record: LogRecord) -> Verdict {
        let topic = record
            .header(TOPIC_HEADER)
            .unwrap_or_else(|| LogKind::classify(&record.body).topic());
        if topic == self.kind.topic() {
            Verdict::Keep(record)
        } else {
            Verdict::Drop
        }
    }
}

/// Prefixes the body with the current epoch millis, producing an envelope
#[derive(Debug, Clone, Copy)]
pub struct TimestampInterceptor {
    clock: fn() -> i64,
}

impl TimestampInterceptor {
    pub fn new() -> Self {
        Self::with_clock(|| chrono::Utc::now().timestamp_millis())
    }

    pub fn with_clock(clock: fn() -> i64) -> Self {
        TimestampInterceptor { clock }
    }
}

impl Default for TimestampInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for TimestampInterceptor {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn intercept(&self, mut record: LogRecord) -> Verdict {
        record.body = format!("{}|{}", (self.clock)(), record.body);
        Verdict::Replace(record)
    }
}

/// Removes every occurrence of a marker string from the body
#[derive(Debug, Clone)]
pub struct MarkerInterceptor {
    marker: String,
}

impl MarkerInterceptor {
    pub fn new(marker: impl Into<String>) -> Self {
        MarkerInterceptor {
            marker: marker.into(),
        }
    }
}

impl Default for MarkerInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl Interceptor for MarkerInterceptor {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn intercept(&self, mut record: LogRecord) -> Verdict {
        if self.marker.is_empty() || !record.body.contains(&self.marker) {
            return Verdict::Keep(record);
        }
        record.body = record.body.replace(&self.marker, "");
        Verdict::Replace(record)
    }
}

/// Interceptors applied in order; the first drop wins
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    pub fn push(&mut self, interceptor: Box<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names in application order
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn apply(&self, record: LogRecord) -> Option<LogRecord> {
        let mut current = record;
        for interceptor in &self.interceptors {
            match interceptor.intercept(current) {
                Verdict::Keep(record) | Verdict::Replace(record) => current = record,
                Verdict::Drop => {
                    debug!(interceptor = interceptor.name(), "record dropped");
                    return None;
                }
            }
        }
        Some(current)
    }
}
