//! The decomposition pipeline - one record in, zero or more rows out
//!
//! A pipeline is built once per key spec and mode with
//! [`DecompositionPipeline::initialize`]. Setup is the only place that can
//! fail. After that `process` is a pure function of the record: bad input
//! never becomes an error, it becomes a blank row of full width so that
//! downstream row counts stay meaningful.

use crate::decompose::assembler::RowAssembler;
use crate::decompose::envelope::{parse_json_array, parse_json_object, EnvelopeParser};
use crate::decompose::expander::{EventArrayExpander, Events, MissingArray};
use crate::decompose::projector::{FieldKeySpec, FieldProjector};
use crate::decompose::types::{
    Mode, Row, EVENT_BODY_COLUMN, EVENT_NAME_COLUMN, SERVER_TIME_COLUMN, SPLIT_EXPLODE_COLUMN,
};
use crate::error::{ConfigError, Result};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Per-mode record handling, with any state only that mode needs
#[derive(Debug, Clone)]
enum Strategy {
    Projection,
    EnvelopeProjection,
    ArrayExpansion,
    Combined,
    SplitExplode(Regex),
}

/// Immutable, per-instance decomposition context
#[derive(Debug, Clone)]
pub struct DecompositionPipeline {
    mode: Mode,
    strategy: Strategy,
    parser: EnvelopeParser,
    projector: FieldProjector,
    expander: EventArrayExpander,
    assembler: RowAssembler,
    columns: Vec<String>,
}

impl DecompositionPipeline {
    /// Validate the declared keys for `mode` and resolve them once.
    ///
    /// # Example
    /// ```rust
    /// use logmelt::decompose::{DecompositionPipeline, Mode};
    ///
    /// let pipeline =
    ///     DecompositionPipeline::initialize(&["os"], Mode::EnvelopeProjection).unwrap();
    /// assert_eq!(pipeline.columns(), &["os", "server_time"]);
    ///
    /// let rows: Vec<_> = pipeline.process(r#"1583612345678|{"cm":{"os":"ios"}}"#).collect();
    /// assert_eq!(rows[0].cells, vec!["ios", "1583612345678"]);
    /// ```
    pub fn initialize<S: AsRef<str>>(keys: &[S], mode: Mode) -> Result<Self> {
        Self::with_spec(FieldKeySpec::new(keys), mode)
    }

    /// Same as `initialize`, for keys that have already been resolved
    pub fn with_spec(spec: FieldKeySpec, mode: Mode) -> Result<Self> {
        let got = spec.len();

        // Keys that feed the projector; fixed-column modes project nothing
        let (strategy, projected) = match mode {
            Mode::Projection | Mode::EnvelopeProjection => {
                if got < 1 {
                    return Err(ConfigError::TooFewKeys { mode, min: 1, got });
                }
                let strategy = if mode == Mode::Projection {
                    Strategy::Projection
                } else {
                    Strategy::EnvelopeProjection
                };
                (strategy, spec)
            }
            Mode::Combined => (Strategy::Combined, spec),
            Mode::ArrayExpansion => {
                let fixed = [EVENT_NAME_COLUMN, EVENT_BODY_COLUMN];
                if !spec.is_empty() && spec.keys() != fixed.as_slice() {
                    return Err(ConfigError::WrongKeyCount {
                        mode,
                        expected: "no keys or exactly the columns event_name, event_body",
                        got,
                    });
                }
                (Strategy::ArrayExpansion, FieldKeySpec::default())
            }
            Mode::SplitExplode => {
                let [pattern] = spec.declared() else {
                    return Err(ConfigError::WrongKeyCount {
                        mode,
                        expected: "exactly one key (the split pattern)",
                        got,
                    });
                };
                let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                (Strategy::SplitExplode(regex), FieldKeySpec::default())
            }
        };

        let on_missing = match mode {
            Mode::Combined => MissingArray::Sentinel,
            _ => MissingArray::Empty,
        };
        let assembler = RowAssembler::new(mode.reads_envelope(), mode.emits_events());

        let mut columns: Vec<String> = projected.keys().to_vec();
        if mode.reads_envelope() {
            columns.push(SERVER_TIME_COLUMN.to_string());
        }
        if mode.emits_events() {
            columns.push(EVENT_NAME_COLUMN.to_string());
            columns.push(EVENT_BODY_COLUMN.to_string());
        }
        if mode == Mode::SplitExplode {
            columns.push(SPLIT_EXPLODE_COLUMN.to_string());
        }

        // Row sinks key cells by column name, so names have to be unique
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(name) = columns.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ConfigError::DuplicateColumn {
                mode,
                name: name.clone(),
            });
        }

        debug!(%mode, width = columns.len(), ?columns, "initialized decomposition pipeline");

        Ok(DecompositionPipeline {
            mode,
            strategy,
            parser: EnvelopeParser::new(),
            projector: FieldProjector::new(projected),
            expander: EventArrayExpander::new(on_missing),
            assembler,
            columns,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Output column names, in row order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of cells in every row this pipeline emits
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Decompose one record. Never fails; the returned sequence is finite and
    /// calling `process` again with the same record yields the same rows.
    pub fn process(&self, record: &str) -> Rows {
        match &self.strategy {
            Strategy::Projection => self.process_projection(record),
            Strategy::EnvelopeProjection => self.process_envelope_projection(record),
            Strategy::ArrayExpansion => self.process_array_expansion(record),
            Strategy::Combined => self.process_combined(record),
            Strategy::SplitExplode(splitter) => self.process_split(splitter, record),
        }
    }

    fn process_projection(&self, record: &str) -> Rows {
        match parse_json_object(record) {
            Some(obj) => Rows::single(Row::new(self.projector.project(Some(&obj)))),
            None => self.reject("record is not a JSON object"),
        }
    }

    fn process_envelope_projection(&self, record: &str) -> Rows {
        let envelope = match self.parser.parse(record) {
            Ok(envelope) => envelope,
            Err(failure) => return self.reject(&failure.to_string()),
        };
        let Some(common) = envelope.common_fields() else {
            return self.reject("missing common fields object");
        };

        let cells = self.projector.project(Some(common));
        Rows::single(self.assembler.assemble(&cells, &envelope.timestamp, None))
    }

    fn process_array_expansion(&self, record: &str) -> Rows {
        match parse_json_array(record) {
            Some(items) => Rows::fan_out(
                Vec::new(),
                String::new(),
                self.assembler,
                self.expander.expand_items(items),
            ),
            None => self.reject("record is not a JSON array"),
        }
    }

    fn process_combined(&self, record: &str) -> Rows {
        let mut envelope = match self.parser.parse(record) {
            Ok(envelope) => envelope,
            Err(failure) => return self.reject(&failure.to_string()),
        };
        let Some(common) = envelope.common_fields() else {
            return self.reject("missing common fields object");
        };

        let cells = self.projector.project(Some(common));
        let events = self.expander.expand(envelope.take_event_section());
        Rows::fan_out(cells, envelope.timestamp, self.assembler, events)
    }

    fn process_split(&self, splitter: &Regex, record: &str) -> Rows {
        if record.is_empty() {
            return self.reject("empty record");
        }

        let mut pieces: Vec<&str> = splitter.split(record).collect();
        // A zero-width match at the start does not produce a leading piece
        let leading_empty_match = splitter
            .find(record)
            .is_some_and(|m| m.start() == 0 && m.end() == 0);
        if leading_empty_match && pieces.first() == Some(&"") {
            pieces.remove(0);
        }
        while pieces.last() == Some(&"") {
            pieces.pop();
        }

        Rows::pieces(pieces.into_iter().map(str::to_string).collect())
    }

    fn reject(&self, reason: &str) -> Rows {
        trace!(mode = %self.mode, reason, "record rejected, emitting blank row");
        Rows::single(Row::blank(self.width()))
    }
}

/// The rows produced for one record, built lazily
#[derive(Debug, Clone)]
pub struct Rows {
    inner: RowsInner,
}

#[derive(Debug, Clone)]
enum RowsInner {
    Single(std::option::IntoIter<Row>),
    FanOut {
        common: Vec<String>,
        timestamp: String,
        assembler: RowAssembler,
        events: Events,
    },
    Pieces(std::vec::IntoIter<String>),
}

impl Rows {
    fn single(row: Row) -> Self {
        Rows {
            inner: RowsInner::Single(Some(row).into_iter()),
        }
    }

    fn fan_out(
        common: Vec<String>,
        timestamp: String,
        assembler: RowAssembler,
        events: Events,
    ) -> Self {
        Rows {
            inner: RowsInner::FanOut {
                common,
                timestamp,
                assembler,
                events,
            },
        }
    }

    fn pieces(pieces: Vec<String>) -> Self {
        Rows {
            inner: RowsInner::Pieces(pieces.into_iter()),
        }
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        match &mut self.inner {
            RowsInner::Single(row) => row.next(),
            RowsInner::FanOut {
                common,
                timestamp,
                assembler,
                events,
            } => events
                .next()
                .map(|entry| assembler.assemble(common, timestamp, Some(&entry))),
            RowsInner::Pieces(pieces) => pieces.next().map(|piece| Row::new(vec![piece])),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            RowsInner::Single(row) => row.size_hint(),
            RowsInner::FanOut { events, .. } => events.size_hint(),
            RowsInner::Pieces(pieces) => pieces.size_hint(),
        }
    }
}

impl ExactSizeIterator for Rows {}
