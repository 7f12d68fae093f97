//! Log decomposition - turn `<timestamp>|<json>` log records into table rows
//!
//! This module validates log envelopes, projects common fields, and fans a
//! record's event array out into one row per event.
//!
//! ## Components
//!
//! - **envelope**: split and validate `<13-digit timestamp>|<json object>`
//! - **projector**: ordered key lookups with empty-on-miss cells
//! - **expander**: one entry per event array element
//! - **assembler**: fixed column layout for every emitted row
//! - **pipeline**: the per-mode transform tying the above together
//! - **writer**: TSV and JSON Lines row sinks

pub mod types;
pub mod envelope;
pub mod projector;
pub mod expander;
pub mod assembler;
pub mod pipeline;
pub mod writer;

pub use types::{Envelope, EventEntry, Mode, Row};
pub use envelope::{EnvelopeParser, ParseFailure};
pub use projector::{FieldKeySpec, FieldProjector};
pub use expander::{EventArrayExpander, Events, MissingArray};
pub use assembler::RowAssembler;
pub use pipeline::{DecompositionPipeline, Rows};
pub use writer::{OutputFormat, RowWriter};
