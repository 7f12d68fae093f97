//! # logmelt - Log Record Decomposition
//!
//! Turns semi-structured log records into fixed-width table rows.
//! An event log record is a 13-digit epoch-millis timestamp and a JSON
//! object joined by `|`; the object carries common fields under `"cm"` and an
//! event array under `"et"`.
//!
//! ## Modules
//!
//! - **decompose**: envelope parsing, field projection, event fan-out, row sinks
//! - **filter**: interceptors applied to raw records before decomposition
//! - **config**: TOML run configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use logmelt::decompose::{DecompositionPipeline, Mode};
//!
//! # fn main() -> anyhow::Result<()> {
//! let pipeline = DecompositionPipeline::initialize(&["os"], Mode::Combined)?;
//!
//! let record = r#"1583612345678|{"cm":{"os":"ios"},"et":[{"en":"click"},{"en":"view"}]}"#;
//! let rows: Vec<_> = pipeline.process(record).collect();
//!
//! // rows[0] = ["ios", "1583612345678", "click", "{\"en\":\"click\"}"]
//! // rows[1] = ["ios", "1583612345678", "view", "{\"en\":\"view\"}"]
//! assert_eq!(rows.len(), 2);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::trace;

pub mod config;
pub mod decompose;
pub mod error;
pub mod filter;
pub mod logging;

// Re-export commonly used types for convenience
pub use config::RunConfig;
pub use decompose::{DecompositionPipeline, Mode, OutputFormat, Row, RowWriter, Rows};
pub use error::ConfigError;
pub use filter::{InterceptorChain, LogRecord, Verdict};

/// Counts from one `decompose_lines` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecomposeSummary {
    /// Lines read from the input
    pub records: usize,
    /// Records removed by interceptors
    pub dropped: usize,
    /// Rows written
    pub rows: usize,
    /// Rows written with every cell empty
    pub blank_rows: usize,
}

/// Main entry point: decompose a line-oriented record stream.
///
/// Lines end in `\n` or `\r\n`. A line that is not valid UTF-8 is a bad
/// record like any other and becomes one blank row; only I/O failures abort.
pub fn decompose_lines<R: BufRead, W: Write>(
    mut reader: R,
    pipeline: &DecompositionPipeline,
    chain: &InterceptorChain,
    writer: &mut RowWriter<W>,
) -> Result<DecomposeSummary> {
    let mut summary = DecomposeSummary::default();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .context("Failed to read line")?;
        if read == 0 {
            break;
        }
        summary.records += 1;

        let line = match std::str::from_utf8(trim_line_ending(&buffer)) {
            Ok(line) => line.to_string(),
            Err(e) => {
                trace!(line = summary.records, error = %e, "record is not valid UTF-8");
                write_row(writer, &Row::blank(pipeline.width()), &mut summary)?;
                continue;
            }
        };

        let Some(record) = chain.apply(LogRecord::new(line)) else {
            summary.dropped += 1;
            continue;
        };

        for row in pipeline.process(&record.body) {
            write_row(writer, &row, &mut summary)?;
        }
    }

    writer.flush()?;
    Ok(summary)
}

fn write_row<W: Write>(
    writer: &mut RowWriter<W>,
    row: &Row,
    summary: &mut DecomposeSummary,
) -> Result<()> {
    if row.is_blank() {
        summary.blank_rows += 1;
    }
    writer.write_row(row)?;
    summary.rows += 1;
    Ok(())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
