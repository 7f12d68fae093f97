use crate::decompose::types::Row;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;

/// Row serialization format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated cells, one row per line
    #[default]
    Tsv,
    /// One JSON object per row, keyed by column name
    Jsonl,
}

/// Writes decomposed rows to a single output
pub struct RowWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    columns: Vec<String>,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W, format: OutputFormat, columns: &[String]) -> Self {
        RowWriter {
            writer,
            format,
            columns: columns.to_vec(),
        }
    }

    /// Write the column names as a header line. JSON Lines output carries
    /// the names in every row, so this is a no-op there.
    pub fn write_header(&mut self) -> Result<()> {
        if self.format == OutputFormat::Tsv {
            let line = self
                .columns
                .iter()
                .map(|c| escape_tsv(c))
                .collect::<Vec<_>>()
                .join("\t");
            writeln!(self.writer, "{}", line).context("Failed to write header")?;
        }
        Ok(())
    }

    /// Write rows, returning how many were written
    pub fn write_rows<I: IntoIterator<Item = Row>>(&mut self, rows: I) -> Result<usize> {
        let mut count = 0;
        for row in rows {
            self.write_row(&row)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        match self.format {
            OutputFormat::Tsv => {
                let line = row
                    .cells
                    .iter()
                    .map(|c| escape_tsv(c))
                    .collect::<Vec<_>>()
                    .join("\t");
                writeln!(self.writer, "{}", line).context("Failed to write row")?;
            }
            OutputFormat::Jsonl => {
                let mut data = Map::new();
                for (column, cell) in self.columns.iter().zip(&row.cells) {
                    data.insert(column.clone(), Value::String(cell.clone()));
                }
                let json = serde_json::to_string(&data).context("Failed to serialize row")?;
                writeln!(self.writer, "{}", json).context("Failed to write row")?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Escape characters that would break the tab-separated layout
fn escape_tsv(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    for ch in cell.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
