use crate::decompose::types::{EventEntry, Row};

/// Lays cells out in column order: common cells, server time, event name,
/// event body. Which groups are present is fixed per pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowAssembler {
    include_timestamp: bool,
    include_event: bool,
}

impl RowAssembler {
    pub fn new(include_timestamp: bool, include_event: bool) -> Self {
        RowAssembler {
            include_timestamp,
            include_event,
        }
    }

    /// Total row width for `common_width` projected cells
    pub fn width(&self, common_width: usize) -> usize {
        common_width + usize::from(self.include_timestamp) + 2 * usize::from(self.include_event)
    }

    /// Build one row. When the event group is enabled and `event` is `None`,
    /// the event columns are left empty.
    pub fn assemble(&self, common: &[String], timestamp: &str, event: Option<&EventEntry>) -> Row {
        let mut cells = Vec::with_capacity(self.width(common.len()));
        cells.extend(common.iter().cloned());

        if self.include_timestamp {
            cells.push(timestamp.to_string());
        }

        if self.include_event {
            match event {
                Some(entry) => {
                    cells.push(entry.name.clone());
                    cells.push(entry.raw.clone());
                }
                None => {
                    cells.push(String::new());
                    cells.push(String::new());
                }
            }
        }

        Row::new(cells)
    }
}
