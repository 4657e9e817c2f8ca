// src/tables/models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Geometry-detection strategy used by the external table extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Whitespace-driven column detection
    Stream,
    /// Ruling-line driven cell detection
    Lattice,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Stream => "stream",
            ExtractionMode::Lattice => "lattice",
        }
    }

    /// The mode tried when this one fails.
    pub fn alternate(&self) -> Self {
        match self {
            ExtractionMode::Stream => ExtractionMode::Lattice,
            ExtractionMode::Lattice => ExtractionMode::Stream,
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One table detected on one page: a grid of raw cell texts.
///
/// Rows can be ragged; the column count is the widest row and cells past
/// the end of a short row read as empty text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub page: u32,
    pub cells: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(page: u32, cells: Vec<Vec<String>>) -> Self {
        Self { page, cells }
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    pub fn column_count(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn row(&self, row: usize) -> &[String] {
        self.cells.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Texts of a single column, one entry per row.
    pub fn column(&self, col: usize) -> Vec<&str> {
        (0..self.row_count()).map(|row| self.cell(row, col)).collect()
    }

    /// Builds a grid from a per-table JSON export where each row is an
    /// object keyed by the column index ("0", "1", ...).
    pub fn from_indexed_records(
        page: u32,
        records: Vec<BTreeMap<String, serde_json::Value>>,
    ) -> Self {
        let cells = records
            .into_iter()
            .map(|record| {
                let mut indexed: Vec<(usize, String)> = record
                    .into_iter()
                    .filter_map(|(key, value)| {
                        let idx = key.parse::<usize>().ok()?;
                        let text = match value {
                            serde_json::Value::String(s) => s,
                            serde_json::Value::Null => String::new(),
                            other => other.to_string(),
                        };
                        Some((idx, text))
                    })
                    .collect();
                indexed.sort_by_key(|(idx, _)| *idx);

                let width = indexed.last().map(|(idx, _)| idx + 1).unwrap_or(0);
                let mut row = vec![String::new(); width];
                for (idx, text) in indexed {
                    row[idx] = text;
                }
                row
            })
            .collect();

        Self::new(page, cells)
    }
}
