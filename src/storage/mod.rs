// src/storage/mod.rs
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::utils::error::StorageError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Summary of one extraction run, written next to the records.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub document_kind: String,
    pub source: String,
    pub extraction_mode: String,
    pub table_count: usize,
    pub record_count: usize,
    pub extraction_timestamp: String,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Pretty-printed JSON array, non-ASCII left as is
    pub fn save_json<T: Serialize>(
        &self,
        records: &[T],
        filename: &str,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(filename);
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json)?;

        tracing::info!("Saved JSON to {}", file_path.display());
        Ok(file_path)
    }

    /// CSV with a byte-order mark so spreadsheet tools detect UTF-8.
    ///
    /// Columns are every key seen across the records, in first-appearance
    /// order; records lacking a key get an empty cell.
    pub fn save_csv<T: Serialize>(
        &self,
        records: &[T],
        filename: &str,
    ) -> Result<PathBuf, StorageError> {
        let rows = to_rows(records)?;

        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let file_path = self.base_dir.join(filename);
        let mut file = fs::File::create(&file_path)?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        if !columns.is_empty() {
            writer.write_record(&columns)?;
        }
        for row in &rows {
            let cells = columns
                .iter()
                .map(|key| row.get(key).map(cell_text).unwrap_or_default());
            writer.write_record(cells)?;
        }
        writer.flush()?;

        tracing::info!("Saved CSV to {}", file_path.display());
        Ok(file_path)
    }

    /// Markdown table whose columns are the first record's keys.
    pub fn save_markdown<T: Serialize>(
        &self,
        records: &[T],
        filename: &str,
        title: &str,
    ) -> Result<PathBuf, StorageError> {
        let rows = to_rows(records)?;
        let file_path = self.base_dir.join(filename);
        fs::write(&file_path, render_markdown(&rows, title))?;

        tracing::info!("Saved Markdown to {}", file_path.display());
        Ok(file_path)
    }

    pub fn save_run_metadata(
        &self,
        metadata: &RunMetadata,
        filename: &str,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(filename);
        let metadata_str = serde_json::to_string_pretty(metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}

fn to_rows<T: Serialize>(records: &[T]) -> Result<Vec<Map<String, Value>>, StorageError> {
    records
        .iter()
        .map(|record| match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StorageError::SerializationError(format!(
                "expected a record object, got {}",
                other
            ))),
            Err(e) => Err(StorageError::SerializationError(e.to_string())),
        })
        .collect()
}

/// Flat text for one value; nested pairs become compact JSON objects.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn render_markdown(rows: &[Map<String, Value>], title: &str) -> String {
    let mut out = format!("# {}\n\nTotal: {}\n\n", title, rows.len());
    let Some(first) = rows.first() else {
        return out;
    };

    let keys: Vec<&String> = first.keys().collect();
    out.push_str(&format!(
        "| {} |\n",
        keys.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(" | ")
    ));
    out.push_str(&format!(
        "|{}|\n",
        keys.iter()
            .map(|k| "-".repeat(k.chars().count() + 2))
            .collect::<Vec<_>>()
            .join("|")
    ));
    for row in rows {
        let cells: Vec<String> = keys
            .iter()
            .map(|k| row.get(k.as_str()).map(cell_text).unwrap_or_default())
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}
