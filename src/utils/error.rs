// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::tables::models::ExtractionMode;

// Errors raised at the boundary with the external table extractor
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to launch table extractor '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Table extractor exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table export {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No tables found in {0}")]
    NoTables(PathBuf),

    // Primary and alternate geometry modes both failed
    #[error("Extraction unavailable for {path} ({primary}: {primary_error}; {fallback}: {fallback_error})")]
    Unavailable {
        path: PathBuf,
        primary: ExtractionMode,
        primary_error: Box<TableError>,
        fallback: ExtractionMode,
        fallback_error: Box<TableError>,
    },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not find header row in table on page {page}")]
    HeaderNotFound { page: u32 },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("{0} not found. Run extraction first.")]
    ActualMissing(PathBuf),

    #[error("{0} not found.")]
    ReferenceMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table extraction failed: {0}")]
    Tables(#[from] TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Regression check failed: {0}")]
    Regression(#[from] RegressionError),
}
