// src/tables/client.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::tables::models::{ExtractionMode, RawTable};
use crate::utils::error::TableError;

// Per-table export names written by camelot: <stem>-page-<n>-table-<m>.json
static EXPORT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-page-(\d+)-table-(\d+)\.json$").expect("Failed to compile EXPORT_NAME_RE")
});

/// Anything that can decompose a document into table grids.
pub trait TableSource {
    fn read_tables(
        &self,
        path: &Path,
        pages: &str,
        mode: ExtractionMode,
    ) -> Result<Vec<RawTable>, TableError>;
}

/// Runs the `camelot` command-line tool and loads its JSON exports.
#[derive(Debug, Clone)]
pub struct CamelotCli {
    program: String,
}

impl CamelotCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn load_exports(dir: &Path) -> Result<Vec<RawTable>, TableError> {
        let mut exports: Vec<(u32, u32, PathBuf)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if let Some(caps) = EXPORT_NAME_RE.captures(name) {
                let page = caps[1].parse().unwrap_or(0);
                let order = caps[2].parse().unwrap_or(0);
                exports.push((page, order, path));
            }
        }
        exports.sort();

        let mut tables = Vec::with_capacity(exports.len());
        for (page, _, path) in exports {
            let raw = fs::read_to_string(&path)?;
            let records: Vec<BTreeMap<String, serde_json::Value>> =
                serde_json::from_str(&raw).map_err(|source| TableError::Parse {
                    path: path.clone(),
                    source,
                })?;
            tables.push(RawTable::from_indexed_records(page, records));
        }
        Ok(tables)
    }
}

impl TableSource for CamelotCli {
    fn read_tables(
        &self,
        path: &Path,
        pages: &str,
        mode: ExtractionMode,
    ) -> Result<Vec<RawTable>, TableError> {
        let scratch = tempfile::tempdir()?;
        let output = scratch.path().join("tables.json");

        tracing::debug!("Running {} ({} mode) on {}", self.program, mode, path.display());
        let result = Command::new(&self.program)
            .arg("--pages")
            .arg(pages)
            .arg("--format")
            .arg("json")
            .arg("--output")
            .arg(&output)
            .arg(mode.as_str())
            .arg(path)
            .output()
            .map_err(|source| TableError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(TableError::CommandFailed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        let tables = Self::load_exports(scratch.path())?;
        if tables.is_empty() {
            return Err(TableError::NoTables(path.to_path_buf()));
        }
        Ok(tables)
    }
}

/// Pre-extracted grids stored as JSON: `[{"page": 1, "cells": [[...], ...]}]`.
///
/// The file already carries the geometry, so the mode is ignored.
#[derive(Debug, Clone, Default)]
pub struct GridFile;

impl TableSource for GridFile {
    fn read_tables(
        &self,
        path: &Path,
        _pages: &str,
        _mode: ExtractionMode,
    ) -> Result<Vec<RawTable>, TableError> {
        let raw = fs::read_to_string(path)?;
        let tables: Vec<RawTable> = serde_json::from_str(&raw).map_err(|source| TableError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if tables.is_empty() {
            return Err(TableError::NoTables(path.to_path_buf()));
        }
        Ok(tables)
    }
}

/// Picks the table source for an input file: `.json` grids are loaded
/// directly, everything else goes through camelot.
pub fn source_for(path: &Path, camelot_program: &str) -> Box<dyn TableSource> {
    let is_grid = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_grid {
        Box::new(GridFile)
    } else {
        Box::new(CamelotCli::new(camelot_program))
    }
}

/// Reads tables in `primary` mode, retrying exactly once in the alternate mode.
/// Returns the tables together with the mode that produced them.
pub fn read_with_fallback(
    source: &dyn TableSource,
    path: &Path,
    pages: &str,
    primary: ExtractionMode,
) -> Result<(Vec<RawTable>, ExtractionMode), TableError> {
    let primary_error = match source.read_tables(path, pages, primary) {
        Ok(tables) => {
            tracing::info!("Used {} method - Found {} table(s)", primary, tables.len());
            return Ok((tables, primary));
        }
        Err(e) => e,
    };

    let fallback = primary.alternate();
    tracing::warn!("{} extraction failed ({}), retrying with {}", primary, primary_error, fallback);

    match source.read_tables(path, pages, fallback) {
        Ok(tables) => {
            tracing::info!("Used {} method - Found {} table(s)", fallback, tables.len());
            Ok((tables, fallback))
        }
        Err(fallback_error) => Err(TableError::Unavailable {
            path: path.to_path_buf(),
            primary,
            primary_error: Box::new(primary_error),
            fallback,
            fallback_error: Box::new(fallback_error),
        }),
    }
}
