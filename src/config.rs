// src/config.rs
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::tables::ExtractionMode;
use crate::utils::AppError;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_PAGES: &str = "all";
pub const DEFAULT_CAMELOT: &str = "camelot";
pub const REFERENCE_FILE: &str = "correct.json";

/// The two ledger layouts this tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Attendance,
    Allowance,
}

impl DocumentKind {
    pub const VALID_OPTIONS: &'static str = "attendance, allowance";

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Attendance => "attendance",
            DocumentKind::Allowance => "allowance",
        }
    }

    pub fn default_input(&self) -> &'static Path {
        Path::new(match self {
            DocumentKind::Attendance => "materials/出勤簿 - shukkinbo - attendance book.pdf",
            DocumentKind::Allowance => {
                "materials/運転手手当一覧表 - Untenshu teate ichiran hyō - Driver Allowance List.pdf"
            }
        })
    }

    /// Base name shared by the JSON, CSV and Markdown outputs.
    pub fn file_stem(&self) -> &'static str {
        match self {
            DocumentKind::Attendance => "attendance_records",
            DocumentKind::Allowance => "driver_allowance",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DocumentKind::Attendance => "Attendance Records",
            DocumentKind::Allowance => "Driver Allowance List",
        }
    }

    /// Ruled attendance grids come out cleanest in lattice mode; the
    /// allowance schedule has few ruling lines.
    pub fn primary_mode(&self) -> ExtractionMode {
        match self {
            DocumentKind::Attendance => ExtractionMode::Lattice,
            DocumentKind::Allowance => ExtractionMode::Stream,
        }
    }

    pub fn output_folder(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.as_str())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "attendance" => Ok(DocumentKind::Attendance),
            "allowance" => Ok(DocumentKind::Allowance),
            _ => Err(AppError::Config(format!(
                "Invalid parser type: '{}'\nValid options: {}",
                s,
                Self::VALID_OPTIONS
            ))),
        }
    }
}

/// Where the attendance field numbers sit relative to their labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FieldLayout {
    /// Label and numbers share a cell of the data column
    #[default]
    RowText,
    /// Labels on their own rows, numbers a few rows above in the value column
    CellOffset,
}

/// Everything one extraction or regression run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub kind: DocumentKind,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub pages: String,
    pub layout: FieldLayout,
    pub camelot: String,
}

impl RunConfig {
    pub fn output_folder(&self) -> PathBuf {
        self.kind.output_folder(&self.output_dir)
    }

    pub fn output_json(&self) -> PathBuf {
        self.output_folder().join(format!("{}.json", self.kind.file_stem()))
    }

    pub fn reference_json(&self) -> PathBuf {
        self.output_folder().join(REFERENCE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("attendance".parse::<DocumentKind>().unwrap(), DocumentKind::Attendance);
        assert_eq!("Allowance".parse::<DocumentKind>().unwrap(), DocumentKind::Allowance);
    }

    #[test]
    fn test_invalid_kind_lists_valid_options() {
        let err = "invalid".parse::<DocumentKind>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Invalid parser type: 'invalid'"));
        assert!(message.contains("Valid options: attendance, allowance"));
    }

    #[test]
    fn test_output_paths() {
        let config = RunConfig {
            kind: DocumentKind::Allowance,
            input: DocumentKind::Allowance.default_input().to_path_buf(),
            output_dir: PathBuf::from("out"),
            pages: DEFAULT_PAGES.to_string(),
            layout: FieldLayout::default(),
            camelot: DEFAULT_CAMELOT.to_string(),
        };
        assert_eq!(config.output_json(), PathBuf::from("out/allowance/driver_allowance.json"));
        assert_eq!(config.reference_json(), PathBuf::from("out/allowance/correct.json"));
    }
}
