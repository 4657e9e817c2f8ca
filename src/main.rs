// src/main.rs
mod config;
mod extractors;
mod regression;
mod storage;
mod tables;
mod utils;

use chrono::Utc;
use clap::{CommandFactory, Parser};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use config::{DocumentKind, FieldLayout, RunConfig};
use extractors::{AllowanceParser, AttendanceParser};
use storage::{RunMetadata, StorageManager};
use tables::ExtractionMode;
use utils::AppError;

const RULE: &str = "======================================================================";

/// Command Line Interface for the payroll ledger extractor
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Examples:\n  payroll_extractor attendance\n  payroll_extractor allowance --test\n  payroll_extractor attendance /path/to/custom.pdf"
)]
struct Args {
    /// Document type: attendance or allowance
    kind: Option<String>,

    /// Custom input PDF (or a .json table grid) instead of the bundled document
    input: Option<PathBuf>,

    /// Compare the last extraction output against correct.json
    #[arg(long, conflicts_with = "input")]
    test: bool,

    /// Output directory for extracted records
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Pages handed to the table extractor
    #[arg(long, default_value = config::DEFAULT_PAGES)]
    pages: String,

    /// Where attendance numbers sit relative to their labels
    #[arg(long, value_enum, default_value = "row-text")]
    layout: FieldLayout,

    /// camelot executable used for PDF table extraction
    #[arg(long, env = "PAYROLL_CAMELOT", default_value = config::DEFAULT_CAMELOT)]
    camelot: String,
}

fn main() -> ExitCode {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments; help and version are not failures
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };
    tracing::debug!("Starting processing for args: {:?}", args);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(AppError::Config(message)) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the run completed but should exit non-zero.
fn run(args: Args) -> Result<bool, AppError> {
    // 3. Resolve the document kind before touching the filesystem
    let Some(kind) = args.kind.as_deref() else {
        eprintln!("{}", Args::command().render_help());
        return Ok(false);
    };
    let kind: DocumentKind = kind.parse()?;

    let config = RunConfig {
        kind,
        input: args
            .input
            .unwrap_or_else(|| kind.default_input().to_path_buf()),
        output_dir: args.output_dir,
        pages: args.pages,
        layout: args.layout,
        camelot: args.camelot,
    };

    // 4. Test mode compares existing output with the reference file
    if args.test {
        return Ok(regression::run(&config)?);
    }

    // 5. Pull raw tables, falling back to the alternate mode once
    println!("\n{}\nRunning {} Parser...\n{}\n", RULE, capitalized(kind.as_str()), RULE);
    println!("PDF: {}\n{}", config.input.display(), RULE);

    let source = tables::source_for(&config.input, &config.camelot);
    let (raw_tables, mode) = tables::read_with_fallback(
        source.as_ref(),
        &config.input,
        &config.pages,
        kind.primary_mode(),
    )?;

    // 6. Build records and write them out
    match kind {
        DocumentKind::Attendance => {
            let records = AttendanceParser::new(config.layout).parse_tables(&raw_tables);
            save_outputs(&config, &records, mode, raw_tables.len())?;
            println!("\n{}\nExtracted {} employee records\n{}", RULE, records.len(), RULE);
            print_json(&records)?;
        }
        DocumentKind::Allowance => {
            let records = AllowanceParser::new().parse_tables(&raw_tables);
            if records.is_empty() {
                println!("\nNo data found");
                return Ok(true);
            }
            save_outputs(&config, &records, mode, raw_tables.len())?;
            println!(
                "\n{}\nComplete! {} records → {}/\n{}",
                RULE,
                records.len(),
                config.output_folder().display(),
                RULE
            );
            print_json(&records)?;
        }
    }

    Ok(true)
}

fn save_outputs<T: Serialize>(
    config: &RunConfig,
    records: &[T],
    mode: ExtractionMode,
    table_count: usize,
) -> Result<(), AppError> {
    let stem = config.kind.file_stem();
    let storage = StorageManager::new(config.output_folder())?;

    storage.save_json(records, &format!("{}.json", stem))?;
    storage.save_csv(records, &format!("{}.csv", stem))?;
    storage.save_markdown(records, &format!("{}.md", stem), config.kind.title())?;

    let metadata = RunMetadata {
        document_kind: config.kind.to_string(),
        source: config.input.display().to_string(),
        extraction_mode: mode.to_string(),
        table_count,
        record_count: records.len(),
        extraction_timestamp: Utc::now().to_rfc3339(),
    };
    match storage.save_run_metadata(&metadata, &format!("{}_meta.json", stem)) {
        Ok(path) => tracing::debug!("Saved run metadata to: {}", path.display()),
        Err(e) => tracing::error!("Failed to save run metadata: {}", e),
    }
    Ok(())
}

fn print_json<T: Serialize>(records: &[T]) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| utils::error::StorageError::SerializationError(e.to_string()))?;
    println!("\n{}\nJSON Output:\n{}\n{}", RULE, RULE, json);
    Ok(())
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
