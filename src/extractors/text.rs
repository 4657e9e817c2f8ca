// src/extractors/text.rs
//! Low-level cell cleaning, number extraction and pattern classifiers shared
//! by both pipelines.

use once_cell::sync::Lazy;
use regex::Regex;

/// Numbers at or below this are row/table labels rather than data.
pub const DEFAULT_MAX_LABEL: u64 = 50;

/// Glyphs the documents use for "no data".
const PLACEHOLDERS: [&str; 3] = ["-", "―", "－"];

static DIGIT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("Failed to compile DIGIT_RUN_RE"));

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9.]+").expect("Failed to compile NUMBER_RE"));

static EMPLOYEE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("Failed to compile EMPLOYEE_ID_RE"));

static JAPANESE_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{4e00}-\u{9fff}\u{3040}-\u{309f}\u{30a0}-\u{30ff}]{2,}")
        .expect("Failed to compile JAPANESE_RUN_RE")
});

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{1,2}:[0-9]{2}").expect("Failed to compile TIME_RE"));

// Monthly totals run past 99 hours, so the hour part is unbounded here.
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+:[0-9]+").expect("Failed to compile DURATION_RE"));

pub fn clean_text(cell: &str) -> String {
    cell.trim().to_string()
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| *c != ',' && *c != ' ').collect()
}

/// First number in the cell as text, thousands separators removed.
pub fn clean_number(cell: &str) -> String {
    let stripped = strip_separators(cell.trim());
    NUMBER_RE
        .find(&stripped)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Every digit run in order of appearance.
///
/// Commas and spaces are removed first, so `"1 0 0"` reads as `100`;
/// callers that care about spaced-digit garbage must drop those lines before
/// calling this.
pub fn extract_all_numbers(text: &str) -> Vec<u64> {
    if text.is_empty() {
        return Vec::new();
    }
    let stripped = strip_separators(text);
    DIGIT_RUN_RE
        .find_iter(&stripped)
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .collect()
}

pub fn filter_label_numbers(numbers: &[u64], max_label: u64) -> Vec<u64> {
    numbers.iter().copied().filter(|n| *n > max_label).collect()
}

pub fn is_employee_id(text: &str) -> bool {
    EMPLOYEE_ID_RE.is_match(text.trim())
}

pub fn is_japanese_name(text: &str) -> bool {
    JAPANESE_RUN_RE.is_match(text.trim())
}

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || PLACEHOLDERS.contains(&value)
}

/// True for OCR lines like `"1 0 0"` or `"1 8 0"`: a number split into
/// separate one- or two-digit tokens.
pub fn is_spaced_digit_garbage(text: &str) -> bool {
    let parts: Vec<&str> = text.split_whitespace().collect();
    parts.len() >= 2
        && parts
            .iter()
            .all(|p| p.len() <= 2 && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Recovers the count hidden in an `X count 0` garbage line (`X` is 0 or 1).
pub fn extract_count_from_spaced_garbage(text: &str) -> Option<u64> {
    let digits: Vec<u64> = text
        .split_whitespace()
        .filter_map(|p| p.parse::<u64>().ok())
        .collect();

    if digits.len() >= 3 && digits[digits.len() - 1] == 0 && digits[0] <= 1 && digits[1] > 0 {
        Some(digits[1])
    } else {
        None
    }
}

pub fn extract_time_format(text: &str) -> Option<String> {
    TIME_RE.find(text).map(|m| m.as_str().to_string())
}

pub fn extract_duration(text: &str) -> Option<String> {
    DURATION_RE.find(text).map(|m| m.as_str().to_string())
}
