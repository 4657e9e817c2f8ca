// src/extractors/fields.rs
//! Resolves a printed field label to its `{count, amount}` pair.
//!
//! Three layouts show up in the ledgers:
//!
//! * row text: each block row is one cell of the data column, the label and
//!   its numbers share a row (the primary path);
//! * a single merged cell holding every field of the block on separate lines;
//! * cell offsets: labels sit on their own rows and the numbers are a few
//!   rows above (or on) the label row in another column.
//!
//! The special-case labels are listed once in [`FIELD_RULES`] with one
//! handler per layout, so the exceptions stay in one auditable table.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extractors::records::CountAmount;
use crate::extractors::text::{
    extract_all_numbers, extract_count_from_spaced_garbage, extract_time_format,
    filter_label_numbers, is_spaced_digit_garbage, DEFAULT_MAX_LABEL,
};

pub const BASIC_SALARY_SPACED: &str = "基 本 給";
pub const BASIC_SALARY: &str = "基本給";
pub const GUARANTEED_OVERTIME: &str = "保障残業";
pub const RIDE_ALLOWANCE: &str = "乗車手当";
pub const SAGAWA_PREMIUM: &str = "佐川割増手当";
pub const DOUBLE_ALLOWANCE: &str = "ダブル手当";
pub const TEMPORARY_ALLOWANCE: &str = "臨時手当";
pub const NIGHT_ALLOWANCE: &str = "夜勤手当";
pub const HOLIDAY_ALLOWANCE: &str = "休日手当";
pub const LONG_DISTANCE_ALLOWANCE: &str = "長距離手当";
pub const OTHER_ALLOWANCE: &str = "その他";
pub const TOTAL: &str = "計";
pub const WORKING_HOURS: &str = "稼働時間";

/// Pay per holiday worked; the holiday count is derived from the amount.
pub const HOLIDAY_DAY_RATE: u64 = 2600;

/// Every label that can start a field in a merged cell.
pub const KNOWN_LABELS: [&str; 13] = [
    BASIC_SALARY_SPACED,
    BASIC_SALARY,
    GUARANTEED_OVERTIME,
    RIDE_ALLOWANCE,
    SAGAWA_PREMIUM,
    DOUBLE_ALLOWANCE,
    TEMPORARY_ALLOWANCE,
    NIGHT_ALLOWANCE,
    HOLIDAY_ALLOWANCE,
    LONG_DISTANCE_ALLOWANCE,
    OTHER_ALLOWANCE,
    TOTAL,
    WORKING_HOURS,
];

const GENERAL_OFFSETS: [isize; 4] = [-2, -1, -3, 0];
const PRECEDING_OFFSETS: [isize; 3] = [-2, -1, -3];
const ATTENDANCE_LOOKBACK: usize = 15;
const WORKING_HOURS_LOOKBACK: usize = 20;

// A row ending in "0 0" means the long-distance pair printed as zeros.
static TRAILING_ZERO_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b0\s+0\s*$").expect("Failed to compile TRAILING_ZERO_PAIR_RE")
});

/// The row holding a label, plus the row right above it.
pub struct LabelRow<'a> {
    pub text: &'a str,
    pub previous: Option<&'a str>,
}

/// Numbers of a cell once spaced-digit garbage lines are set aside.
struct CleanedNumbers {
    numbers: Vec<u64>,
    recovered_count: Option<u64>,
}

fn clean_numbers(text: &str) -> CleanedNumbers {
    let mut recovered_count = None;
    let mut clean_lines = Vec::new();
    for line in text.split('\n') {
        if is_spaced_digit_garbage(line) {
            if let Some(count) = extract_count_from_spaced_garbage(line) {
                recovered_count = Some(count);
            }
        } else {
            clean_lines.push(line);
        }
    }
    CleanedNumbers {
        numbers: extract_all_numbers(&clean_lines.join("\n")),
        recovered_count,
    }
}

/// Last two numbers as count/amount, a lone number as the amount.
fn last_two(numbers: &[u64]) -> CountAmount {
    match numbers {
        [] => CountAmount::ZERO,
        [amount] => CountAmount::new(0, *amount),
        [.., count, amount] => CountAmount::new(*count, *amount),
    }
}

fn is_zero_row(numbers: &[u64]) -> bool {
    numbers.is_empty() || (numbers.len() <= 2 && numbers.iter().all(|n| *n == 0))
}

fn holiday_from_amount(amount: u64) -> CountAmount {
    CountAmount::new(amount / HOLIDAY_DAY_RATE, amount)
}

// --- Row-text handlers ---

fn long_distance_from_row(row: &LabelRow<'_>) -> CountAmount {
    if row.previous.is_some_and(|prev| TRAILING_ZERO_PAIR_RE.is_match(prev)) {
        return CountAmount::ZERO;
    }
    let cleaned = clean_numbers(row.text);
    match cleaned.numbers.as_slice() {
        nums if is_zero_row(nums) => CountAmount::ZERO,
        [amount] => CountAmount::new(cleaned.recovered_count.unwrap_or(0), *amount),
        nums => last_two(nums),
    }
}

fn other_from_row(row: &LabelRow<'_>) -> CountAmount {
    let cleaned = clean_numbers(row.text);
    if is_zero_row(&cleaned.numbers) {
        return CountAmount::ZERO;
    }
    last_two(&cleaned.numbers)
}

fn holiday_from_row(row: &LabelRow<'_>) -> CountAmount {
    clean_numbers(row.text)
        .numbers
        .last()
        .map(|amount| holiday_from_amount(*amount))
        .unwrap_or(CountAmount::ZERO)
}

fn generic_from_row(row: &LabelRow<'_>) -> CountAmount {
    last_two(&clean_numbers(row.text).numbers)
}

// --- Cell-offset handlers ---

fn long_distance_from_cells(cells: &CellOffsetExtractor<'_>, label_idx: usize) -> CountAmount {
    if cells
        .row_at(label_idx, -1)
        .is_some_and(|prev| TRAILING_ZERO_PAIR_RE.is_match(prev))
    {
        return CountAmount::ZERO;
    }
    cells
        .first_with_pair(label_idx, &PRECEDING_OFFSETS)
        .map(|nums| last_two(&nums))
        .unwrap_or(CountAmount::ZERO)
}

fn other_from_cells(cells: &CellOffsetExtractor<'_>, label_idx: usize) -> CountAmount {
    let nums = cells
        .row_at(label_idx, -2)
        .map(CellOffsetExtractor::filtered_numbers)
        .unwrap_or_default();
    CountAmount::new(
        nums.first().copied().unwrap_or(0),
        nums.get(1).copied().unwrap_or(0),
    )
}

fn holiday_from_cells(cells: &CellOffsetExtractor<'_>, label_idx: usize) -> CountAmount {
    cells
        .first_with_pair(label_idx, &PRECEDING_OFFSETS)
        .map(|nums| holiday_from_amount(nums[1]))
        .unwrap_or(CountAmount::ZERO)
}

fn generic_from_cells(cells: &CellOffsetExtractor<'_>, label_idx: usize) -> CountAmount {
    cells
        .first_with_pair(label_idx, &GENERAL_OFFSETS)
        .map(|nums| CountAmount::new(nums[0], nums[1]))
        .unwrap_or(CountAmount::ZERO)
}

/// A label that needs its own handling, with one handler per layout.
pub struct FieldRule {
    pub label: &'static str,
    pub from_row: fn(&LabelRow<'_>) -> CountAmount,
    pub from_cells: fn(&CellOffsetExtractor<'_>, usize) -> CountAmount,
}

/// Evaluated in order; labels not listed use the generic handlers.
pub static FIELD_RULES: [FieldRule; 3] = [
    FieldRule {
        label: LONG_DISTANCE_ALLOWANCE,
        from_row: long_distance_from_row,
        from_cells: long_distance_from_cells,
    },
    FieldRule {
        label: OTHER_ALLOWANCE,
        from_row: other_from_row,
        from_cells: other_from_cells,
    },
    FieldRule {
        label: HOLIDAY_ALLOWANCE,
        from_row: holiday_from_row,
        from_cells: holiday_from_cells,
    },
];

fn rule_for(label: &str) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|rule| rule.label == label)
}

fn resolve_row(row: &LabelRow<'_>, label: &str) -> CountAmount {
    match rule_for(label) {
        Some(rule) => (rule.from_row)(row),
        None => generic_from_row(row),
    }
}

/// Row-text path: the first block row containing `label` holds its numbers.
pub fn extract_from_rows(rows: &[&str], label: &str) -> CountAmount {
    let Some(idx) = rows.iter().position(|row| row.contains(label)) else {
        tracing::trace!("Label '{}' not found in {} rows", label, rows.len());
        return CountAmount::ZERO;
    };

    let row = LabelRow {
        text: rows[idx],
        previous: idx.checked_sub(1).map(|prev| rows[prev]),
    };
    resolve_row(&row, label)
}

/// Tries each rendering of a label in turn; the first non-zero result wins.
pub fn extract_from_rows_any(rows: &[&str], labels: &[&str]) -> CountAmount {
    labels
        .iter()
        .map(|label| extract_from_rows(rows, label))
        .find(|value| !value.is_zero())
        .unwrap_or(CountAmount::ZERO)
}

/// Merged-cell path: the label line alone when it carries numbers, otherwise
/// the label line and the lines after it up to the next known label. The
/// selected text then goes through the same handlers as a block row.
pub fn extract_from_combined(text: &str, label: &str) -> CountAmount {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(label_idx) = lines.iter().position(|line| line.contains(label)) else {
        return CountAmount::ZERO;
    };

    let segment = if extract_all_numbers(lines[label_idx]).is_empty() {
        let following = lines[label_idx + 1..]
            .iter()
            .take_while(|line| {
                let line = line.trim();
                !KNOWN_LABELS
                    .iter()
                    .any(|other| *other != label && line.contains(other))
            })
            .copied();
        std::iter::once(lines[label_idx])
            .chain(following)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        lines[label_idx].to_string()
    };

    let row = LabelRow {
        text: &segment,
        previous: label_idx.checked_sub(1).map(|prev| lines[prev]),
    };
    resolve_row(&row, label)
}

/// Merged-cell variant of [`extract_from_rows_any`].
pub fn extract_from_combined_any(text: &str, labels: &[&str]) -> CountAmount {
    labels
        .iter()
        .map(|label| extract_from_combined(text, label))
        .find(|value| !value.is_zero())
        .unwrap_or(CountAmount::ZERO)
}

/// Cell-offset path over one data column of a table.
pub struct CellOffsetExtractor<'a> {
    data: &'a [&'a str],
}

impl<'a> CellOffsetExtractor<'a> {
    pub fn new(data: &'a [&'a str]) -> Self {
        Self { data }
    }

    fn row_at(&self, label_idx: usize, offset: isize) -> Option<&'a str> {
        let idx = label_idx.checked_add_signed(offset)?;
        self.data.get(idx).copied()
    }

    fn filtered_numbers(text: &str) -> Vec<u64> {
        filter_label_numbers(&extract_all_numbers(text), DEFAULT_MAX_LABEL)
    }

    /// Filtered numbers of the first offset row carrying at least two of them.
    fn first_with_pair(&self, label_idx: usize, offsets: &[isize]) -> Option<Vec<u64>> {
        offsets
            .iter()
            .filter_map(|offset| self.row_at(label_idx, *offset))
            .map(Self::filtered_numbers)
            .find(|nums| nums.len() >= 2)
    }

    pub fn extract(&self, label: &str, label_idx: usize) -> CountAmount {
        match rule_for(label) {
            Some(rule) => (rule.from_cells)(self, label_idx),
            None => generic_from_cells(self, label_idx),
        }
    }

    /// Working and rest days, searched upwards from the block start.
    pub fn attendance_days(&self, start_idx: usize) -> (u64, u64) {
        (0..ATTENDANCE_LOOKBACK)
            .map_while(|offset| start_idx.checked_sub(offset))
            .filter_map(|idx| self.data.get(idx))
            .map(|text| Self::filtered_numbers(text))
            .find(|nums| nums.len() >= 2)
            .map(|nums| (nums[0], nums[1]))
            .unwrap_or((0, 0))
    }

    /// `H:MM` working time, searched upwards from the block start.
    pub fn working_hours(&self, start_idx: usize) -> Option<String> {
        (0..WORKING_HOURS_LOOKBACK)
            .map_while(|offset| start_idx.checked_sub(offset))
            .filter_map(|idx| self.data.get(idx))
            .find_map(|text| extract_time_format(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generic_two_numbers_in_order() {
        let rows = ["出勤\n22", "乗車手当\n12\n36000", "計\n250000"];
        assert_eq!(extract_from_rows(&rows, RIDE_ALLOWANCE), CountAmount::new(12, 36000));
    }

    #[test]
    fn test_generic_takes_last_two() {
        let rows = ["夜勤手当 3\n5\n15,000"];
        assert_eq!(extract_from_rows(&rows, NIGHT_ALLOWANCE), CountAmount::new(5, 15000));
    }

    #[test]
    fn test_generic_single_number_is_amount() {
        let rows = ["計\n250,000"];
        assert_eq!(extract_from_rows(&rows, TOTAL), CountAmount::new(0, 250000));
    }

    #[test]
    fn test_missing_label_defaults_to_zero() {
        let rows = ["基本給\n22\n185000"];
        assert_eq!(extract_from_rows(&rows, DOUBLE_ALLOWANCE), CountAmount::ZERO);
        assert_eq!(extract_from_rows(&[], DOUBLE_ALLOWANCE), CountAmount::ZERO);
    }

    #[test]
    fn test_label_at_end_of_cell() {
        let rows = ["3\n9000\n臨時手当"];
        assert_eq!(extract_from_rows(&rows, TEMPORARY_ALLOWANCE), CountAmount::new(3, 9000));
    }

    #[test]
    fn test_long_distance_garbage_line_removed() {
        let rows = ["長距離手当\n1 0 0\n5000"];
        assert_eq!(
            extract_from_rows(&rows, LONG_DISTANCE_ALLOWANCE),
            CountAmount::new(0, 5000)
        );
    }

    #[test]
    fn test_long_distance_recovers_count_from_garbage() {
        let rows = ["長距離手当\n1 8 0\n24000"];
        assert_eq!(
            extract_from_rows(&rows, LONG_DISTANCE_ALLOWANCE),
            CountAmount::new(8, 24000)
        );
    }

    #[test]
    fn test_long_distance_zero_pair_on_previous_row() {
        let rows = ["夜勤手当\n0 0", "長距離手当\n2\n6000"];
        assert_eq!(extract_from_rows(&rows, LONG_DISTANCE_ALLOWANCE), CountAmount::ZERO);
    }

    #[test]
    fn test_long_distance_all_zero_collapses() {
        let rows = ["長距離手当\n0\n0"];
        assert_eq!(extract_from_rows(&rows, LONG_DISTANCE_ALLOWANCE), CountAmount::ZERO);
    }

    #[test]
    fn test_other_zero_collapse_and_last_two() {
        assert_eq!(extract_from_rows(&["その他\n0"], OTHER_ALLOWANCE), CountAmount::ZERO);
        assert_eq!(
            extract_from_rows(&["その他\n1\n2\n3000"], OTHER_ALLOWANCE),
            CountAmount::new(2, 3000)
        );
        // no "0 0" short-circuit for this label
        assert_eq!(
            extract_from_rows(&["x\n0 0", "その他\n4000"], OTHER_ALLOWANCE),
            CountAmount::new(0, 4000)
        );
    }

    #[test]
    fn test_holiday_count_from_amount() {
        assert_eq!(
            extract_from_rows(&["休日手当\n7800"], HOLIDAY_ALLOWANCE),
            CountAmount::new(3, 7800)
        );
        assert_eq!(extract_from_rows(&["休日手当"], HOLIDAY_ALLOWANCE), CountAmount::ZERO);
        for amount in [0u64, 2599, 2600, 13000, 13001] {
            let text = format!("休日手当\n9\n{amount}");
            let value = extract_from_rows(&[text.as_str()], HOLIDAY_ALLOWANCE);
            assert_eq!(value.count, value.amount / HOLIDAY_DAY_RATE);
            assert_eq!(value.amount, amount);
        }
    }

    #[test]
    fn test_basic_salary_retries_unspaced_label() {
        let rows = ["基本給\n22\n185000"];
        assert_eq!(
            extract_from_rows_any(&rows, &[BASIC_SALARY_SPACED, BASIC_SALARY]),
            CountAmount::new(22, 185000)
        );
        let spaced = ["基 本 給\n20\n170000"];
        assert_eq!(
            extract_from_rows_any(&spaced, &[BASIC_SALARY_SPACED, BASIC_SALARY]),
            CountAmount::new(20, 170000)
        );
    }

    #[test]
    fn test_combined_cell_reads_until_next_label() {
        let text = "基本給\n22\n185000\n保障残業\n10\n30000\n計\n215000";
        assert_eq!(extract_from_combined(text, BASIC_SALARY), CountAmount::new(22, 185000));
        assert_eq!(extract_from_combined(text, GUARANTEED_OVERTIME), CountAmount::new(10, 30000));
        assert_eq!(extract_from_combined(text, TOTAL), CountAmount::new(0, 215000));
        assert_eq!(extract_from_combined(text, NIGHT_ALLOWANCE), CountAmount::ZERO);
    }

    #[test]
    fn test_combined_cell_applies_special_rules() {
        let text = "夜勤手当\n2\n6000\n休日手当\n5200\n長距離手当\n1 0 0\n5000";
        assert_eq!(extract_from_combined(text, HOLIDAY_ALLOWANCE), CountAmount::new(2, 5200));
        assert_eq!(
            extract_from_combined(text, LONG_DISTANCE_ALLOWANCE),
            CountAmount::new(0, 5000)
        );
    }

    #[test]
    fn test_combined_cell_numbers_on_label_line() {
        let text = "乗車手当 12回 36,000\nその他";
        assert_eq!(extract_from_combined(text, RIDE_ALLOWANCE), CountAmount::new(12, 36000));
    }

    #[test]
    fn test_cell_offsets_prefer_two_rows_above() {
        let data = ["", "22\n185000\n9000", "300\n9000", "基本給"];
        let cells = CellOffsetExtractor::new(&data);
        // label-2 wins over label-1; 22 is dropped as a row label
        assert_eq!(cells.extract(BASIC_SALARY, 3), CountAmount::new(185000, 9000));
    }

    #[test]
    fn test_cell_offsets_filter_label_numbers() {
        let data = ["12\n120\n185000", "", "保障残業"];
        let cells = CellOffsetExtractor::new(&data);
        assert_eq!(cells.extract(GUARANTEED_OVERTIME, 2), CountAmount::new(120, 185000));
    }

    #[test]
    fn test_cell_offsets_out_of_range_rows_skipped() {
        let data = ["乗車手当", "100\n200"];
        let cells = CellOffsetExtractor::new(&data);
        assert_eq!(cells.extract(RIDE_ALLOWANCE, 0), CountAmount::ZERO);
        assert_eq!(cells.extract(RIDE_ALLOWANCE, 1), CountAmount::new(100, 200));
    }

    #[test]
    fn test_cell_offsets_long_distance() {
        let zero = ["1000\n2000", "x 0 0", "長距離手当"];
        assert_eq!(
            CellOffsetExtractor::new(&zero).extract(LONG_DISTANCE_ALLOWANCE, 2),
            CountAmount::ZERO
        );
        let data = ["", "60\n70\n8000", "", "長距離手当"];
        assert_eq!(
            CellOffsetExtractor::new(&data).extract(LONG_DISTANCE_ALLOWANCE, 3),
            CountAmount::new(70, 8000)
        );
    }

    #[test]
    fn test_cell_offsets_holiday_keeps_rate_invariant() {
        let data = ["", "60\n7800", "", "休日手当"];
        let value = CellOffsetExtractor::new(&data).extract(HOLIDAY_ALLOWANCE, 3);
        assert_eq!(value, CountAmount::new(3, 7800));
    }

    #[test]
    fn test_cell_offsets_other_partial_row() {
        let data = ["4500", "", "その他"];
        assert_eq!(
            CellOffsetExtractor::new(&data).extract(OTHER_ALLOWANCE, 2),
            CountAmount::new(4500, 0)
        );
    }

    #[test]
    fn test_attendance_days_and_hours_search_upwards() {
        let data = ["稼働時間 8:30", "", "出勤\n60\n公休\n55", "", "123456"];
        let cells = CellOffsetExtractor::new(&data);
        assert_eq!(cells.attendance_days(4), (60, 55));
        assert_eq!(cells.working_hours(4), Some("8:30".to_string()));
        assert_eq!(cells.attendance_days(1), (0, 0));
    }
}
