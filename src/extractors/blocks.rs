// src/extractors/blocks.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::tables::RawTable;

/// Only the leading cells of a row can carry the employee ID.
pub const ID_SEARCH_COLUMNS: [usize; 3] = [0, 1, 2];

/// Maximum rows one employee occupies; bounds the last block of a table.
pub const MAX_BLOCK_ROWS: usize = 14;

// Attendance-status words that share the ID cell with the name.
const STATUS_KEYWORDS: [&str; 8] = ["出勤", "公休", "有給", "欠勤", "遅刻", "早退", "運転手", "無欠"];

static ANCHOR_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{6})\b").expect("Failed to compile ANCHOR_ID_RE"));

// Romaji/katakana codes such as vehicle or route numbers.
static CODE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9ｱ-ﾝァ-ヶー]+$").expect("Failed to compile CODE_LINE_RE"));

static FULL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([一-龯ぁ-んァ-ヶー]+\s+[一-龯ぁ-んァ-ヶー]+)").expect("Failed to compile FULL_NAME_RE")
});

/// Rows `[start, end)` of one table attributed to one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmployeeBlock {
    pub start: usize,
    pub end: usize,
}

impl EmployeeBlock {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeIdentity {
    pub employee_id: String,
    pub name: String,
}

fn anchor_id(cell: &str) -> Option<&str> {
    ANCHOR_ID_RE
        .captures(cell)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rows where one of `id_columns` contains a standalone 6-digit number.
pub fn find_anchor_rows(table: &RawTable, id_columns: &[usize]) -> Vec<usize> {
    (0..table.row_count())
        .filter(|row| id_columns.iter().any(|col| anchor_id(table.cell(*row, *col)).is_some()))
        .collect()
}

/// Splits the table into one block per anchor row. Each block ends where the
/// next employee starts; the last one stops after [`MAX_BLOCK_ROWS`].
pub fn segment(table: &RawTable, id_columns: &[usize]) -> Vec<EmployeeBlock> {
    let anchors = find_anchor_rows(table, id_columns);
    anchors
        .iter()
        .enumerate()
        .map(|(i, start)| {
            let end = match anchors.get(i + 1) {
                Some(next) => *next,
                None => (start + MAX_BLOCK_ROWS).min(table.row_count()),
            };
            EmployeeBlock { start: *start, end }
        })
        .collect()
}

fn find_name(cell: &str) -> Option<String> {
    cell.split('\n')
        .map(str::trim)
        .filter(|line| !STATUS_KEYWORDS.contains(line) && !CODE_LINE_RE.is_match(line))
        .find_map(|line| FULL_NAME_RE.find(line).map(|m| m.as_str().trim().to_string()))
}

/// ID and name from the anchor row. `None` when no cell carries an ID; a
/// missing name is an empty string.
pub fn identify(table: &RawTable, row: usize, id_columns: &[usize]) -> Option<EmployeeIdentity> {
    id_columns.iter().find_map(|col| {
        let cell = table.cell(row, *col);
        anchor_id(cell).map(|id| EmployeeIdentity {
            employee_id: id.to_string(),
            name: find_name(cell).unwrap_or_default(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table_with_first_column(first: &[&str]) -> RawTable {
        RawTable::new(
            1,
            first
                .iter()
                .map(|cell| vec![cell.to_string(), String::new(), String::new()])
                .collect(),
        )
    }

    #[test]
    fn test_blocks_end_at_next_anchor() {
        let mut rows = vec![""; 40];
        rows[2] = "100001";
        rows[10] = "100002\n田中 太郎";
        rows[20] = "100003";
        let table = table_with_first_column(&rows);

        let blocks = segment(&table, &ID_SEARCH_COLUMNS);
        assert_eq!(
            blocks,
            vec![
                EmployeeBlock { start: 2, end: 10 },
                EmployeeBlock { start: 10, end: 20 },
                EmployeeBlock { start: 20, end: 34 },
            ]
        );
    }

    #[test]
    fn test_last_block_capped_by_table_end() {
        let mut rows = vec![""; 8];
        rows[3] = "100001";
        let table = table_with_first_column(&rows);
        assert_eq!(segment(&table, &ID_SEARCH_COLUMNS), vec![EmployeeBlock { start: 3, end: 8 }]);
    }

    #[test]
    fn test_blocks_sorted_and_disjoint() {
        let mut rows = vec!["メモ"; 60];
        for anchor in [0, 5, 6, 30, 50] {
            rows[anchor] = "200000";
        }
        let table = table_with_first_column(&rows);
        let blocks = segment(&table, &ID_SEARCH_COLUMNS);

        for pair in blocks.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert_eq!(pair[0].end, pair[1].start);
        }
        let last = blocks.last().unwrap();
        assert!(last.end <= last.start + MAX_BLOCK_ROWS);
    }

    #[test]
    fn test_anchor_only_in_first_three_cells() {
        let table = RawTable::new(
            1,
            vec![
                vec!["".into(), "".into(), "".into(), "123456".into()],
                vec!["".into(), "".into(), "No.123456".into(), "".into()],
                vec!["1234567".into()],
            ],
        );
        assert_eq!(find_anchor_rows(&table, &ID_SEARCH_COLUMNS), vec![1]);
    }

    #[test]
    fn test_excluded_column_is_not_an_anchor() {
        let table = RawTable::new(
            1,
            vec![
                vec!["888888\n高橋 次郎".into(), "".into()],
                vec!["".into(), "60\n185000".into()],
            ],
        );
        assert_eq!(find_anchor_rows(&table, &ID_SEARCH_COLUMNS), vec![0, 1]);
        assert_eq!(find_anchor_rows(&table, &[0, 2]), vec![0]);
        assert_eq!(identify(&table, 1, &[0, 2]), None);
    }

    #[test]
    fn test_identify_skips_status_and_code_lines() {
        let table = table_with_first_column(&["出勤\n123456\nABC12\nｱｲｳ\n運転手\n山田 花子\n公休"]);
        let identity = identify(&table, 0, &ID_SEARCH_COLUMNS).unwrap();
        assert_eq!(identity.employee_id, "123456");
        assert_eq!(identity.name, "山田 花子");
    }

    #[test]
    fn test_identify_without_name() {
        let table = table_with_first_column(&["123456\n出勤"]);
        let identity = identify(&table, 0, &ID_SEARCH_COLUMNS).unwrap();
        assert_eq!(identity.name, "");
        assert_eq!(identify(&table_with_first_column(&["no id"]), 0, &ID_SEARCH_COLUMNS), None);
    }
}
