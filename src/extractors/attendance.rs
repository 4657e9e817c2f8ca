// src/extractors/attendance.rs
use std::ops::RangeInclusive;

use crate::config::FieldLayout;
use crate::extractors::blocks::{self, EmployeeBlock, EmployeeIdentity, ID_SEARCH_COLUMNS};
use crate::extractors::fields::{
    self, CellOffsetExtractor, BASIC_SALARY, BASIC_SALARY_SPACED, DOUBLE_ALLOWANCE,
    GUARANTEED_OVERTIME, HOLIDAY_ALLOWANCE, LONG_DISTANCE_ALLOWANCE, NIGHT_ALLOWANCE,
    OTHER_ALLOWANCE, RIDE_ALLOWANCE, SAGAWA_PREMIUM, TEMPORARY_ALLOWANCE, TOTAL, WORKING_HOURS,
};
use crate::extractors::records::{AttendanceRecord, CountAmount};
use crate::extractors::text::extract_duration;
use crate::tables::RawTable;

/// Column holding the salary breakdown and attendance summary of each block.
pub const DATA_COLUMN: usize = 6;
/// Column holding the numbers in the cell-offset layout.
pub const VALUE_COLUMN: usize = 1;

const WORK_DAY_KEYWORD: &str = "出勤";
const REST_DAY_KEYWORD: &str = "公休";
const ATTENDANCE_LINE_CAP: usize = 25;
const WORKING_DAY_RANGE: RangeInclusive<u64> = 20..=31;
const MAX_REST_DAYS: u64 = 10;

/// How one block's fields are read, chosen per block from the configured layout.
enum BlockView<'a> {
    Rows(Vec<&'a str>),
    Merged(&'a str),
    Cells {
        labels: Vec<&'a str>,
        block: EmployeeBlock,
        cells: CellOffsetExtractor<'a>,
    },
}

impl BlockView<'_> {
    /// Resolves a field printed under any of `labels`; first non-zero wins.
    fn field(&self, labels: &[&str]) -> CountAmount {
        match self {
            BlockView::Rows(rows) => fields::extract_from_rows_any(rows, labels),
            BlockView::Merged(text) => fields::extract_from_combined_any(text, labels),
            BlockView::Cells { labels: label_column, block, cells } => labels
                .iter()
                .filter_map(|label| {
                    block
                        .rows()
                        .find(|idx| label_column[*idx].contains(label))
                        .map(|idx| cells.extract(label, idx))
                })
                .find(|value| !value.is_zero())
                .unwrap_or(CountAmount::ZERO),
        }
    }

    fn working_hours(&self) -> String {
        match self {
            BlockView::Rows(rows) => working_hours(rows),
            BlockView::Merged(text) => working_hours(&[*text]),
            BlockView::Cells { block, cells, .. } => {
                cells.working_hours(block.start).unwrap_or_default()
            }
        }
    }

    fn attendance_days(&self) -> (u64, u64) {
        match self {
            BlockView::Rows(rows) => attendance_days(&rows.join("\n")),
            BlockView::Merged(text) => attendance_days(text),
            BlockView::Cells { block, cells, .. } => cells.attendance_days(block.start),
        }
    }
}

/// First block row mentioning the working-hours label with an `H:MM` total.
pub fn working_hours(rows: &[&str]) -> String {
    rows.iter()
        .filter(|row| row.contains(WORKING_HOURS))
        .find_map(|row| extract_duration(row))
        .unwrap_or_default()
}

/// Working days and rest days from the attendance summary lines.
///
/// The day markers are followed by their totals: the first plausible
/// monthly count before the rest-day keyword is the working-day count, the
/// first small count after it is the rest-day count.
pub fn attendance_days(text: &str) -> (u64, u64) {
    let mut working_days = None;
    let mut seen_rest_keyword = false;

    for line in text.split('\n').take(ATTENDANCE_LINE_CAP) {
        let line = line.trim();
        if line == WORK_DAY_KEYWORD {
            continue;
        }
        if line == REST_DAY_KEYWORD {
            seen_rest_keyword = true;
            continue;
        }
        if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(num) = line.parse::<u64>() else { continue };

        if working_days.is_none() && !seen_rest_keyword && WORKING_DAY_RANGE.contains(&num) {
            working_days = Some(num);
        } else if seen_rest_keyword && num <= MAX_REST_DAYS {
            return (working_days.unwrap_or(0), num);
        }
    }
    (working_days.unwrap_or(0), 0)
}

/// Builds attendance records from the tables of one ledger.
pub struct AttendanceParser {
    layout: FieldLayout,
}

impl AttendanceParser {
    pub fn new(layout: FieldLayout) -> Self {
        Self { layout }
    }

    pub fn parse_tables(&self, tables: &[RawTable]) -> Vec<AttendanceRecord> {
        let mut records = Vec::new();
        for (idx, table) in tables.iter().enumerate() {
            tracing::info!(
                "Processing table {}/{}, shape: ({}, {})",
                idx + 1,
                tables.len(),
                table.row_count(),
                table.column_count()
            );
            records.extend(self.parse_table(table));
        }
        tracing::info!("Extracted {} employee records", records.len());
        records
    }

    /// Columns searched for employee IDs. The cell-offset layout keeps its
    /// amounts in the value column, so that column never anchors a block.
    fn id_columns(&self) -> Vec<usize> {
        match self.layout {
            FieldLayout::RowText => ID_SEARCH_COLUMNS.to_vec(),
            FieldLayout::CellOffset => ID_SEARCH_COLUMNS
                .iter()
                .copied()
                .filter(|col| *col != VALUE_COLUMN)
                .collect(),
        }
    }

    pub fn parse_table(&self, table: &RawTable) -> Vec<AttendanceRecord> {
        let id_columns = self.id_columns();
        let employee_blocks = blocks::segment(table, &id_columns);
        tracing::info!(
            "  Found {} employees at rows: {:?}",
            employee_blocks.len(),
            employee_blocks.iter().map(|b| b.start).collect::<Vec<_>>()
        );

        let mut records = Vec::with_capacity(employee_blocks.len());
        for block in employee_blocks {
            let Some(identity) = blocks::identify(table, block.start, &id_columns) else {
                tracing::debug!("    No employee ID in anchor row {}, skipping", block.start);
                continue;
            };
            tracing::info!("    Employee: {} - {}", identity.employee_id, identity.name);

            if table.column_count() <= DATA_COLUMN {
                tracing::debug!("    Table too narrow for salary data, skipping");
                continue;
            }
            records.push(self.assemble(table, block, identity));
        }
        records
    }

    fn view<'a>(
        &self,
        table: &'a RawTable,
        block: EmployeeBlock,
        data_column: &'a [&'a str],
    ) -> BlockView<'a> {
        match self.layout {
            FieldLayout::RowText => {
                let rows: Vec<&str> =
                    block.rows().map(|row| table.cell(row, DATA_COLUMN)).collect();
                if rows.len() == 1 {
                    BlockView::Merged(rows[0])
                } else {
                    BlockView::Rows(rows)
                }
            }
            FieldLayout::CellOffset => BlockView::Cells {
                labels: table.column(DATA_COLUMN),
                block,
                cells: CellOffsetExtractor::new(data_column),
            },
        }
    }

    fn assemble(
        &self,
        table: &RawTable,
        block: EmployeeBlock,
        identity: EmployeeIdentity,
    ) -> AttendanceRecord {
        let value_column = table.column(VALUE_COLUMN);
        let view = self.view(table, block, &value_column);
        let (shukkin, kokyu) = view.attendance_days();

        AttendanceRecord {
            employee_id: identity.employee_id,
            name: identity.name,
            shukkin: CountAmount::new(shukkin, 0),
            kokyu: CountAmount::new(kokyu, 0),
            kado_jikan: view.working_hours(),
            kihon_kyu: view.field(&[BASIC_SALARY_SPACED, BASIC_SALARY]),
            hosho_zangyo: view.field(&[GUARANTEED_OVERTIME]),
            josha_teate: view.field(&[RIDE_ALLOWANCE]),
            sagawa_warimashi_teate: view.field(&[SAGAWA_PREMIUM]),
            double_teate: view.field(&[DOUBLE_ALLOWANCE]),
            rinji_teate: view.field(&[TEMPORARY_ALLOWANCE]),
            yakin_teate: view.field(&[NIGHT_ALLOWANCE]),
            kyujitsu_teate: view.field(&[HOLIDAY_ALLOWANCE]),
            chokyori_teate: view.field(&[LONG_DISTANCE_ALLOWANCE]),
            sonota: view.field(&[OTHER_ALLOWANCE]),
            kei: view.field(&[TOTAL]).amount,
        }
    }
}
