// src/extractors/allowance.rs
use crate::extractors::records::AllowanceRecord;
use crate::extractors::text::{
    clean_number, clean_text, is_employee_id, is_japanese_name, is_placeholder,
};
use crate::tables::RawTable;
use crate::utils::error::ExtractError;

/// Compact 37-column layout.
pub const COLUMNS_37: [&str; 37] = [
    "untenshu", "sagawa_a", "sagawa_b", "sagawa_ba", "sagawa_bb", "sagawa_bba",
    "sagawa_bbb", "sagawa_bbba", "rinji_teate", "chokyori_teate", "joshu",
    "ippan_a", "ippan_b", "ippan_ba", "ippan_bb", "ippan_bba", "ippan_bbb",
    "yontonsha_a", "yontonsha_b", "yontonsha_ba", "yontonsha_bb", "yontonsha_bba",
    "yontonsha_bbb", "yontonsha_bbba", "sagawa_ippan_b", "sagawa_ippan_ba",
    "sagawa_ippan_bb", "sagawa_ippan_bba", "juyon_yonhei_b", "juyon_yonhei_ba",
    "juyon_yonhei_bb", "juronton_yontonhei_bba", "lorry_a", "lorry_b",
    "lorry_ba", "lorry_bb", "gokei",
];

/// 44-column layout: some categories span two physical columns, so their
/// names repeat.
pub const COLUMNS_44: [&str; 44] = [
    "untenshu", "sagawa_a", "sagawa_b", "sagawa_ba", "sagawa_bb", "sagawa_bba",
    "sagawa_bbb", "sagawa_bbba", "rinji_teate", "chokyori_teate", "joshu",
    "ippan_a", "ippan_b", "ippan_b", "ippan_ba", "ippan_ba", "ippan_bb",
    "ippan_bb", "ippan_bba", "ippan_bbb", "yontonsha_a", "yontonsha_b",
    "yontonsha_b", "yontonsha_ba", "yontonsha_ba", "yontonsha_bb", "yontonsha_bba",
    "yontonsha_bbb", "yontonsha_bbba", "sagawa_ippan_b", "sagawa_ippan_ba",
    "sagawa_ippan_bb", "sagawa_ippan_bba", "juyon_yonhei_b", "juyon_yonhei_ba",
    "juyon_yonhei_bb", "juronton_yontonhei_bba", "lorry_a", "lorry_b",
    "lorry_b", "lorry_ba", "lorry_ba", "lorry_bb", "gokei",
];

const ALLOWANCE_KEYWORD: &str = "手当";

/// Field names by column position for a table `width` columns wide.
/// Unknown widths get the closest mapping, cut to the table width.
pub fn columns_for_width(width: usize) -> &'static [&'static str] {
    match width {
        37 => &COLUMNS_37[..],
        44 => &COLUMNS_44[..],
        w if w <= 37 => &COLUMNS_37[..w],
        w => &COLUMNS_44[..w.min(COLUMNS_44.len())],
    }
}

/// First row whose text carries the category letters (`A`, `B`, and `BA`
/// or an allowance heading).
pub fn find_header_row(table: &RawTable) -> Result<usize, ExtractError> {
    (0..table.row_count())
        .find(|idx| {
            let row_text = table
                .row(*idx)
                .iter()
                .map(|cell| clean_text(cell))
                .collect::<Vec<_>>()
                .join(" ");
            row_text.contains('A')
                && row_text.contains('B')
                && (row_text.contains("BA") || row_text.contains(ALLOWANCE_KEYWORD))
        })
        .ok_or(ExtractError::HeaderNotFound { page: table.page })
}

/// Copies the mapped cells of a row onto the record, never overwriting a
/// field that an earlier cell already set.
fn populate(record: &mut AllowanceRecord, row: &[String], columns: &[&str]) {
    for col in 1..row.len().min(columns.len()) {
        let value = clean_text(&row[col]);
        if is_placeholder(&value) {
            continue;
        }
        let field = columns[col];
        if record.contains(field) {
            continue;
        }
        let number = clean_number(&value);
        record.insert_if_absent(field, if number.is_empty() { value } else { number });
    }
}

/// Builds allowance records from the tables of one schedule.
#[derive(Debug, Default)]
pub struct AllowanceParser;

impl AllowanceParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_tables(&self, tables: &[RawTable]) -> Vec<AllowanceRecord> {
        let mut records = Vec::new();
        for (idx, table) in tables.iter().enumerate() {
            tracing::info!("Processing table {} from page {}...", idx + 1, table.page);
            match self.parse_table(table) {
                Ok(found) => records.extend(found),
                Err(e) => tracing::warn!("{}, skipping table", e),
            }
        }
        tracing::info!("Extracted {} employee records", records.len());
        records
    }

    pub fn parse_table(&self, table: &RawTable) -> Result<Vec<AllowanceRecord>, ExtractError> {
        let width = table.column_count();
        tracing::info!("Table shape: ({}, {})", table.row_count(), width);
        let columns = columns_for_width(width);
        tracing::debug!("Using {}-column mapping", columns.len());

        let header_idx = find_header_row(table)?;
        tracing::info!("Found header row at index {}", header_idx);

        let mut records = Vec::new();
        let mut current: Option<AllowanceRecord> = None;

        for idx in header_idx + 1..table.row_count() {
            let row = table.row(idx);
            let first_col = clean_text(table.cell(idx, 0));

            if is_employee_id(&first_col) {
                if let Some(done) = current.take() {
                    Self::flush(done, &mut records);
                }
                current = Some(AllowanceRecord::new(&first_col));
            } else if is_japanese_name(&first_col) {
                if let Some(record) = current.as_mut() {
                    record.set_shimei(&first_col);
                }
            }

            if let Some(record) = current.as_mut() {
                populate(record, row, columns);
            }
        }

        if let Some(done) = current.take() {
            Self::flush(done, &mut records);
        }
        Ok(records)
    }

    /// Only named employees are emitted.
    fn flush(record: AllowanceRecord, records: &mut Vec<AllowanceRecord>) {
        let Some(name) = record.shimei() else {
            tracing::debug!("  Dropping unnamed employee {}", record.shain_id());
            return;
        };
        tracing::info!("  Extracted: {} (ID: {})", name, record.shain_id());
        tracing::debug!("    {} fields: {:?}", record.len(), record.keys().collect::<Vec<_>>());
        records.push(record);
    }
}
