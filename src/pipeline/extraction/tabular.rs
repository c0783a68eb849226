//! Tabular extraction: table detection, header mapping, row conversion.
//!
//! One sheet may contain several independent tables separated by blank
//! rows; each detected table yields its own raw items. Header cells are
//! mapped through the fuzzy alias table; when too few columns match, the
//! table is handed to the text-to-entities capability instead of guessing.

use std::collections::BTreeMap;

use crate::capabilities::SheetData;
use crate::models::{Provenance, RawBudget, RawItem, SourceKind};

use super::aliases::{resolve_column, CanonicalColumn};

/// One table detected inside a sheet.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    pub sheet: String,
    /// Absolute index of the header row within the sheet.
    pub header_row: usize,
    pub header: Vec<String>,
    /// Data rows with their absolute sheet row indices.
    pub rows: Vec<(usize, Vec<String>)>,
}

/// Result of mapping a header through the alias table.
#[derive(Debug, Clone)]
pub struct HeaderMapping {
    /// Column index → canonical field.
    pub columns: BTreeMap<usize, CanonicalColumn>,
    /// Share of non-empty header cells that resolved.
    pub match_ratio: f32,
}

/// Split a sheet into independent tables on runs of blank rows.
/// Blocks with fewer than two rows (header + at least one data row) are
/// dropped.
pub fn split_tables(sheet: &SheetData) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut block: Vec<(usize, &Vec<String>)> = Vec::new();

    let mut flush = |block: &mut Vec<(usize, &Vec<String>)>| {
        if block.len() >= 2 {
            if let Some(table) = block_to_table(&sheet.name, block) {
                tables.push(table);
            }
        }
        block.clear();
    };

    for (idx, row) in sheet.rows.iter().enumerate() {
        if row_is_blank(row) {
            flush(&mut block);
        } else {
            block.push((idx, row));
        }
    }
    flush(&mut block);
    tables
}

fn row_is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn block_to_table(sheet: &str, block: &[(usize, &Vec<String>)]) -> Option<DetectedTable> {
    let (header_pos, header) = block
        .iter()
        .take(3)
        .find(|(_, row)| looks_like_header(row))?;

    let rows = block
        .iter()
        .skip_while(|(idx, _)| idx != header_pos)
        .skip(1)
        .map(|(idx, row)| (*idx, (*row).clone()))
        .collect::<Vec<_>>();
    if rows.is_empty() {
        return None;
    }

    Some(DetectedTable {
        sheet: sheet.to_string(),
        header_row: *header_pos,
        header: (*header).clone(),
        rows,
    })
}

/// A header row has at least two non-empty cells, the majority of them
/// non-numeric.
fn looks_like_header(row: &[String]) -> bool {
    let filled: Vec<&String> = row.iter().filter(|c| !c.trim().is_empty()).collect();
    if filled.len() < 2 {
        return false;
    }
    let numeric = filled
        .iter()
        .filter(|c| c.trim().parse::<f64>().is_ok())
        .count();
    numeric * 2 < filled.len()
}

/// Map header cells through the alias table.
pub fn map_header(header: &[String]) -> HeaderMapping {
    let mut columns = BTreeMap::new();
    let mut filled = 0usize;
    for (idx, cell) in header.iter().enumerate() {
        if cell.trim().is_empty() {
            continue;
        }
        filled += 1;
        if let Some(col) = resolve_column(cell) {
            // First column wins per canonical field.
            if !columns.values().any(|c| *c == col) {
                columns.insert(idx, col);
            }
        }
    }
    let match_ratio = if filled == 0 {
        0.0
    } else {
        columns.len() as f32 / filled as f32
    };
    HeaderMapping {
        columns,
        match_ratio,
    }
}

/// Convert a mapped table's rows into raw items. Rows with no usable
/// signal are skipped.
pub fn rows_to_items(
    table: &DetectedTable,
    mapping: &HeaderMapping,
    source_name: &str,
) -> Vec<RawItem> {
    table
        .rows
        .iter()
        .filter_map(|(row_idx, cells)| {
            let item = row_to_item(table, mapping, cells, *row_idx, source_name);
            if item.is_empty() {
                None
            } else {
                Some(item)
            }
        })
        .collect()
}

fn row_to_item(
    table: &DetectedTable,
    mapping: &HeaderMapping,
    cells: &[String],
    row_idx: usize,
    source_name: &str,
) -> RawItem {
    let mut item = RawItem {
        provenance: Provenance {
            source_kind: SourceKind::TabularRow,
            source_name: source_name.to_string(),
            page: None,
            row: Some(row_idx),
            original_text: None,
        },
        ..RawItem::default()
    };

    for (col_idx, cell) in cells.iter().enumerate() {
        let value = cell.trim();
        if value.is_empty() {
            continue;
        }
        match mapping.columns.get(&col_idx) {
            Some(CanonicalColumn::Name) => item.name = Some(value.to_string()),
            Some(CanonicalColumn::Description) => item.description = Some(value.to_string()),
            Some(CanonicalColumn::RawType) => item.raw_type = Some(value.to_string()),
            Some(CanonicalColumn::RawStatus) => item.raw_status = Some(value.to_string()),
            Some(CanonicalColumn::RawPriority) => item.raw_priority = Some(value.to_string()),
            Some(CanonicalColumn::Budget) => {
                item.budget = Some(RawBudget::Text(value.to_string()))
            }
            Some(CanonicalColumn::StartDate) => item.start_date = Some(value.to_string()),
            Some(CanonicalColumn::EndDate) => item.end_date = Some(value.to_string()),
            Some(CanonicalColumn::Technologies) => item.technologies = split_list(value),
            Some(CanonicalColumn::Dependencies) => item.dependencies = split_list(value),
            Some(CanonicalColumn::Risks) => item.risks = split_list(value),
            Some(CanonicalColumn::Owner) => item.owner = Some(value.to_string()),
            None => {
                let key = table
                    .header
                    .get(col_idx)
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .unwrap_or_else(|| format!("column_{col_idx}"));
                item.extra.insert(key, value.to_string());
            }
        }
    }
    item
}

/// Split a multi-value cell on the separators spreadsheets actually use.
fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';', '\n'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Render a table as plain text for the capability-backed fallback path.
pub fn table_as_text(table: &DetectedTable) -> String {
    let mut out = String::new();
    out.push_str(&table.header.join(" | "));
    out.push('\n');
    for (_, row) in &table.rows {
        out.push_str(&row.join(" | "));
        out.push('\n');
    }
    out
}
