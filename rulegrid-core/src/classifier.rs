//! Column classification: decide, once per block, which column identifies
//! the configuration variant (key) and which columns carry Y/N compatibility
//! flags (attributes). Every other column is ignored.

use crate::header::locate_header;
use crate::types::{ClassifiedColumn, ClassifiedTable, ColumnRole, SkipReason, TableBlock};
use std::collections::HashSet;

/// Columns with more than this share of empty values never become the key.
const KEY_MAX_EMPTY_RATIO: f64 = 0.5;
const KEY_WEIGHT_UNIQUENESS: f64 = 0.7;
const KEY_WEIGHT_BREVITY: f64 = 0.3;
/// How many leading data rows the attribute detector samples.
const ATTRIBUTE_SAMPLE_ROWS: usize = 10;

/// Classify a block's columns. Uses the block's resolved header row, locating
/// one first if the segmenter's caller has not.
///
/// Returns `MissingKeyColumn` when no column passes the key filter. Attribute
/// columns may legitimately be empty; whether that skips the block depends
/// on the synthesis strategy, so the caller decides.
pub fn classify_columns(block: &TableBlock) -> Result<ClassifiedTable, SkipReason> {
    let header = block.header_row.unwrap_or_else(|| locate_header(&block.rows));
    let header_cells = &block.rows[header];

    let names: Vec<String> = header_cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.value.render().trim().to_string();
            if name.is_empty() {
                format!("column_{i}")
            } else {
                name
            }
        })
        .collect();
    let width = names.len();

    // Data rows rendered to trimmed strings, padded to the header width.
    let rows: Vec<Vec<String>> = block.rows[header + 1..]
        .iter()
        .map(|row| {
            (0..width)
                .map(|c| {
                    row.get(c)
                        .map(|cell| cell.value.render().trim().to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let key = select_key_column(&rows, width).ok_or(SkipReason::MissingKeyColumn)?;

    let columns: Vec<ClassifiedColumn> = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| {
            let role = if index == key {
                ColumnRole::Key
            } else if is_attribute_column(&rows, index) {
                ColumnRole::Attribute
            } else {
                ColumnRole::Ignored
            };
            ClassifiedColumn { index, name, role }
        })
        .collect();

    Ok(ClassifiedTable { columns, key, rows })
}

/// Score candidate key columns: `0.7 * uniqueness + 0.3 * (1 - normalized
/// average value length)`. Short, highly distinguishing values (size codes)
/// beat long descriptive text. Ties resolve to the lowest column index.
fn select_key_column(rows: &[Vec<String>], width: usize) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }
    let row_count = rows.len();

    struct Candidate {
        index: usize,
        uniqueness: f64,
        avg_len: f64,
    }

    let mut candidates = Vec::new();
    for col in 0..width {
        let values: Vec<&str> = rows
            .iter()
            .map(|r| r[col].as_str())
            .filter(|v| !v.is_empty())
            .collect();
        let empty = row_count - values.len();
        if empty as f64 > KEY_MAX_EMPTY_RATIO * row_count as f64 {
            continue;
        }
        if values.is_empty() {
            continue;
        }
        // A pure flags column identifies nothing and is never a key candidate,
        // even when its two values happen to look highly distinct.
        if values
            .iter()
            .all(|v| v.eq_ignore_ascii_case("y") || v.eq_ignore_ascii_case("n"))
        {
            continue;
        }
        let distinct = values.iter().collect::<HashSet<_>>().len();
        let total_len: usize = values.iter().map(|v| v.chars().count()).sum();
        candidates.push(Candidate {
            index: col,
            uniqueness: distinct as f64 / row_count as f64,
            avg_len: total_len as f64 / values.len() as f64,
        });
    }

    let max_avg_len = candidates
        .iter()
        .map(|c| c.avg_len)
        .fold(0.0f64, f64::max);

    let mut best: Option<(usize, f64)> = None;
    for candidate in &candidates {
        let normalized_len = if max_avg_len > 0.0 {
            candidate.avg_len / max_avg_len
        } else {
            0.0
        };
        let score =
            KEY_WEIGHT_UNIQUENESS * candidate.uniqueness + KEY_WEIGHT_BREVITY * (1.0 - normalized_len);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate.index, score)),
        }
    }
    best.map(|(index, _)| index)
}

/// A column qualifies as an attribute when its sampled leading values
/// contain a literal Y or N (case-insensitive, trimmed). Purely numeric
/// columns never qualify.
fn is_attribute_column(rows: &[Vec<String>], col: usize) -> bool {
    rows.iter()
        .take(ATTRIBUTE_SAMPLE_ROWS)
        .map(|r| r[col].as_str())
        .any(|v| v.eq_ignore_ascii_case("y") || v.eq_ignore_ascii_case("n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, Row};

    fn block(rows: Vec<Vec<&str>>) -> TableBlock {
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|r| r.into_iter().map(Cell::text).collect())
            .collect();
        let mut block = TableBlock::new(0, rows).expect("non-empty block");
        block.header_row = Some(0);
        block
    }

    #[test]
    fn size_column_wins_over_descriptions() {
        let table = classify_columns(&block(vec![
            vec!["Size", "Description", "Flanged"],
            vec!["1\"", "Gate valve with extended bonnet", "Y"],
            vec!["2\"", "Gate valve with extended bonnet", "N"],
            vec!["3\"", "Ball valve full bore", "Y"],
        ]))
        .unwrap();
        assert_eq!(table.key, 0);
        assert_eq!(table.key_column().name, "Size");
        assert_eq!(table.attribute_indexes(), vec![2]);
        assert_eq!(table.columns[1].role, ColumnRole::Ignored);
    }

    #[test]
    fn mostly_empty_columns_are_not_key_candidates() {
        let table = classify_columns(&block(vec![
            vec!["Note", "Code", "Drilled"],
            vec!["", "A1", "Y"],
            vec!["rare remark", "A2", "N"],
            vec!["", "A3", "Y"],
            vec!["", "A4", "N"],
        ]))
        .unwrap();
        assert_eq!(table.key_column().name, "Code");
    }

    #[test]
    fn numeric_columns_never_become_attributes() {
        let table = classify_columns(&block(vec![
            vec!["Size", "Weight", "Coated"],
            vec!["1\"", "12", "Y"],
            vec!["2\"", "19", "N"],
        ]))
        .unwrap();
        assert_eq!(table.columns[1].role, ColumnRole::Ignored);
        assert_eq!(table.attribute_indexes(), vec![2]);
    }

    #[test]
    fn block_without_data_rows_has_no_key() {
        let err = classify_columns(&block(vec![vec!["Size", "Flanged"]])).unwrap_err();
        assert_eq!(err, SkipReason::MissingKeyColumn);
    }

    #[test]
    fn empty_header_names_get_positional_names() {
        let table = classify_columns(&block(vec![
            vec!["", "Flanged"],
            vec!["1\"", "Y"],
            vec!["2\"", "N"],
        ]))
        .unwrap();
        assert_eq!(table.key_column().name, "column_0");
    }

    #[test]
    fn short_rows_are_padded_to_header_width() {
        let table = classify_columns(&block(vec![
            vec!["Size", "A", "B"],
            vec!["1\"", "Y"],
        ]))
        .unwrap();
        assert_eq!(table.rows[0], vec!["1\"", "Y", ""]);
    }

    #[test]
    fn attribute_detection_samples_only_leading_rows() {
        let mut rows: Vec<Row> = vec![vec![Cell::text("Size"), Cell::text("Late")]];
        for i in 0..12 {
            rows.push(vec![Cell::text(format!("{i}\"")), Cell::text("x")]);
        }
        rows.push(vec![Cell::text("99\""), Cell::text("Y")]);
        let mut block = TableBlock::new(0, rows).expect("non-empty block");
        block.header_row = Some(0);
        let table = classify_columns(&block).unwrap();
        // The Y appears past the 10-row sample window.
        assert!(table.attribute_indexes().is_empty());
    }
}
