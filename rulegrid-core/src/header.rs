//! Header location: score rows within a block to find the most likely
//! header row. Header rows exhibit more distinct, longer textual labels
//! than sparse data rows; the composite score captures that without exact
//! layout knowledge.

use crate::types::Row;
use std::collections::HashSet;

const WEIGHT_NON_EMPTY: f64 = 0.4;
const WEIGHT_DISTINCT: f64 = 0.4;
const WEIGHT_MEAN_LEN: f64 = 0.2;

/// Composite score for one row. Blank rows score 0.
pub fn header_score(row: &Row) -> f64 {
    let values: Vec<String> = row
        .iter()
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.value.render().trim().to_string())
        .collect();
    if values.is_empty() {
        return 0.0;
    }

    let non_empty = values.len();
    let distinct = values.iter().collect::<HashSet<_>>().len();
    let total_len: usize = values.iter().map(|v| v.chars().count()).sum();
    let mean_len = total_len as f64 / non_empty as f64;

    WEIGHT_NON_EMPTY * non_empty as f64 + WEIGHT_DISTINCT * distinct as f64 + WEIGHT_MEAN_LEN * mean_len
}

/// Index of the most likely header row within a block. Always returns a
/// value: ties resolve to the earliest row, and a fully blank block falls
/// back to index 0.
pub fn locate_header(rows: &[Row]) -> usize {
    let mut best_index = 0usize;
    let mut best_score = 0.0f64;
    for (i, row) in rows.iter().enumerate() {
        let score = header_score(row);
        if score > best_score {
            best_score = score;
            best_index = i;
        }
    }
    best_index
}
