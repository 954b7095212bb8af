//! Table segmentation: split a sheet's rows into contiguous table blocks
//! using visual and density signals, without prior layout knowledge.

use crate::types::{Row, Sheet, TableBlock};

/// A row dense or decorated enough to sit inside a table: at least one cell
/// with a non-default background fill, or at least two non-empty cells.
pub fn is_content_row(row: &Row) -> bool {
    if row.iter().any(|cell| cell.is_colored()) {
        return true;
    }
    row.iter().filter(|cell| !cell.is_empty()).count() >= 2
}

fn has_any_value(row: &Row) -> bool {
    row.iter().any(|cell| !cell.is_empty())
}

/// Split a sheet into table blocks, in original row order, never overlapping.
///
/// Two-state walk: a content row opens a block, a non-content row closes the
/// current one. After closing (or at sheet end) the block start is extended
/// upward over immediately preceding rows that carry any value (multi-line
/// titles sitting above the dense region), stopping at a blank row, the top
/// of the sheet, or the previous block's end.
pub fn segment_sheet(sheet: &Sheet) -> Vec<TableBlock> {
    let rows = &sheet.rows;
    let mut blocks: Vec<TableBlock> = Vec::new();
    // First row index not claimable by upward extension.
    let mut floor = 0usize;
    let mut open_at: Option<usize> = None;

    for (i, row) in rows.iter().enumerate() {
        if is_content_row(row) {
            if open_at.is_none() {
                open_at = Some(i);
            }
        } else if let Some(start) = open_at.take() {
            if let Some(block) = close_block(rows, start, i, &mut floor) {
                blocks.push(block);
            }
        }
    }

    if let Some(start) = open_at {
        if let Some(block) = close_block(rows, start, rows.len(), &mut floor) {
            blocks.push(block);
        }
    }

    blocks
}

fn close_block(
    rows: &[Row],
    mut start: usize,
    end: usize,
    floor: &mut usize,
) -> Option<TableBlock> {
    while start > *floor && has_any_value(&rows[start - 1]) {
        start -= 1;
    }
    *floor = end;
    TableBlock::new(start, rows[start..end].to_vec())
}
