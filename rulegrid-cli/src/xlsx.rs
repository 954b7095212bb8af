//! Minimal XLSX decoding: just enough of the OOXML package to materialize
//! dense cell grids with background fills for the core pipeline. Shared
//! strings, style-index fill lookup, and sheet relationships are resolved;
//! number formats, dates, and formulas are not interpreted.

use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rulegrid_core::source::GridSource;
use rulegrid_core::types::{Cell, CellValue, Row, Sheet};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("failed to open workbook: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a valid xlsx package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("malformed xml in '{part}': {source}")]
    Xml {
        part: String,
        source: quick_xml::Error,
    },
    #[error("workbook part '{0}' is missing")]
    MissingPart(String),
    #[error("unreadable cell reference '{0}'")]
    BadReference(String),
    #[error("no sheet named '{0}'")]
    UnknownSheet(String),
}

/// An opened workbook file. Shared strings and fill styles are decoded once
/// at open; sheets decode lazily through `GridSource::read_sheet`.
pub struct XlsxWorkbook {
    name: String,
    archive: ZipArchive<File>,
    /// (sheet name, zip part path) in workbook order.
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    /// Style index → ARGB fill, for styles carrying a pattern fill.
    style_fills: Vec<Option<String>>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self, XlsxError> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut archive = ZipArchive::new(File::open(path)?)?;

        let relationships = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };
        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
            .ok_or_else(|| XlsxError::MissingPart("xl/workbook.xml".to_string()))?;
        let sheets = parse_workbook(&workbook_xml, &relationships)?;

        let shared_strings = match read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };
        let style_fills = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_style_fills(&xml)?,
            None => Vec::new(),
        };

        Ok(Self {
            name,
            archive,
            sheets,
            shared_strings,
            style_fills,
        })
    }
}

impl GridSource for XlsxWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        let part = self
            .sheets
            .iter()
            .find(|(sheet_name, _)| sheet_name == name)
            .map(|(_, part)| part.clone())
            .ok_or_else(|| XlsxError::UnknownSheet(name.to_string()))?;
        let xml = read_part(&mut self.archive, &part)?
            .ok_or_else(|| XlsxError::MissingPart(part.clone()))?;
        let rows = parse_sheet(&xml, &part, &self.shared_strings, &self.style_fills)?;
        Ok(Sheet::new(name, rows))
    }
}

/// Read one zip part into a string, or None when the part does not exist.
fn read_part(archive: &mut ZipArchive<File>, part: &str) -> Result<Option<String>, XlsxError> {
    match archive.by_name(part) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn xml_err(part: &str) -> impl Fn(quick_xml::Error) -> XlsxError + '_ {
    move |source| XlsxError::Xml {
        part: part.to_string(),
        source,
    }
}

fn attribute(event: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    event
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Relationship id → zip part path, with relative targets anchored under xl/.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, XlsxError> {
    let part = "xl/_rels/workbook.xml.rels";
    let mut reader = Reader::from_str(xml);
    let mut map = HashMap::new();
    loop {
        match reader.read_event().map_err(xml_err(part))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id"), attribute(&e, b"Target")) {
                    let path = if let Some(absolute) = target.strip_prefix('/') {
                        absolute.to_string()
                    } else {
                        format!("xl/{target}")
                    };
                    map.insert(id, path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(map)
}

/// Sheet (name, part path) pairs in workbook order.
fn parse_workbook(
    xml: &str,
    relationships: &HashMap<String, String>,
) -> Result<Vec<(String, String)>, XlsxError> {
    let part = "xl/workbook.xml";
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event().map_err(xml_err(part))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name");
                let rel_id = attribute(&e, b"id");
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    if let Some(path) = relationships.get(&rel_id) {
                        sheets.push((name, path.clone()));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// The shared string table. Phonetic annotations (rPh) are skipped; rich
/// text runs concatenate.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, XlsxError> {
    let part = "xl/sharedStrings.xml";
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event().map_err(xml_err(part))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_item && !in_phonetic => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = false;
                    strings.push(std::mem::take(&mut current));
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) => {
                if in_text {
                    current.push_str(&t.unescape().map_err(xml_err(part))?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Style index → ARGB fill color. Two passes over one document: collect the
/// fill table (fgColor of solid pattern fills), then map each cellXfs xf
/// through its fillId.
fn parse_style_fills(xml: &str) -> Result<Vec<Option<String>>, XlsxError> {
    let part = "xl/styles.xml";
    let mut reader = Reader::from_str(xml);
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut fill_ids: Vec<usize> = Vec::new();
    let mut in_fills = false;
    let mut in_fill = false;
    let mut in_cell_xfs = false;
    let mut current_fill: Option<String> = None;
    loop {
        match reader.read_event().map_err(xml_err(part))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"fills" => in_fills = true,
                b"fill" if in_fills => {
                    in_fill = true;
                    current_fill = None;
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let fill_id = attribute(&e, b"fillId")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    fill_ids.push(fill_id);
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                // A childless <fill/> still occupies a fill-table slot.
                b"fill" if in_fills => fills.push(None),
                b"fgColor" if in_fill => current_fill = attribute(&e, b"rgb"),
                b"xf" if in_cell_xfs => {
                    let fill_id = attribute(&e, b"fillId")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    fill_ids.push(fill_id);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"fills" => in_fills = false,
                b"fill" if in_fill => {
                    in_fill = false;
                    fills.push(current_fill.take());
                }
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(fill_ids
        .into_iter()
        .map(|id| fills.get(id).cloned().flatten())
        .collect())
}

/// Decode one worksheet part into a dense grid. Cells arrive sparse and
/// reference-addressed; missing positions pad out as blank cells.
fn parse_sheet(
    xml: &str,
    part: &str,
    shared_strings: &[String],
    style_fills: &[Option<String>],
) -> Result<Vec<Row>, XlsxError> {
    struct PendingCell {
        row: usize,
        col: usize,
        kind: CellKind,
        fill: Option<String>,
        raw: String,
    }

    enum CellKind {
        Number,
        SharedString,
        Text,
        InlineText,
        Boolean,
    }

    let mut reader = Reader::from_str(xml);
    let mut cells: Vec<(usize, usize, Cell)> = Vec::new();
    let mut pending: Option<PendingCell> = None;
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut in_value = false;
    let mut in_inline_text = false;

    let open_cell = |e: &BytesStart<'_>, next_row: usize, next_col: usize| {
        let (row, col) = match attribute(e, b"r") {
            Some(reference) => parse_reference(&reference)
                .ok_or_else(|| XlsxError::BadReference(reference.clone()))?,
            None => (next_row, next_col),
        };
        let kind = match attribute(e, b"t").as_deref() {
            Some("s") => CellKind::SharedString,
            Some("str") => CellKind::Text,
            Some("inlineStr") => CellKind::InlineText,
            Some("b") => CellKind::Boolean,
            _ => CellKind::Number,
        };
        let fill = attribute(e, b"s")
            .and_then(|v| v.parse::<usize>().ok())
            .and_then(|index| style_fills.get(index).cloned().flatten());
        Ok::<_, XlsxError>(PendingCell {
            row,
            col,
            kind,
            fill,
            raw: String::new(),
        })
    };

    let finish_cell = |pending: PendingCell, cells: &mut Vec<(usize, usize, Cell)>| {
        let value = match pending.kind {
            CellKind::SharedString => pending
                .raw
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i).cloned())
                .map(CellValue::Text)
                .unwrap_or(CellValue::Blank),
            CellKind::Text | CellKind::InlineText => {
                if pending.raw.is_empty() {
                    CellValue::Blank
                } else {
                    CellValue::Text(pending.raw)
                }
            }
            CellKind::Boolean => {
                let truthy = pending.raw.trim() == "1";
                CellValue::Text(if truthy { "TRUE" } else { "FALSE" }.to_string())
            }
            CellKind::Number => match pending.raw.trim() {
                "" => CellValue::Blank,
                raw => raw
                    .parse::<f64>()
                    .map(CellValue::Number)
                    .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
            },
        };
        let mut cell = Cell {
            value,
            fill: None,
        };
        if let Some(argb) = pending.fill {
            cell = cell.with_fill(argb);
        }
        cells.push((pending.row, pending.col, cell));
    };

    loop {
        match reader.read_event().map_err(xml_err(part))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    if let Some(r) = attribute(&e, b"r").and_then(|v| v.parse::<usize>().ok()) {
                        next_row = r.saturating_sub(1);
                    }
                    next_col = 0;
                }
                b"c" => {
                    let cell = open_cell(&e, next_row, next_col)?;
                    next_col = cell.col + 1;
                    pending = Some(cell);
                }
                b"v" if pending.is_some() => in_value = true,
                b"t" if pending.is_some() && !in_value => in_inline_text = true,
                _ => {}
            },
            // Styled but valueless cells arrive as empty elements; their
            // fill still matters to segmentation.
            Event::Empty(e) => match e.local_name().as_ref() {
                b"c" => {
                    let cell = open_cell(&e, next_row, next_col)?;
                    next_col = cell.col + 1;
                    finish_cell(cell, &mut cells);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"row" => next_row += 1,
                b"c" => {
                    if let Some(cell) = pending.take() {
                        finish_cell(cell, &mut cells);
                    }
                }
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Event::Text(t) => {
                if in_value || in_inline_text {
                    if let Some(cell) = pending.as_mut() {
                        cell.raw.push_str(&t.unescape().map_err(xml_err(part))?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(densify(cells))
}

/// Lay sparse cells out as a rectangular grid, padding gaps with blanks.
fn densify(cells: Vec<(usize, usize, Cell)>) -> Vec<Row> {
    let rows = cells.iter().map(|(r, _, _)| r + 1).max().unwrap_or(0);
    let cols = cells.iter().map(|(_, c, _)| c + 1).max().unwrap_or(0);
    let mut grid: Vec<Row> = (0..rows)
        .map(|_| (0..cols).map(|_| Cell::blank()).collect())
        .collect();
    for (row, col, cell) in cells {
        grid[row][col] = cell;
    }
    grid
}

/// "B3" → (2, 1). Letters are a base-26 column, digits a 1-based row.
fn parse_reference(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (c as usize - 'A' as usize + 1);
    }
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_decode_to_zero_based_indexes() {
        assert_eq!(parse_reference("A1"), Some((0, 0)));
        assert_eq!(parse_reference("B3"), Some((2, 1)));
        assert_eq!(parse_reference("AA10"), Some((9, 26)));
        assert_eq!(parse_reference("7"), None);
        assert_eq!(parse_reference("A0"), None);
    }

    #[test]
    fn shared_strings_skip_phonetic_runs() {
        let xml = r#"<sst><si><t>plain</t></si><si><r><t>rich </t></r><r><t>text</t></r></si><si><t>base</t><rPh><t>ruby</t></rPh></si></sst>"#;
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["plain", "rich text", "base"]);
    }

    #[test]
    fn style_fills_resolve_through_fill_ids() {
        let xml = r#"<styleSheet>
            <fills count="3">
                <fill><patternFill patternType="none"/></fill>
                <fill><patternFill patternType="gray125"/></fill>
                <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/></patternFill></fill>
            </fills>
            <cellXfs count="2">
                <xf numFmtId="0" fillId="0"/>
                <xf numFmtId="0" fillId="2"/>
            </cellXfs>
        </styleSheet>"#;
        let fills = parse_style_fills(xml).unwrap();
        assert_eq!(fills, vec![None, Some("FFFFFF00".to_string())]);
    }

    #[test]
    fn sheet_cells_resolve_values_and_fills() {
        let shared = vec!["Size".to_string(), "Flanged".to_string()];
        let fills = vec![None, Some("FFFFFF00".to_string())];
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"><c r="A2"><v>15</v></c><c r="B2" t="str"><v>Y</v></c></row>
            <row r="4"><c r="A4" s="1"/><c r="B4" t="b"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_sheet(xml, "sheet1.xml", &shared, &fills).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0].value, CellValue::Text("Size".to_string()));
        assert_eq!(rows[1][0].value, CellValue::Number(15.0));
        assert_eq!(rows[1][1].value, CellValue::Text("Y".to_string()));
        // Row 3 exists only as blank padding.
        assert!(rows[2].iter().all(|c| c.is_empty()));
        assert!(rows[3][0].is_colored());
        assert_eq!(rows[3][1].value, CellValue::Text("TRUE".to_string()));
    }

    #[test]
    fn inline_strings_are_read_from_is_elements() {
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>hello</t></is></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_sheet(xml, "sheet1.xml", &[], &[]).unwrap();
        assert_eq!(rows[0][0].value, CellValue::Text("hello".to_string()));
    }
}
