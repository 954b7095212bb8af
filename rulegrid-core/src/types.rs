use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ===== GRID TYPES =====
// The in-memory grid the pipeline runs over. A GridSource materializes
// these from a workbook file; the core never decodes files itself.

/// A single cell value. Numbers keep their numeric identity so callers can
/// render them without a trailing ".0" artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

impl CellValue {
    /// Render the value the way it appears in rules and exports.
    /// Whole numbers render without a fractional part ("15", not "15.0").
    pub fn render(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            CellValue::Blank => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
            CellValue::Blank => true,
        }
    }
}

/// Background fill of a cell, as an ARGB hex string (e.g. "FFFFFF00").
/// "00000000" (no fill) and "FFFFFFFF" (plain white) count as default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub argb: String,
}

impl Fill {
    pub fn new(argb: impl Into<String>) -> Self {
        Self { argb: argb.into() }
    }

    pub fn is_default(&self) -> bool {
        matches!(self.argb.as_str(), "00000000" | "FFFFFFFF")
    }
}

/// A cell: value plus optional visual fill. Immutable once read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub fill: Option<Fill>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: CellValue::Text(value.into()),
            fill: None,
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            fill: None,
        }
    }

    pub fn blank() -> Self {
        Self {
            value: CellValue::Blank,
            fill: None,
        }
    }

    pub fn with_fill(mut self, argb: impl Into<String>) -> Self {
        self.fill = Some(Fill::new(argb));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// A cell carrying a non-default background fill.
    pub fn is_colored(&self) -> bool {
        self.fill.as_ref().map(|f| !f.is_default()).unwrap_or(false)
    }
}

/// One sheet row, position-stable within its sheet.
pub type Row = Vec<Cell>;

/// A named, ordered sequence of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

// ===== SEGMENTATION & CLASSIFICATION TYPES =====

/// A contiguous run of sheet rows recognized as one logical table.
/// `start_row` is the index of `rows[0]` in the source sheet.
/// `header_row` indexes into `rows` once the header has been located.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub start_row: usize,
    pub rows: Vec<Row>,
    pub header_row: Option<usize>,
}

impl TableBlock {
    /// A block with zero rows does not exist; creation returns None.
    pub fn new(start_row: usize, rows: Vec<Row>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self {
                start_row,
                rows,
                header_row: None,
            })
        }
    }
}

/// Role assigned to a column by the classifier, decided once and carried
/// explicitly through the rest of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Key,
    Attribute,
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedColumn {
    pub index: usize,
    pub name: String,
    pub role: ColumnRole,
}

/// A classified table: header names with roles, plus the data rows rendered
/// to trimmed strings and padded to the header width.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTable {
    pub columns: Vec<ClassifiedColumn>,
    /// Index into `columns` of the single key column.
    pub key: usize,
    pub rows: Vec<Vec<String>>,
}

impl ClassifiedTable {
    pub fn key_column(&self) -> &ClassifiedColumn {
        &self.columns[self.key]
    }

    pub fn attribute_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.role == ColumnRole::Attribute)
            .map(|c| c.index)
            .collect()
    }
}

// ===== OUTCOME TYPES =====
// Every per-sheet and per-file failure is converted into a skip-with-reason
// record at its own boundary; nothing halts the overall batch.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// No row in the block carries a value the header locator can score
    /// (e.g. colored but blank rows); there is nothing to classify.
    StructuralAmbiguity,
    /// No acceptable key column in the block.
    MissingKeyColumn,
    /// No Y/N-bearing columns next to the key column.
    MissingAttributeColumns,
    /// The grid-loading boundary failed to decode a workbook or sheet.
    MalformedInput(String),
    /// Classification succeeded but the block's values produced no rules.
    /// The file-level "processed but zero rules" outcome is `FileStatus::Empty`.
    NothingToSynthesize,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::StructuralAmbiguity => write!(f, "no scoreable header row"),
            SkipReason::MissingKeyColumn => write!(f, "no acceptable key column"),
            SkipReason::MissingAttributeColumns => write!(f, "no Y/N attribute columns"),
            SkipReason::MalformedInput(detail) => write!(f, "malformed input: {detail}"),
            SkipReason::NothingToSynthesize => write!(f, "no rules to synthesize in block"),
        }
    }
}

/// Outcome of one sheet within a workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetOutcome {
    pub sheet: String,
    pub rules_emitted: usize,
    pub skipped_blocks: Vec<SkipReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum FileStatus {
    /// At least one rule produced.
    Processed,
    /// Processing succeeded end to end but produced zero rules. Distinct
    /// from failure: there was simply nothing to synthesize.
    Empty,
    /// The workbook could not be opened at all.
    Failed(String),
}

/// Outcome of one workbook in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
    pub rules_emitted: usize,
    pub sheets: Vec<SheetOutcome>,
}

/// Summary of a batch run, serializable as the JSON artifact next to the
/// produced rule files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub generated_at: DateTime<Utc>,
    pub processed: usize,
    pub empty: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl ProcessingSummary {
    pub fn from_outcomes(files: Vec<FileOutcome>) -> Self {
        let processed = files
            .iter()
            .filter(|f| f.status == FileStatus::Processed)
            .count();
        let empty = files.iter().filter(|f| f.status == FileStatus::Empty).count();
        let failed = files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Failed(_)))
            .count();
        Self {
            generated_at: Utc::now(),
            processed,
            empty,
            failed,
            files,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
