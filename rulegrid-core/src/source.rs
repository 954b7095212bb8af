//! Collaborator boundaries: where grids come from and where rule text goes.
//!
//! The pipeline itself never touches files or workbook formats; decoders and
//! writers live behind these traits so the core stays testable with
//! in-memory data.

use crate::types::Sheet;
use anyhow::Result;
use std::collections::BTreeMap;

/// A source of cell grids: one workbook, many named sheets.
pub trait GridSource {
    /// Human-readable source name (a file stem for on-disk workbooks).
    fn name(&self) -> &str;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Decode one sheet into a dense grid. A failure here poisons only this
    /// sheet, not the workbook.
    fn read_sheet(&mut self, name: &str) -> Result<Sheet>;
}

/// Destination for rendered rule lines, one ruleset per source.
pub trait RuleSink {
    fn write_rules(&mut self, stem: &str, lines: &[String]) -> Result<()>;
}

/// A fully materialized workbook. Used by tests and by decoders that read
/// everything up front.
pub struct InMemoryWorkbook {
    name: String,
    sheets: Vec<Sheet>,
}

impl InMemoryWorkbook {
    pub fn new(name: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            name: name.into(),
            sheets,
        }
    }
}

impl GridSource for InMemoryWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no sheet named '{name}'"))
    }
}

/// Collects rule files in memory, keyed by stem.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: BTreeMap<String, Vec<String>>,
}

impl RuleSink for MemorySink {
    fn write_rules(&mut self, stem: &str, lines: &[String]) -> Result<()> {
        self.files.insert(stem.to_string(), lines.to_vec());
        Ok(())
    }
}
