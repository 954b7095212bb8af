//! Output artifacts: per-workbook rule files, optional CSV exports of the
//! segmented tables, and the session zip bundle.

use anyhow::{Context, Result};
use rulegrid_core::source::RuleSink;
use rulegrid_core::types::TableBlock;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Writes each workbook's ruleset to `<stem>_rules.txt` in one directory,
/// remembering what it wrote for later bundling.
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    /// Bundle everything written so far into `rules_<session>.zip` inside
    /// the output directory. Returns the archive path.
    pub fn bundle(&self) -> Result<PathBuf> {
        let session = Uuid::new_v4().simple().to_string();
        let archive_path = self.dir.join(format!("rules_{session}.zip"));
        let file = File::create(&archive_path)
            .with_context(|| format!("failed to create {}", archive_path.display()))?;
        let mut archive = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for path in &self.written {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            archive.start_file(name, options)?;
            archive.write_all(&fs::read(path)?)?;
        }
        archive.finish()?;
        Ok(archive_path)
    }
}

impl RuleSink for DirectorySink {
    fn write_rules(&mut self, stem: &str, lines: &[String]) -> Result<()> {
        let path = self.dir.join(format!("{stem}_rules.txt"));
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.written.push(path);
        Ok(())
    }
}

/// Export segmented blocks as CSV files named `<stem>_<sheet>_<n>.csv`.
/// Returns the paths written.
pub fn export_blocks_csv(
    dir: &Path,
    stem: &str,
    sheet: &str,
    blocks: &[TableBlock],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (n, block) in blocks.iter().enumerate() {
        let path = dir.join(format!("{stem}_{sheet}_{n}.csv"));
        let mut content = String::new();
        for row in &block.rows {
            let fields: Vec<String> = row
                .iter()
                .map(|cell| csv_field(&cell.value.render()))
                .collect();
            content.push_str(&fields.join(","));
            content.push('\n');
        }
        fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Minimal CSV quoting: quote only when the field contains a delimiter,
/// quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulegrid_core::types::Cell;
    use std::io::Read;

    #[test]
    fn rule_files_are_named_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path()).unwrap();
        sink.write_rules("valves", &["AnyTrue('a'.'b');".to_string()])
            .unwrap();
        let path = dir.path().join("valves_rules.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "AnyTrue('a'.'b');\n");
        assert_eq!(sink.written_files(), &[path]);
    }

    #[test]
    fn bundle_collects_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path()).unwrap();
        sink.write_rules("a", &["AnyTrue('x'.'y');".to_string()]).unwrap();
        sink.write_rules("b", &["AnyTrue('x'.'z');".to_string()]).unwrap();

        let archive_path = sink.bundle().unwrap();
        let name = archive_path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("rules_") && name.ends_with(".zip"));

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("a_rules.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "AnyTrue('x'.'y');\n");
    }

    #[test]
    fn csv_export_quotes_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let block = TableBlock::new(
            0,
            vec![
                vec![Cell::text("Size"), Cell::text("Notes, loose")],
                vec![Cell::text("1\""), Cell::blank()],
            ],
        )
        .unwrap();
        let written = export_blocks_csv(dir.path(), "book", "Sheet1", &[block]).unwrap();
        assert_eq!(written.len(), 1);
        let content = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(content, "Size,\"Notes, loose\"\n\"1\"\"\",\n");
    }
}
