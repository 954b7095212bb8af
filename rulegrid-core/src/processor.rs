//! Orchestration: run the segment → header → classify → synthesize pipeline
//! over sheets and whole workbooks, converting every per-block and per-sheet
//! failure into a skip-with-reason record instead of halting the batch.

use crate::classifier::classify_columns;
use crate::config::{SynthesisConfig, SynthesisStrategy};
use crate::header::{header_score, locate_header};
use crate::rules::expr::{render_lines, Rule};
use crate::rules::synthesizer::synthesize;
use crate::segmenter::segment_sheet;
use crate::source::{GridSource, RuleSink};
use crate::types::{FileOutcome, FileStatus, Sheet, SheetOutcome, SkipReason};

/// Rules synthesized from one sheet, plus the blocks that produced nothing.
#[derive(Debug, Clone)]
pub struct SheetRules {
    pub sheet: String,
    pub rules: Vec<Rule>,
    pub skipped: Vec<SkipReason>,
}

impl SheetRules {
    pub fn outcome(&self) -> SheetOutcome {
        SheetOutcome {
            sheet: self.sheet.clone(),
            rules_emitted: self.rules.len(),
            skipped_blocks: self.skipped.clone(),
        }
    }
}

/// Everything produced from one workbook: the rendered rule lines and the
/// per-sheet accounting.
#[derive(Debug, Clone)]
pub struct WorkbookRules {
    pub lines: Vec<String>,
    pub outcome: FileOutcome,
}

/// Runs the pipeline. Holds only configuration; sheets stream through and
/// are dropped once their rules are rendered.
pub struct SheetProcessor {
    config: SynthesisConfig,
}

impl SheetProcessor {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Process one sheet. Blocks are independent: a block that fails
    /// classification is recorded and the walk continues.
    pub fn process_sheet(&self, sheet: &Sheet) -> SheetRules {
        let mut rules = Vec::new();
        let mut skipped = Vec::new();

        for mut block in segment_sheet(sheet) {
            if block.header_row.is_none() {
                let header = locate_header(&block.rows);
                // A best candidate scoring zero means no row carries any
                // value: colored banner rows, nothing to classify.
                if header_score(&block.rows[header]) == 0.0 {
                    skipped.push(SkipReason::StructuralAmbiguity);
                    continue;
                }
                block.header_row = Some(header);
            }
            let table = match classify_columns(&block) {
                Ok(table) => table,
                Err(reason) => {
                    skipped.push(reason);
                    continue;
                }
            };
            // Only the excludes strategy needs Y/N columns; the aggregate
            // strategy runs over whatever columns the block retained.
            if self.config.synthesis_strategy == SynthesisStrategy::ExcludesPerAttribute
                && table.attribute_indexes().is_empty()
            {
                skipped.push(SkipReason::MissingAttributeColumns);
                continue;
            }
            let block_rules = synthesize(&table, &self.config);
            if block_rules.is_empty() {
                skipped.push(SkipReason::NothingToSynthesize);
            } else {
                rules.extend(block_rules);
            }
        }

        SheetRules {
            sheet: sheet.name.clone(),
            rules,
            skipped,
        }
    }

    /// Process every sheet of a workbook, in workbook order. A sheet that
    /// fails to decode is recorded as malformed and the rest still run.
    pub fn process_source(&self, source: &mut dyn GridSource) -> WorkbookRules {
        let file = source.name().to_string();
        println!("📄 Processing '{file}'");

        let mut lines = Vec::new();
        let mut sheets = Vec::new();
        for sheet_name in source.sheet_names() {
            let sheet = match source.read_sheet(&sheet_name) {
                Ok(sheet) => sheet,
                Err(e) => {
                    println!("   ⚠️  Sheet '{sheet_name}' skipped: {e}");
                    sheets.push(SheetOutcome {
                        sheet: sheet_name,
                        rules_emitted: 0,
                        skipped_blocks: vec![SkipReason::MalformedInput(e.to_string())],
                    });
                    continue;
                }
            };
            let result = self.process_sheet(&sheet);
            if !result.rules.is_empty() {
                println!(
                    "   ✅ Sheet '{}': {} rule(s)",
                    result.sheet,
                    result.rules.len()
                );
            }
            lines.extend(render_lines(&result.rules));
            sheets.push(result.outcome());
        }

        let rules_emitted = lines.len();
        let status = if rules_emitted > 0 {
            FileStatus::Processed
        } else {
            FileStatus::Empty
        };
        WorkbookRules {
            lines,
            outcome: FileOutcome {
                file,
                status,
                rules_emitted,
                sheets,
            },
        }
    }

    /// `process_source`, delivering non-empty rulesets to a sink under the
    /// source's name. A sink failure marks this file failed instead of
    /// propagating, so the rest of a batch keeps running.
    pub fn process_to_sink(
        &self,
        source: &mut dyn GridSource,
        sink: &mut dyn RuleSink,
    ) -> FileOutcome {
        let result = self.process_source(source);
        let mut outcome = result.outcome;
        if !result.lines.is_empty() {
            if let Err(e) = sink.write_rules(source.name(), &result.lines) {
                println!("   ❌ Failed to write rules for '{}': {e}", outcome.file);
                outcome.status = FileStatus::Failed(format!("failed to write rules: {e}"));
            }
        }
        outcome
    }
}
