// Rulegrid Core Library
//
// Infers table structure from spreadsheet grids and synthesizes boolean
// compatibility rules from the classified tables.

pub mod classifier;
pub mod config;
pub mod header;
pub mod normalize;
pub mod processor;
pub mod rules;
pub mod segmenter;
pub mod source;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use config::{SynthesisConfig, SynthesisStrategy, ValueCase};
pub use processor::{SheetProcessor, SheetRules, WorkbookRules};
pub use rules::{parse_ruleset, render_lines, BoolExpr, Operand, Path, Rule};
pub use source::{GridSource, InMemoryWorkbook, MemorySink, RuleSink};
