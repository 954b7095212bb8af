// End-to-end pipeline tests over in-memory sheets: segmentation through
// rule synthesis, plus the batch-level outcome accounting.

use rulegrid_core::processor::SheetProcessor;
use rulegrid_core::rules::{parse_ruleset, render_lines};
use rulegrid_core::source::{GridSource, InMemoryWorkbook, MemorySink};
use rulegrid_core::{Cell, FileStatus, ProcessingSummary, Row, Sheet, SkipReason, SynthesisConfig};

fn sheet(name: &str, rows: Vec<Vec<&str>>) -> Sheet {
    let rows: Vec<Row> = rows
        .into_iter()
        .map(|r| {
            r.into_iter()
                .map(|v| if v.is_empty() { Cell::blank() } else { Cell::text(v) })
                .collect()
        })
        .collect();
    Sheet::new(name, rows)
}

fn end_connection_sheet() -> Sheet {
    sheet(
        "Connections",
        vec![
            vec!["Size", "End_Connection_A", "End_Connection_B"],
            vec!["1\"", "Y", "N"],
            vec!["2\"", "N", "Y"],
        ],
    )
}

#[test]
fn excludes_strategy_emits_one_rule_per_attribute() {
    let config = SynthesisConfig {
        namespace_prefix: "ACME".to_string(),
        ..SynthesisConfig::default()
    };
    let processor = SheetProcessor::new(config);
    let result = processor.process_sheet(&end_connection_sheet());

    assert_eq!(
        render_lines(&result.rules),
        vec![
            "AnyTrue('ACME'.'size'.'2') Excludes AnyTrue('ACME'.'end_connection_a'.'end_connection_a');",
            "AnyTrue('ACME'.'size'.'1') Excludes AnyTrue('ACME'.'end_connection_b'.'end_connection_b');",
        ]
    );
}

#[test]
fn reruns_produce_byte_identical_text() {
    let processor = SheetProcessor::new(SynthesisConfig::default());
    let first = render_lines(&processor.process_sheet(&end_connection_sheet()).rules).join("\n");
    let second = render_lines(&processor.process_sheet(&end_connection_sheet()).rules).join("\n");
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn emitted_text_parses_back_to_the_same_operands() {
    let processor = SheetProcessor::new(SynthesisConfig::default());
    let rules = processor.process_sheet(&end_connection_sheet()).rules;
    let text = render_lines(&rules).join("\n");

    let parsed = parse_ruleset(&text).expect("emitted text is grammatical");
    assert_eq!(parsed.len(), rules.len());
    for (original, reparsed) in rules.iter().zip(&parsed) {
        assert_eq!(original.left.paths(), reparsed.left.paths());
        assert_eq!(
            original.excludes.as_ref().map(|e| e.paths()),
            reparsed.excludes.as_ref().map(|e| e.paths())
        );
    }
}

#[test]
fn title_rows_and_multiple_blocks_are_handled_in_one_sheet() {
    // A title row above the table (single non-empty cell) joins the block
    // below it; a blank row separates the second table.
    let grid = sheet(
        "Catalog",
        vec![
            vec!["Gate Valves", "", ""],
            vec!["Valve Size", "Flanged", "Drilled"],
            vec!["1", "Y", "N"],
            vec!["2", "N", "Y"],
            vec!["", "", ""],
            vec!["Trim Code", "Coated", ""],
            vec!["T1", "N", ""],
            vec!["T2", "Y", ""],
        ],
    );
    let processor = SheetProcessor::new(SynthesisConfig::default());
    let result = processor.process_sheet(&grid);

    let lines = render_lines(&result.rules);
    assert_eq!(
        lines,
        vec![
            "AnyTrue('KEY-GR'.'valve_size'.'2') Excludes AnyTrue('KEY-GR'.'flanged'.'flanged');",
            "AnyTrue('KEY-GR'.'valve_size'.'1') Excludes AnyTrue('KEY-GR'.'drilled'.'drilled');",
            "AnyTrue('KEY-GR'.'trim_code'.'t1') Excludes AnyTrue('KEY-GR'.'coated'.'coated');",
        ]
    );
}

#[test]
fn colored_single_cell_rows_count_as_table_content() {
    // A fill-highlighted row with one value would otherwise break the block.
    let rows: Vec<Row> = vec![
        vec![Cell::text("Size"), Cell::text("Flanged")],
        vec![
            Cell::text("Section A").with_fill("FFFFFF00"),
            Cell::blank().with_fill("FFFFFF00"),
        ],
        vec![Cell::text("1"), Cell::text("N")],
        vec![Cell::text("2"), Cell::text("Y")],
    ];
    let processor = SheetProcessor::new(SynthesisConfig::default());
    let result = processor.process_sheet(&Sheet::new("Sections", rows));
    assert_eq!(result.rules.len(), 1);
}

/// A workbook whose first sheet cannot be decoded.
struct TornWorkbook {
    good: Sheet,
}

impl GridSource for TornWorkbook {
    fn name(&self) -> &str {
        "torn"
    }

    fn sheet_names(&self) -> Vec<String> {
        vec!["Corrupt".to_string(), self.good.name.clone()]
    }

    fn read_sheet(&mut self, name: &str) -> anyhow::Result<Sheet> {
        if name == "Corrupt" {
            anyhow::bail!("unreadable sheet part");
        }
        Ok(self.good.clone())
    }
}

#[test]
fn undecodable_sheet_does_not_stop_its_siblings() {
    let processor = SheetProcessor::new(SynthesisConfig::default());
    let mut workbook = TornWorkbook {
        good: end_connection_sheet(),
    };
    let result = processor.process_source(&mut workbook);

    assert_eq!(result.outcome.status, FileStatus::Processed);
    assert_eq!(result.outcome.rules_emitted, 2);

    let corrupt = &result.outcome.sheets[0];
    assert_eq!(corrupt.sheet, "Corrupt");
    assert_eq!(corrupt.rules_emitted, 0);
    assert!(matches!(
        corrupt.skipped_blocks[0],
        SkipReason::MalformedInput(_)
    ));
    assert_eq!(result.outcome.sheets[1].rules_emitted, 2);
}

#[test]
fn batch_summary_distinguishes_processed_and_empty_files() {
    let processor = SheetProcessor::new(SynthesisConfig::default());
    let mut sink = MemorySink::default();

    let mut productive = InMemoryWorkbook::new("valves", vec![end_connection_sheet()]);
    let mut barren = InMemoryWorkbook::new("notes", vec![sheet("Notes", vec![vec!["just a remark"]])]);

    let outcomes = vec![
        processor.process_to_sink(&mut productive, &mut sink),
        processor.process_to_sink(&mut barren, &mut sink),
    ];
    let summary = ProcessingSummary::from_outcomes(outcomes);

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.files[0].status, FileStatus::Processed);
    assert_eq!(summary.files[1].status, FileStatus::Empty);
    assert!(sink.files.contains_key("valves"));
    assert!(!sink.files.contains_key("notes"));

    let json = summary.to_json().unwrap();
    assert!(json.contains("\"processed\": 1"));
}
