use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

// Import from rulegrid-core
use rulegrid_core::processor::SheetProcessor;
use rulegrid_core::segmenter::segment_sheet;
use rulegrid_core::source::GridSource;
use rulegrid_core::{FileOutcome, FileStatus, ProcessingSummary, SynthesisConfig};

// Import CLI utilities
use rulegrid::writer::{export_blocks_csv, DirectorySink};
use rulegrid::xlsx::XlsxWorkbook;

#[derive(Parser)]
#[command(name = "rulegrid")]
#[command(about = "Infer tables from Excel workbooks and synthesize boolean compatibility rules")]
struct Args {
    /// Workbook file or directory of .xlsx files to process
    #[arg(short, long)]
    input: String,

    /// Output directory for rule files and reports
    #[arg(short, long, default_value = "generated_rules")]
    output: String,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Namespace prefix for rule paths (overrides config)
    #[arg(long)]
    prefix: Option<String>,

    /// Synthesis strategy: excludes_per_attribute or all_true_aggregate
    /// (overrides config)
    #[arg(long)]
    strategy: Option<String>,

    /// Bundle the produced rule files into a session zip archive
    #[arg(long)]
    zip: bool,

    /// Export every segmented table block as a CSV file
    #[arg(long)]
    export_tables: bool,

    /// Write a processing summary JSON next to the rule files
    #[arg(long)]
    summary: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🦀 Rulegrid Table Rule Generator");

    let input = Path::new(&args.input);
    if !input.exists() {
        println!("⚠️  Input not found at: {}", args.input);
        println!("   Please check the path.");
        return Ok(());
    }

    // Load config using the fallback pattern, then apply CLI overrides
    let mut config = SynthesisConfig::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {config_path}");
    } else {
        println!("📋 Using default config");
    }
    if let Some(prefix) = args.prefix {
        config.namespace_prefix = prefix;
    }
    if let Some(strategy) = &args.strategy {
        config.synthesis_strategy = strategy.parse().map_err(anyhow::Error::msg)?;
    }

    let files = collect_workbooks(input)?;
    if files.is_empty() {
        println!("⚠️  No .xlsx workbooks found at: {}", args.input);
        return Ok(());
    }

    let processor = SheetProcessor::new(config);
    let mut sink = DirectorySink::new(&args.output)?;
    let output_dir = PathBuf::from(&args.output);

    let mut outcomes: Vec<FileOutcome> = Vec::new();
    for path in &files {
        let mut workbook = match XlsxWorkbook::open(path) {
            Ok(workbook) => workbook,
            Err(e) => {
                println!("❌ Failed to open {}: {e}", path.display());
                outcomes.push(FileOutcome {
                    file: path.display().to_string(),
                    status: FileStatus::Failed(e.to_string()),
                    rules_emitted: 0,
                    sheets: vec![],
                });
                continue;
            }
        };

        if args.export_tables {
            if let Err(e) = export_tables(&mut workbook, &output_dir) {
                println!("   ⚠️  Table export failed for {}: {e}", path.display());
            }
        }

        outcomes.push(processor.process_to_sink(&mut workbook, &mut sink));
    }

    let summary = ProcessingSummary::from_outcomes(outcomes);
    println!(
        "📊 Done: {} processed, {} empty, {} failed",
        summary.processed, summary.empty, summary.failed
    );

    if args.summary {
        let path = output_dir.join("summary.json");
        std::fs::write(&path, summary.to_json()?)?;
        println!("📝 Summary written to: {}", path.display());
    }

    if args.zip {
        if sink.written_files().is_empty() {
            println!("⚠️  Nothing to bundle");
        } else {
            let archive = sink.bundle()?;
            println!("📦 Bundled rules into: {}", archive.display());
        }
    }

    Ok(())
}

/// A single workbook path, or every .xlsx directly inside a directory,
/// sorted by name so batch output order is stable.
fn collect_workbooks(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("xlsx"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Dump every segmented block of every sheet as CSV, for inspecting what
/// the segmenter saw before rules were synthesized.
fn export_tables(workbook: &mut XlsxWorkbook, output_dir: &Path) -> Result<()> {
    let stem = workbook.name().to_string();
    for sheet_name in workbook.sheet_names() {
        let sheet = match workbook.read_sheet(&sheet_name) {
            Ok(sheet) => sheet,
            Err(_) => continue,
        };
        let blocks = segment_sheet(&sheet);
        if !blocks.is_empty() {
            let written = export_blocks_csv(output_dir, &stem, &sheet_name, &blocks)?;
            println!(
                "   🗂️  Exported {} table(s) from sheet '{sheet_name}'",
                written.len()
            );
        }
    }
    Ok(())
}
