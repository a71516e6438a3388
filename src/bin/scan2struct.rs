use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use scan_struct::{
    CleanOptions, EntityModel, ExportOptions, ExtractOptions, GazetteerModel, HeaderMode,
    PageSelection, PatternSet, QualityMode, ReconstructOptions, ScanWarning, TableReport,
    annotate_corpus, apply_model, collect_documents, export_corpus, extract_tables_to_csv,
    read_annotated, write_annotated, write_json,
};
use tracing_subscriber::EnvFilter;

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "pdf"];

#[derive(Debug, Parser)]
#[command(
    name = "scan2struct",
    version,
    about = "Rebuild tables and entity corpora from OCR and PDF text"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild the table from OCR text or a PDF text layer and write CSV.
    Table(TableArgs),
    /// Tag entities in every document of the input folders.
    Annotate(AnnotateArgs),
    /// Split annotated documents into train/test training files.
    Export(ExportArgs),
    /// Learn a gazetteer from annotated documents and apply it to a folder.
    Infer(InferArgs),
}

#[derive(Debug, Args)]
struct TableArgs {
    /// Input `.pdf` or text file with recognised text.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path.
    #[arg(short, long)]
    output: PathBuf,

    /// Page selection like 1-3,5 (PDF input only).
    #[arg(long)]
    pages: Option<String>,

    /// Regex for the line that opens the table (case-insensitive).
    #[arg(long)]
    marker: Option<String>,

    /// Force header interpretation of the first row.
    #[arg(long, conflicts_with = "no_header")]
    has_header: bool,

    /// Keep the first row as data.
    #[arg(long, conflicts_with = "has_header")]
    no_header: bool,

    /// Drop rows less than half filled and fill remaining gaps with 0.
    #[arg(long)]
    clean: bool,

    /// Fail instead of exporting tables with inconsistent column counts.
    #[arg(long, conflicts_with = "skip_ambiguous")]
    strict: bool,

    /// Skip tables with inconsistent column counts.
    #[arg(long, conflicts_with = "strict")]
    skip_ambiguous: bool,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct AnnotateArgs {
    /// Folders with `.txt` and `.pdf` documents. Repeatable.
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Output JSON with annotated documents.
    #[arg(short, long)]
    output: PathBuf,

    /// JSON list of {"label", "pattern"} records; built-in labels if omitted.
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Annotate the raw text without cleaning it first.
    #[arg(long)]
    no_clean: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Annotated documents written by `annotate`.
    #[arg(short, long)]
    input: PathBuf,

    /// Output folder for train/test/converted/manifest JSON.
    #[arg(short, long)]
    output: PathBuf,

    /// Share of documents used for training.
    #[arg(long, default_value_t = scan_struct::DEFAULT_TRAIN_RATIO)]
    train_ratio: f64,

    /// Keep spans that do not fall on token boundaries.
    #[arg(long)]
    no_align: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct InferArgs {
    /// Annotated documents to learn from.
    #[arg(long)]
    train: PathBuf,

    /// Folder with documents to tag.
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON with found entities per document.
    #[arg(short, long)]
    output: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

fn parse_table_options(args: &TableArgs) -> Result<ExtractOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let header_mode = if args.has_header {
        HeaderMode::HasHeader
    } else if args.no_header {
        HeaderMode::NoHeader
    } else {
        HeaderMode::AutoDetect
    };

    let quality_mode = if args.strict {
        QualityMode::Strict
    } else if args.skip_ambiguous {
        QualityMode::SkipAmbiguous
    } else {
        QualityMode::BestEffort
    };

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let defaults = ReconstructOptions::default();
    Ok(ExtractOptions {
        reconstruct: ReconstructOptions {
            start_marker: args.marker.clone().unwrap_or(defaults.start_marker),
            header_mode,
            quality_mode,
            clean: args.clean.then(CleanOptions::default),
            ..defaults
        },
        pages,
        delimiter: args.delimiter as u8,
    })
}

fn log_warnings(warnings: &[ScanWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", warnings.len());
    if verbose {
        for warning in warnings {
            eprintln!(
                "  - {:?} page={:?} source={:?} count={:?} confidence={:?}: {}",
                warning.code,
                warning.page,
                warning.source,
                warning.count,
                warning.confidence,
                warning.message
            );
        }
    }
}

fn run_table(args: &TableArgs) -> Result<TableReport> {
    let options = parse_table_options(args)?;
    extract_tables_to_csv(&args.input, &args.output, &options)
        .with_context(|| format!("failed to rebuild tables from '{}'", args.input.display()))
}

fn load_folder(
    dir: &Path,
    warnings: &mut Vec<ScanWarning>,
) -> Result<Vec<scan_struct::RawDocument>> {
    collect_documents(dir, DOCUMENT_EXTENSIONS, warnings)
        .with_context(|| format!("failed to read documents from '{}'", dir.display()))
}

fn run_annotate(args: &AnnotateArgs) -> Result<usize> {
    let patterns = match &args.patterns {
        Some(path) => PatternSet::load(path)
            .with_context(|| format!("failed to load patterns from '{}'", path.display()))?,
        None => PatternSet::builtin().context("built-in patterns failed to compile")?,
    };

    let mut warnings = Vec::new();
    let mut documents = Vec::new();
    for dir in &args.inputs {
        documents.extend(load_folder(dir, &mut warnings)?);
    }

    let annotated = annotate_corpus(&documents, &patterns, !args.no_clean, &mut warnings);
    write_annotated(&args.output, &annotated)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    log_warnings(&warnings, args.verbose);
    Ok(annotated.len())
}

fn run_export(args: &ExportArgs) -> Result<usize> {
    let documents = read_annotated(&args.input).with_context(|| {
        format!(
            "failed to read annotated documents from '{}'",
            args.input.display()
        )
    })?;
    let options = ExportOptions {
        train_ratio: args.train_ratio,
        align_tokens: !args.no_align,
    };
    let report = export_corpus(&documents, &args.output, &options)
        .with_context(|| format!("failed to export corpus into '{}'", args.output.display()))?;
    log_warnings(&report.warnings, args.verbose);
    Ok(report.manifest.documents)
}

fn run_infer(args: &InferArgs) -> Result<usize> {
    let corpus = read_annotated(&args.train)
        .with_context(|| format!("failed to read training corpus '{}'", args.train.display()))?;
    let model = GazetteerModel::train(&corpus).context("failed to train gazetteer")?;

    let mut warnings = Vec::new();
    let documents = load_folder(&args.input, &mut warnings)?;
    let results = apply_model(&model, &documents);
    write_json(&args.output, &results)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    log_warnings(&warnings, args.verbose);
    Ok(results.len())
}

fn exit_code(result: Result<usize>) -> ExitCode {
    match result {
        Ok(0) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scan_struct=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match Cli::parse().command {
        Commands::Table(args) => exit_code(run_table(&args).map(|report| {
            log_warnings(&report.warnings, args.verbose);
            report.row_count
        })),
        Commands::Annotate(args) => exit_code(run_annotate(&args)),
        Commands::Export(args) => exit_code(run_export(&args)),
        Commands::Infer(args) => exit_code(run_infer(&args)),
    }
}
