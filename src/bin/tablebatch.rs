use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use table_batch::{
    ArtifactStore, BatchRunner, ColumnLabels, CommandRecognizer, DEFAULT_MERGED_FILE,
    ExportForms, MergeOptions, MergeReport, RunStatistics, TracingObserver, merge_directory,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tablebatch",
    version,
    about = "Recognize tables in a folder of images and merge the results"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run table recognition over every image in a directory.
    Run(RunArgs),
    /// Merge previously exported tables into one file.
    Merge(MergeArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory holding the images.
    #[arg(long, default_value = ".")]
    image_dir: PathBuf,

    /// Filename pattern; common image extensions are always included.
    #[arg(long, default_value = "*.jpg")]
    pattern: String,

    /// Directory receiving one sub-directory per image.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Recognition engine executable; it receives the image path as its last argument.
    #[arg(long)]
    engine: PathBuf,

    /// Extra argument passed to the engine before the image path. Repeatable.
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Seconds to wait for the engine on one image.
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// Skip the per-table workbook export.
    #[arg(long)]
    no_xlsx: bool,

    /// Skip the per-table JSON record export.
    #[arg(long)]
    no_json: bool,

    /// Print the run statistics as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct MergeArgs {
    /// Directory holding exported tables.
    #[arg(short, long, default_value = "output")]
    input_dir: PathBuf,

    /// Merged file; relative paths are placed inside the input directory.
    #[arg(short, long, default_value = DEFAULT_MERGED_FILE)]
    output: PathBuf,

    /// Keep the first row of every table instead of treating it as a header.
    #[arg(long)]
    keep_header: bool,

    /// Keep the first row of workbook and CSV tables only.
    #[arg(long)]
    keep_workbook_header: bool,

    /// Leading column labels like date,event,amount.
    #[arg(long)]
    column_labels: Option<String>,

    /// Keep exact duplicate rows.
    #[arg(long)]
    keep_duplicates: bool,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_merge_options(args: &MergeArgs) -> Result<MergeOptions> {
    let column_labels = args
        .column_labels
        .as_deref()
        .map(ColumnLabels::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid column labels: {error}"))
        .context("failed to parse --column-labels")?;

    Ok(MergeOptions {
        skip_first_row: !args.keep_header,
        workbook_skip_first_row: args.keep_workbook_header.then_some(false),
        column_labels,
        dedup: !args.keep_duplicates,
    })
}

fn run_batch(args: &RunArgs) -> Result<RunStatistics> {
    let recognizer = CommandRecognizer::new(&args.engine)
        .with_args(args.engine_args.clone())
        .with_timeout(Duration::from_secs(args.timeout_secs));
    let forms = ExportForms {
        workbook: !args.no_xlsx,
        record: !args.no_json,
    };
    let store = ArtifactStore::new(&args.output_dir, forms);

    let mut runner = BatchRunner::new(recognizer, store);
    runner
        .run(&args.image_dir, &args.pattern, &mut TracingObserver)
        .with_context(|| format!("batch over '{}' failed", args.image_dir.display()))
}

fn run_merge(args: &MergeArgs) -> Result<MergeReport> {
    let options = parse_merge_options(args)?;
    merge_directory(&args.input_dir, &args.output, &options)
        .with_context(|| format!("failed to merge tables from '{}'", args.input_dir.display()))
}

fn log_merge_report(report: &MergeReport, verbose: bool) {
    eprintln!(
        "merged {} table(s) from {} file(s): {} rows x {} columns -> {}",
        report.table_count,
        report.files_found,
        report.row_count,
        report.column_count,
        report.output.display()
    );

    let issues = report.warnings.len() + report.skipped.len();
    if issues == 0 {
        return;
    }

    eprintln!("warning: {issues} issue(s) detected");
    if verbose {
        for skipped in &report.skipped {
            eprintln!("  - skipped {}: {}", skipped.path.display(), skipped.reason);
        }
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} origin={:?} columns={:?}: {}",
                warning.code, warning.origin, warning.columns, warning.message
            );
        }
    }
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("table_batch=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => match run_batch(&args) {
            Ok(stats) => {
                if args.json {
                    match serde_json::to_string_pretty(&stats) {
                        Ok(json) => println!("{json}"),
                        Err(error) => eprintln!("error: failed to encode statistics: {error}"),
                    }
                }
                if stats.fail == 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(1)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Merge(args) => match run_merge(&args) {
            Ok(report) => {
                log_merge_report(&report, args.verbose);
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
