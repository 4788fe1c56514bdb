use std::fs::File;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use eps_harvest_core::config_file;
use eps_harvest_parsing::{EpsExtractor, ExtractionRequest, PdfBackend};
use eps_harvest_pdf::PdfExtractBackend;
use eps_harvest_reporting::CsvSink;

mod batch;
mod output;
mod settings;

use output::ColorMode;
use settings::ExtractionArgs;

/// Analyst report EPS harvester - pull per-year EPS figures out of brokerage PDF reports
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract EPS records from a single report
    Extract {
        /// Path to the report PDF
        pdf: PathBuf,

        /// Publication date of the report (DD/MM/YYYY or YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Ticker of the covered company; detected from the report when omitted
        #[arg(long)]
        sec_code: Option<String>,

        /// Brokerage that published the report
        #[arg(long)]
        firm: Option<String>,

        /// Source URL of the report
        #[arg(long)]
        url: Option<String>,

        /// Append the records to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Extract every report listed in a manifest CSV
    /// (columns: pdf_path, report_date, sec_code, url, firm)
    Batch {
        /// Path to the manifest CSV
        manifest: PathBuf,

        /// CSV file the records are appended to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of reports extracted concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Skip reports published before this year
        #[arg(long)]
        min_report_year: Option<i32>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Print the ticker a report is about
    DetectTicker {
        /// Path to the report PDF
        pdf: PathBuf,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Command::Extract {
            pdf,
            date,
            sec_code,
            firm,
            url,
            output,
            no_color,
            extraction,
        } => {
            let request = ExtractionRequest {
                pdf_path: pdf,
                report_date: date,
                sec_code,
                firm,
                url,
                ..Default::default()
            };
            extract(request, output, no_color, extraction.with_env()).await
        }
        Command::Batch {
            manifest,
            output,
            workers,
            min_report_year,
            no_color,
            extraction,
        } => {
            run_batch(
                manifest,
                output,
                workers,
                min_report_year,
                no_color,
                extraction.with_env(),
            )
            .await
        }
        Command::DetectTicker { pdf, extraction } => detect_ticker(pdf, extraction.with_env()),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` level.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn backend(args: &ExtractionArgs) -> PdfExtractBackend {
    match &args.password {
        Some(password) => PdfExtractBackend::new().with_password(password.as_str()),
        None => PdfExtractBackend::new(),
    }
}

async fn extract(
    mut request: ExtractionRequest,
    output: Option<PathBuf>,
    no_color: bool,
    args: ExtractionArgs,
) -> anyhow::Result<()> {
    // Resolve configuration: CLI flags > env vars > config file > defaults
    let file_config = config_file::load_config();
    let config = settings::build_config(&args, &file_config)?;
    request.valid_codes = settings::resolve_valid_codes(&args, &file_config)?;
    let output = settings::resolve_output(output, &file_config);

    let color = ColorMode(!no_color && std::io::stdout().is_terminal());
    let extractor = EpsExtractor::with_config(config);
    let backend = backend(&args);

    let pdf = request.pdf_path.clone();
    let records = tokio::task::spawn_blocking(move || extractor.try_extract(&request, &backend))
        .await?
        .with_context(|| format!("extracting {}", pdf.display()))?;

    let mut stdout = std::io::stdout();
    output::print_records(&mut stdout, &pdf, &records, color)?;

    if let Some(path) = output {
        let written = CsvSink::new(&path).append(&records)?;
        writeln!(stdout, "Appended {} rows to {}", written, path.display())?;
    }
    Ok(())
}

async fn run_batch(
    manifest: PathBuf,
    output: Option<PathBuf>,
    workers: Option<usize>,
    min_report_year: Option<i32>,
    no_color: bool,
    args: ExtractionArgs,
) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let file_config = config_file::load_config();
    let config = settings::build_config(&args, &file_config)?;
    let Some(output) = settings::resolve_output(output, &file_config) else {
        anyhow::bail!(
            "No output CSV given. Pass --output, set EPS_HARVEST_OUTPUT, or set output.csv_path in {}",
            config_file::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".eps-harvest.toml".to_string())
        );
    };
    let options = batch::BatchOptions {
        workers: settings::resolve_workers(workers, &file_config),
        min_report_year: min_report_year
            .or_else(|| file_config.batch.as_ref().and_then(|b| b.min_report_year)),
        valid_codes: settings::resolve_valid_codes(&args, &file_config)?,
    };

    let rows = batch::read_manifest(&manifest)?;
    tracing::info!(
        manifest = %manifest.display(),
        reports = rows.len(),
        workers = options.workers,
        "batch started"
    );

    // Ctrl+C stops new reports from starting; finished ones are already on disk.
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel_flag = Arc::clone(&cancelled);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_flag.store(true, Ordering::SeqCst);
        }
    });

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len} (eta {eta})",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    let summary = batch::run_batch(
        rows,
        Arc::new(EpsExtractor::with_config(config)),
        Arc::new(backend(&args)),
        &options,
        &CsvSink::new(&output),
        &progress,
        cancelled,
    )
    .await;
    progress.finish_and_clear();

    let color = ColorMode(!no_color && std::io::stdout().is_terminal());
    output::print_batch_summary(&mut std::io::stdout(), &summary, &output, color)?;
    Ok(())
}

fn detect_ticker(pdf: PathBuf, args: ExtractionArgs) -> anyhow::Result<()> {
    let file_config = config_file::load_config();
    let config = settings::build_config(&args, &file_config)?;
    let valid_codes = settings::resolve_valid_codes(&args, &file_config)?;

    let pages = backend(&args)
        .extract_layout(&pdf)
        .with_context(|| format!("reading {}", pdf.display()))?;
    let extractor = EpsExtractor::with_config(config);
    match extractor.detect_ticker(&pages, valid_codes.as_ref(), None) {
        Some(code) => {
            println!("{}", code);
            Ok(())
        }
        None => anyhow::bail!("No ticker found in {}", pdf.display()),
    }
}
