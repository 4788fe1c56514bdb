use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use futures_util::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Deserialize;

use eps_harvest_parsing::{EpsExtractor, EpsRecord, ExtractionRequest, PdfBackend, parse_date};
use eps_harvest_reporting::CsvSink;

/// One line of a batch manifest.
///
/// Only `pdf_path` and `report_date` are required; empty cells in the other
/// columns are treated as absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestRow {
    pub pdf_path: PathBuf,
    pub report_date: String,
    #[serde(default)]
    pub sec_code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub firm: Option<String>,
}

impl ManifestRow {
    fn to_request(&self, valid_codes: Option<&HashSet<String>>) -> ExtractionRequest {
        ExtractionRequest {
            pdf_path: self.pdf_path.clone(),
            report_date: self.report_date.clone(),
            sec_code: self.sec_code.clone(),
            valid_codes: valid_codes.cloned(),
            blacklist: None,
            firm: self.firm.clone(),
            url: self.url.clone(),
        }
    }

    fn predates(&self, min_year: Option<i32>) -> bool {
        match (min_year, parse_date(&self.report_date)) {
            (Some(min), Some(date)) => date.year() < min,
            _ => false,
        }
    }
}

/// Read a manifest CSV. Relative PDF paths are resolved against the
/// manifest's directory.
pub fn read_manifest(path: &Path) -> anyhow::Result<Vec<ManifestRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening manifest {}", path.display()))?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<ManifestRow>().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let mut row = row.with_context(|| format!("{}: line {}", path.display(), i + 2))?;
        if row.pdf_path.is_relative() {
            row.pdf_path = base.join(&row.pdf_path);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub workers: usize,
    pub min_report_year: Option<i32>,
    pub valid_codes: Option<HashSet<String>>,
}

/// Counters reported when a batch finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Documents handed to the extractor.
    pub processed: usize,
    /// Documents dated before the minimum report year.
    pub too_old: usize,
    /// Documents that were readable but yielded no records.
    pub empty: usize,
    /// Documents abandoned with an error.
    pub failed: usize,
    /// Documents never started because the batch was interrupted.
    pub cancelled: usize,
    /// Rows appended to the CSV sink.
    pub records: usize,
}

enum Outcome {
    Extracted(Vec<EpsRecord>),
    Failed(String),
    Cancelled,
}

/// Extract every manifest row and append the results to `sink`.
///
/// Up to `options.workers` documents are extracted at once on the blocking
/// thread pool. Rows are appended as each document finishes, so an
/// interrupted batch keeps everything extracted so far. Setting `cancelled`
/// stops new documents from starting.
pub async fn run_batch<B>(
    rows: Vec<ManifestRow>,
    extractor: Arc<EpsExtractor>,
    backend: Arc<B>,
    options: &BatchOptions,
    sink: &CsvSink,
    progress: &ProgressBar,
    cancelled: Arc<AtomicBool>,
) -> BatchSummary
where
    B: PdfBackend + 'static,
{
    let mut summary = BatchSummary::default();

    let (rows, too_old): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|row| !row.predates(options.min_report_year));
    summary.too_old = too_old.len();
    if summary.too_old > 0 {
        tracing::info!(
            skipped = summary.too_old,
            min_report_year = ?options.min_report_year,
            "skipping reports older than the minimum year"
        );
    }

    progress.set_length(rows.len() as u64);
    let valid_codes = options.valid_codes.clone().map(Arc::new);

    let mut outcomes = stream::iter(rows.into_iter().map(|row| {
        let extractor = Arc::clone(&extractor);
        let backend = Arc::clone(&backend);
        let valid_codes = valid_codes.clone();
        let cancelled = Arc::clone(&cancelled);
        async move {
            if cancelled.load(Ordering::SeqCst) {
                return (row.pdf_path, Outcome::Cancelled);
            }
            let request = row.to_request(valid_codes.as_deref());
            let handle = tokio::task::spawn_blocking(move || {
                extractor.try_extract(&request, backend.as_ref())
            });
            let outcome = match handle.await {
                Ok(Ok(records)) => Outcome::Extracted(records),
                Ok(Err(e)) => Outcome::Failed(e.to_string()),
                Err(e) => Outcome::Failed(format!("extraction task failed: {}", e)),
            };
            (row.pdf_path, outcome)
        }
    }))
    .buffer_unordered(options.workers.max(1));

    while let Some((pdf, outcome)) = outcomes.next().await {
        match outcome {
            Outcome::Extracted(records) if records.is_empty() => {
                summary.processed += 1;
                summary.empty += 1;
            }
            Outcome::Extracted(records) => {
                summary.processed += 1;
                match sink.append(&records) {
                    Ok(n) => summary.records += n,
                    Err(e) => {
                        tracing::error!(
                            pdf = %pdf.display(),
                            csv = %sink.path().display(),
                            error = %e,
                            "could not append records"
                        );
                        summary.failed += 1;
                    }
                }
            }
            Outcome::Failed(error) => {
                summary.processed += 1;
                summary.failed += 1;
                tracing::warn!(pdf = %pdf.display(), error = %error, "document skipped");
            }
            Outcome::Cancelled => summary.cancelled += 1,
        }
        if let Some(name) = pdf.file_name() {
            progress.set_message(name.to_string_lossy().into_owned());
        }
        progress.inc(1);
    }

    summary
}
