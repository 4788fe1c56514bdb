use std::collections::HashSet;
use std::path::PathBuf;

use eps_harvest_core::{EpsRecord, PageLayout, PdfBackend, ReportDate};

use crate::candidate::EpsCandidate;
use crate::config::EpsParsingConfig;
use crate::table_parser::{self, RowMatchers};
use crate::ticker::{self, TickerDetector};
use crate::{cross_check, layout, normalize, tables, text_parser, ExtractError};

/// One document to extract, with the metadata its scraper collected.
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    pub pdf_path: PathBuf,
    /// `DD/MM/YYYY` or `YYYY-MM-DD`.
    pub report_date: String,
    /// Ticker supplied by the caller. Skips detection when set.
    pub sec_code: Option<String>,
    /// Allow-list for ticker detection.
    pub valid_codes: Option<HashSet<String>>,
    /// Replaces the configured deny-list for this document.
    pub blacklist: Option<Vec<String>>,
    pub firm: Option<String>,
    pub url: Option<String>,
}

impl ExtractionRequest {
    pub fn new(pdf_path: impl Into<PathBuf>, report_date: impl Into<String>) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            report_date: report_date.into(),
            ..Default::default()
        }
    }

    pub fn sec_code(mut self, code: impl Into<String>) -> Self {
        self.sec_code = Some(code.into());
        self
    }

    pub fn valid_codes(mut self, codes: HashSet<String>) -> Self {
        self.valid_codes = Some(codes);
        self
    }

    pub fn blacklist(mut self, codes: Vec<String>) -> Self {
        self.blacklist = Some(codes);
        self
    }

    pub fn firm(mut self, firm: impl Into<String>) -> Self {
        self.firm = Some(firm.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A configurable EPS extraction pipeline.
///
/// Holds an [`EpsParsingConfig`] and no other state, so one extractor can
/// serve any number of documents concurrently.
pub struct EpsExtractor {
    config: EpsParsingConfig,
}

impl Default for EpsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl EpsExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self {
            config: EpsParsingConfig::default(),
        }
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: EpsParsingConfig) -> Self {
        Self { config }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &EpsParsingConfig {
        &self.config
    }

    /// Extract EPS records, never failing.
    ///
    /// Any reason to abandon the document (bad date, unknown ticker,
    /// unreadable PDF) is logged and yields an empty result, so a batch over
    /// many documents always continues.
    pub fn extract(&self, request: &ExtractionRequest, backend: &dyn PdfBackend) -> Vec<EpsRecord> {
        match self.try_extract(request, backend) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    pdf = %request.pdf_path.display(),
                    error = %e,
                    "document skipped"
                );
                Vec::new()
            }
        }
    }

    /// Extract EPS records, reporting why a document was abandoned.
    ///
    /// An `Ok` with no records means the document was readable but carried
    /// no usable EPS figures.
    pub fn try_extract(
        &self,
        request: &ExtractionRequest,
        backend: &dyn PdfBackend,
    ) -> Result<Vec<EpsRecord>, ExtractError> {
        // The date is checked before the PDF is opened.
        let report_date = resolve_date(&request.report_date)?;
        let pages = backend.extract_layout(&request.pdf_path)?;
        self.run(&pages, request, report_date)
    }

    /// Run the pipeline on already-extracted page layouts.
    pub fn extract_from_pages(
        &self,
        pages: &[PageLayout],
        request: &ExtractionRequest,
    ) -> Result<Vec<EpsRecord>, ExtractError> {
        let report_date = resolve_date(&request.report_date)?;
        self.run(pages, request, report_date)
    }

    /// Infer the ticker from the first pages of a document.
    pub fn detect_ticker(
        &self,
        pages: &[PageLayout],
        valid_codes: Option<&HashSet<String>>,
        blacklist: Option<&[String]>,
    ) -> Option<String> {
        let blacklist = match blacklist {
            Some(codes) => codes.to_vec(),
            None => self.config.ticker_blacklist(),
        };
        let mut detector = TickerDetector::new(blacklist);
        if let Some(codes) = valid_codes {
            detector = detector.with_allowlist(codes.clone());
        }
        let text = layout::document_text(pages, Some(self.config.ticker_scan_pages));
        detector.detect(&text)
    }

    fn resolve_sec_code(
        &self,
        pages: &[PageLayout],
        request: &ExtractionRequest,
    ) -> Result<String, ExtractError> {
        match supplied_code(request) {
            Some(code) => {
                let code = code.to_uppercase();
                if self.config.cross_validate {
                    let text = layout::document_text(pages, Some(self.config.ticker_check_pages));
                    if !ticker::ticker_in_text(&code, &text) {
                        return Err(ExtractError::TickerNotInDocument(code));
                    }
                }
                Ok(code)
            }
            None => self
                .detect_ticker(
                    pages,
                    request.valid_codes.as_ref(),
                    request.blacklist.as_deref(),
                )
                .ok_or(ExtractError::TickerNotFound),
        }
    }

    fn run(
        &self,
        pages: &[PageLayout],
        request: &ExtractionRequest,
        report_date: ReportDate,
    ) -> Result<Vec<EpsRecord>, ExtractError> {
        let sec_code = self.resolve_sec_code(pages, request)?;
        let report_year = report_date.year();
        // Consensus filtering needs a ticker the caller vouches for.
        let consensus = self.config.cross_validate && supplied_code(request).is_some();

        let candidates = self.table_candidates(pages, report_year, consensus);
        let candidates = if candidates.is_empty() && self.config.text_fallback {
            let text = layout::document_text(pages, None);
            let found = text_parser::parse_text(&text, report_year, &self.config);
            if !found.is_empty() {
                tracing::debug!(candidates = found.len(), "text fallback used");
            }
            found
        } else {
            candidates
        };

        let records: Vec<EpsRecord> = candidates
            .into_iter()
            .map(|c| {
                c.into_record(
                    report_date,
                    &sec_code,
                    request.firm.as_deref(),
                    request.url.as_deref(),
                )
            })
            .collect();

        tracing::info!(
            pdf = %request.pdf_path.display(),
            sec_code = %sec_code,
            report_date = %report_date,
            records = records.len(),
            "document extracted"
        );
        Ok(records)
    }

    fn table_candidates(
        &self,
        pages: &[PageLayout],
        report_year: i32,
        consensus: bool,
    ) -> Vec<EpsCandidate> {
        let matchers = RowMatchers::from_config(&self.config);
        let mut candidates = Vec::new();
        for table in tables::find_all_tables(pages, self.config.table_flavor) {
            let structured =
                table_parser::parse_table_with(&table, report_year, &self.config, &matchers);
            let accepted = if consensus {
                let text = text_parser::parse_text(
                    &table_parser::table_text(&table),
                    report_year,
                    &self.config,
                );
                cross_check::cross_validate(structured, text)
            } else {
                structured
            };
            candidates.extend(accepted);
        }
        candidates
    }
}

fn supplied_code(request: &ExtractionRequest) -> Option<&str> {
    request
        .sec_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
}

fn resolve_date(raw: &str) -> Result<ReportDate, ExtractError> {
    normalize::parse_date(raw).ok_or_else(|| ExtractError::InvalidReportDate(raw.to_string()))
}
