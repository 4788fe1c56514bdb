use thiserror::Error;

pub mod candidate;
pub mod config;
pub mod cross_check;
pub mod extractor;
pub mod layout;
pub mod normalize;
pub mod table_parser;
pub mod tables;
pub mod text_parser;
pub mod ticker;

pub use candidate::EpsCandidate;
pub use config::{DEFAULT_VALUE_RANGE, EpsParsingConfig, EpsParsingConfigBuilder, ListOverride};
pub use extractor::{EpsExtractor, ExtractionRequest};
pub use normalize::{YearLabel, clean_number, normalize_year, parse_date, verify_year};
pub use tables::TableFlavor;
pub use ticker::{DEFAULT_TICKER_BLACKLIST, TickerDetector};
// Re-export domain types from core (canonical definitions live there)
pub use eps_harvest_core::{
    BackendError, EpsRecord, EpsValue, PageLayout, PdfBackend, RawTable, ReportDate,
};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid report date: {0:?}")]
    InvalidReportDate(String),
    #[error("no ticker could be identified in the document")]
    TickerNotFound,
    #[error("ticker {0} does not appear on the first pages of the document")]
    TickerNotInDocument(String),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Extract EPS records from a PDF using the given backend and default settings.
///
/// Pipeline:
/// 1. Validate the report date
/// 2. Extract page layouts via `backend`
/// 3. Resolve the ticker (supplied, or detected on the first pages)
/// 4. Find tables and pair EPS rows with their year header
/// 5. Fall back to scanning page text when no table yields anything
/// 6. Attach report metadata to every candidate
pub fn extract_eps(
    request: &ExtractionRequest,
    backend: &dyn PdfBackend,
) -> Result<Vec<EpsRecord>, ExtractError> {
    EpsExtractor::new().try_extract(request, backend)
}
