use thiserror::Error;

pub mod codes;
pub mod sink;

pub use codes::load_valid_codes;
pub use sink::{CsvSink, RECORD_COLUMNS};

#[derive(Error, Debug)]
pub enum ReportingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("no '{column}' column in {path}")]
    MissingColumn { column: String, path: String },
}
