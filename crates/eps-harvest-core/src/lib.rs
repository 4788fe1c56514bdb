use std::fmt;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use thiserror::Error;

pub mod config_file;

/// The publication date of an analyst report.
///
/// Serialized as `DD/MM/YYYY`, the form the brokerage sites publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportDate(NaiveDate);

impl ReportDate {
    /// Build a date from its parts, rejecting impossible calendar dates.
    pub fn from_dmy(day: u32, month: u32, year: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// `(day, month, year)`.
    pub fn as_tuple(&self) -> (u32, u32, i32) {
        (self.day(), self.month(), self.year())
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day(), self.month(), self.year())
    }
}

impl Serialize for ReportDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An EPS figure as printed in the report.
///
/// Integers are kept as integers so that `3679` is written back as `3679`
/// rather than `3679.0`. Equality compares the numeric value.
#[derive(Debug, Clone, Copy)]
pub enum EpsValue {
    Integer(i64),
    Decimal(f64),
}

impl EpsValue {
    pub fn as_f64(self) -> f64 {
        match self {
            EpsValue::Integer(v) => v as f64,
            EpsValue::Decimal(v) => v,
        }
    }
}

impl PartialEq for EpsValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl fmt::Display for EpsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpsValue::Integer(v) => write!(f, "{}", v),
            EpsValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for EpsValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EpsValue::Integer(v) => serializer.serialize_i64(*v),
            EpsValue::Decimal(v) => serializer.serialize_f64(*v),
        }
    }
}

/// One `(security, year, EPS)` observation extracted from a report.
///
/// Field order matches the persisted row layout:
/// `year, clean_year, eps, is_forecast, report_date, sec_code, firm, url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpsRecord {
    /// Year label exactly as found in the document (`2022F`, `Dec-21`, ...).
    #[serde(rename = "year")]
    pub raw_year: String,
    /// Validated 4-digit year.
    pub clean_year: String,
    #[serde(rename = "eps")]
    pub eps_value: EpsValue,
    /// `clean_year >= report year`.
    pub is_forecast: bool,
    pub report_date: ReportDate,
    pub sec_code: String,
    pub firm: Option<String>,
    pub url: Option<String>,
}

impl EpsRecord {
    /// Numeric year. `clean_year` is always 4 validated digits.
    pub fn year(&self) -> i32 {
        self.clean_year.parse().unwrap_or_default()
    }
}

/// A single positioned character (or ligature) on a page.
///
/// Coordinates are in PDF points with the origin at the top-left corner of
/// the page, `top < bottom`.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Glyph {
    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }
}

/// A straight ruling line drawn on the page (table border, separator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Ruling {
    /// Build a ruling from two end points, normalizing orientation.
    pub fn from_points(xa: f64, ya: f64, xb: f64, yb: f64) -> Self {
        Self {
            x0: xa.min(xb),
            top: ya.min(yb),
            x1: xa.max(xb),
            bottom: ya.max(yb),
        }
    }

    pub fn is_horizontal(&self, tolerance: f64) -> bool {
        self.bottom - self.top <= tolerance && self.x1 - self.x0 > tolerance
    }

    pub fn is_vertical(&self, tolerance: f64) -> bool {
        self.x1 - self.x0 <= tolerance && self.bottom - self.top > tolerance
    }
}

/// Everything the extraction engine needs from one PDF page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// 1-based page number.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub glyphs: Vec<Glyph>,
    pub rulings: Vec<Ruling>,
}

/// A table grid as found on a page: ordered rows of ordered cells.
///
/// `None` marks a cell position with no text in it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub page: usize,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Convenience constructor for tables whose cells are all present.
    pub fn from_strings<S: AsRef<str>>(page: usize, rows: &[Vec<S>]) -> Self {
        Self {
            page,
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| Some(c.as_ref().to_string())).collect())
                .collect(),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract page content: {0}")]
    ExtractionError(String),
    #[error("PDF library aborted: {0}")]
    Panicked(String),
}

/// Trait for PDF layout extraction backends.
///
/// Implementors provide the low-level step of turning a file into positioned
/// glyphs and ruling lines; table finding and EPS parsing live in
/// `eps-harvest-parsing`. Each call opens, reads and closes its own document,
/// so one backend value can be shared across worker threads.
pub trait PdfBackend: Send + Sync {
    /// Extract the layout of every page, in page order.
    fn extract_layout(&self, path: &Path) -> Result<Vec<PageLayout>, BackendError>;
}
