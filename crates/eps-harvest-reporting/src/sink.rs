use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use eps_harvest_core::EpsRecord;

use crate::ReportingError;

/// Column order of persisted rows.
pub const RECORD_COLUMNS: [&str; 8] = [
    "year",
    "clean_year",
    "eps",
    "is_forecast",
    "report_date",
    "sec_code",
    "firm",
    "url",
];

/// Append-only CSV table of [`EpsRecord`] rows.
///
/// Existing rows are never rewritten. A header row is written only when the
/// file is created (or found empty).
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records`, returning how many rows were written.
    pub fn append(&self, records: &[EpsRecord]) -> Result<usize, ReportingError> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        tracing::debug!(
            path = %self.path.display(),
            rows = records.len(),
            header = needs_header,
            "rows appended"
        );
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eps_harvest_core::{EpsValue, ReportDate};

    fn record(year: &str, eps: EpsValue, forecast: bool) -> EpsRecord {
        EpsRecord {
            raw_year: format!("{}F", year),
            clean_year: year.to_string(),
            eps_value: eps,
            is_forecast: forecast,
            report_date: ReportDate::from_dmy(15, 6, 2023).unwrap(),
            sec_code: "VHM".to_string(),
            firm: Some("MBS".to_string()),
            url: None,
        }
    }

    #[test]
    fn creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("eps.csv");
        let sink = CsvSink::new(&path);

        let written = sink
            .append(&[record("2023", EpsValue::Integer(3993), true)])
            .unwrap();
        assert_eq!(written, 1);

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(RECORD_COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("2023F,2023,3993,true,15/06/2023,VHM,MBS,")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn appends_without_repeating_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eps.csv");
        let sink = CsvSink::new(&path);

        sink.append(&[record("2022", EpsValue::Integer(3679), false)])
            .unwrap();
        sink.append(&[
            record("2023", EpsValue::Integer(3993), true),
            record("2024", EpsValue::Decimal(4726.5), true),
        ])
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines.iter().filter(|l| l.starts_with("year,")).count(), 1);
        assert!(lines[3].starts_with("2024F,2024,4726.5,true,"));
    }

    #[test]
    fn empty_existing_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eps.csv");
        fs::write(&path, "").unwrap();

        CsvSink::new(&path)
            .append(&[record("2023", EpsValue::Integer(3993), true)])
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("year,clean_year,eps,"));
    }

    #[test]
    fn no_records_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eps.csv");
        assert_eq!(CsvSink::new(&path).append(&[]).unwrap(), 0);
        assert!(!path.exists());
    }
}
