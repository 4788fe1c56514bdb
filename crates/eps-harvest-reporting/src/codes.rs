use std::collections::HashSet;
use std::path::Path;

use crate::ReportingError;

const CODE_COLUMN: &str = "sec_code";

/// Load a ticker allow-list.
///
/// Accepts either a CSV file whose header has a `sec_code` column, or a
/// plain list with one code per line (blank lines and `#` comments are
/// skipped). Codes are trimmed and upper-cased.
pub fn load_valid_codes(path: &Path) -> Result<HashSet<String>, ReportingError> {
    let content = std::fs::read_to_string(path)?;
    let first = content.lines().next().unwrap_or("");

    let codes = if first.contains(',') || first.trim().eq_ignore_ascii_case(CODE_COLUMN) {
        codes_from_csv(&content, path)?
    } else {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_uppercase)
            .collect()
    };

    tracing::debug!(path = %path.display(), codes = codes.len(), "valid codes loaded");
    Ok(codes)
}

fn codes_from_csv(content: &str, path: &Path) -> Result<HashSet<String>, ReportingError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(CODE_COLUMN))
        .ok_or_else(|| ReportingError::MissingColumn {
            column: CODE_COLUMN.to_string(),
            path: path.display().to_string(),
        })?;

    let mut codes = HashSet::new();
    for row in reader.records() {
        let row = row?;
        if let Some(code) = row.get(column).map(str::trim).filter(|c| !c.is_empty()) {
            codes.insert(code.to_uppercase());
        }
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_sec_code_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "codes.csv",
            "exchange,sec_code,name\nHOSE,VHM,Vinhomes\nHNX, shs ,SHS\nUPCOM,,\n",
        );
        let codes = load_valid_codes(&path).unwrap();
        let expected: HashSet<String> = ["VHM", "SHS"].iter().map(|s| s.to_string()).collect();
        assert_eq!(codes, expected);
    }

    #[test]
    fn reads_plain_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "codes.txt", "# HOSE\nvhm\nFPT\n\nHT1\n");
        let codes = load_valid_codes(&path).unwrap();
        assert_eq!(codes.len(), 3);
        assert!(codes.contains("VHM"));
        assert!(codes.contains("HT1"));
    }

    #[test]
    fn single_column_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "codes.csv", "sec_code\nVHM\nFPT\n");
        let codes = load_valid_codes(&path).unwrap();
        assert_eq!(codes.len(), 2);
        assert!(!codes.contains("SEC_CODE"));
    }

    #[test]
    fn csv_without_code_column_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "codes.csv", "ticker,name\nVHM,Vinhomes\n");
        assert!(matches!(
            load_valid_codes(&path),
            Err(ReportingError::MissingColumn { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_valid_codes(Path::new("/nonexistent/codes.csv")),
            Err(ReportingError::Io(_))
        ));
    }
}
