//! EPS extraction from a single table grid.

use once_cell::sync::Lazy;
use regex::Regex;

use eps_harvest_core::RawTable;

use crate::candidate::{self, EpsCandidate};
use crate::config::EpsParsingConfig;

/// Labels of the EPS row.
pub static DEFAULT_EPS_LABEL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bEPS\b").unwrap(),
        Regex::new(r"(?i)lãi\s+cơ\s+bản\s+trên\s+(?:mỗi\s+)?cổ\s+phiếu").unwrap(),
    ]
});

/// Year-like header cells: `2022`, `2023F`, `Dec-21`, `31/12/2023`, `FY24E`.
/// Matched anywhere in the cell, so `Năm 2023F` marks its row as a header.
pub static DEFAULT_YEAR_HEADER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:19|20)\d{2}\s?[EF]?\b").unwrap(),
        Regex::new(
            r"(?i)\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*[-\s']?\d{2,4}[EF]?\b",
        )
        .unwrap(),
        Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}[EF]?\b").unwrap(),
        Regex::new(r"(?i)\bFY\s?\d{2,4}[EF]?\b").unwrap(),
    ]
});

/// Compiled patterns for one parsing run.
pub(crate) struct RowMatchers {
    eps_labels: Vec<Regex>,
    year_headers: Vec<Regex>,
}

impl RowMatchers {
    pub(crate) fn from_config(config: &EpsParsingConfig) -> Self {
        Self {
            eps_labels: config.eps_label_patterns(),
            year_headers: config.year_header_patterns(),
        }
    }

    fn is_eps_label(&self, cell: &str) -> bool {
        self.eps_labels.iter().any(|re| re.is_match(cell))
    }

    fn is_year_like(&self, cell: &str) -> bool {
        self.year_headers.iter().any(|re| re.is_match(cell))
    }

    fn is_eps_row(&self, row: &[String]) -> bool {
        row.iter().any(|c| self.is_eps_label(c))
    }

    fn has_year(&self, row: &[String]) -> bool {
        row.iter().any(|c| self.is_year_like(c))
    }
}

/// Trim every cell, map missing cells to `""`, drop rows with no text.
fn normalize_cells(table: &RawTable) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| c.as_deref().unwrap_or("").trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .collect()
}

/// Drop columns left of the EPS label, then rows that carry neither an EPS
/// label nor a year-like cell.
fn narrow(rows: Vec<Vec<String>>, matchers: &RowMatchers) -> Vec<Vec<String>> {
    let label_col = rows
        .iter()
        .filter_map(|row| row.iter().position(|c| matchers.is_eps_label(c)))
        .min()
        .unwrap_or(0);

    rows.into_iter()
        .map(|row| row.into_iter().skip(label_col).collect::<Vec<_>>())
        .filter(|row| matchers.is_eps_row(row) || matchers.has_year(row))
        .collect()
}

/// Extract EPS candidates from one table.
///
/// Values in each EPS row are paired positionally with the header row,
/// skipping column 0 on both sides. Pairing stops at the shorter row.
pub fn parse_table(
    table: &RawTable,
    report_year: i32,
    config: &EpsParsingConfig,
) -> Vec<EpsCandidate> {
    parse_table_with(table, report_year, config, &RowMatchers::from_config(config))
}

pub(crate) fn parse_table_with(
    table: &RawTable,
    report_year: i32,
    config: &EpsParsingConfig,
    matchers: &RowMatchers,
) -> Vec<EpsCandidate> {
    let mut rows = normalize_cells(table);

    if !rows.iter().any(|r| matchers.is_eps_row(r)) {
        return Vec::new();
    }

    if config.column_narrowing {
        rows = narrow(rows, matchers);
    }

    if rows.len() < 2 {
        tracing::warn!(
            page = table.page,
            rows = rows.len(),
            "skipping malformed table: EPS row without a header row"
        );
        return Vec::new();
    }

    let eps_rows: Vec<usize> = (0..rows.len())
        .filter(|&i| matchers.is_eps_row(&rows[i]))
        .collect();
    let header_idx = (0..rows.len())
        .find(|&i| !eps_rows.contains(&i) && matchers.has_year(&rows[i]))
        .unwrap_or(0);
    let header = &rows[header_idx];

    let mut candidates = Vec::new();
    for &i in eps_rows.iter().filter(|&&i| i != header_idx) {
        let eps_row = &rows[i];
        if eps_row.len() != header.len() {
            tracing::debug!(
                page = table.page,
                header_len = header.len(),
                row_len = eps_row.len(),
                "ragged EPS row, pairing up to the shorter length"
            );
        }
        for (year_cell, value_cell) in header.iter().skip(1).zip(eps_row.iter().skip(1)) {
            if year_cell.is_empty() || value_cell.is_empty() {
                continue;
            }
            if let Some(c) = candidate::validate(year_cell, value_cell, report_year, config) {
                candidates.push(c);
            }
        }
    }

    tracing::debug!(
        page = table.page,
        candidates = candidates.len(),
        "table parsed"
    );
    candidates
}

/// Flatten a table to text: cells joined by spaces, rows by newlines.
pub fn table_text(table: &RawTable) -> String {
    table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|c| c.as_deref().map(str::trim))
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EpsParsingConfigBuilder;
    use eps_harvest_core::EpsValue;

    fn summary(candidates: &[EpsCandidate]) -> Vec<(&str, f64, bool)> {
        candidates
            .iter()
            .map(|c| (c.clean_year.as_str(), c.eps_value.as_f64(), c.is_forecast))
            .collect()
    }

    #[test]
    fn test_header_and_eps_row() {
        let table = RawTable::from_strings(
            1,
            &[
                vec!["Chỉ số", "2022", "2023F", "2024F"],
                vec!["EPS", "3,679", "3,993", "4,726"],
            ],
        );
        let candidates = parse_table(&table, 2023, &EpsParsingConfig::default());
        assert_eq!(
            summary(&candidates),
            vec![
                ("2022", 3679.0, false),
                ("2023", 3993.0, true),
                ("2024", 4726.0, true),
            ]
        );
        assert_eq!(candidates[0].eps_value, EpsValue::Integer(3679));
    }

    #[test]
    fn test_no_eps_row_is_empty() {
        let table = RawTable::from_strings(
            1,
            &[
                vec!["Chỉ số", "2022", "2023F"],
                vec!["Doanh thu", "12,345", "13,000"],
            ],
        );
        assert!(parse_table(&table, 2023, &EpsParsingConfig::default()).is_empty());
    }

    #[test]
    fn test_vietnamese_label() {
        let table = RawTable::from_strings(
            3,
            &[
                vec!["Năm tài chính", "2021", "2022"],
                vec!["Lãi cơ bản trên cổ phiếu (VND)", "2,150", "2,480"],
            ],
        );
        let candidates = parse_table(&table, 2023, &EpsParsingConfig::default());
        assert_eq!(
            summary(&candidates),
            vec![("2021", 2150.0, false), ("2022", 2480.0, false)]
        );
    }

    #[test]
    fn test_header_found_below_title_rows() {
        let table = RawTable {
            page: 1,
            rows: vec![
                vec![Some("Tóm tắt dự phóng".into()), None, None],
                vec![None, None, None],
                vec![Some("Đơn vị: tỷ đồng".into()), Some("FY22".into()), Some("FY23F".into())],
                vec![Some("EPS (đồng)".into()), Some("5.010".into()), Some("5.870".into())],
            ],
        };
        let config = EpsParsingConfigBuilder::new()
            .column_narrowing(false)
            .build()
            .unwrap();
        let candidates = parse_table(&table, 2023, &config);
        assert_eq!(
            summary(&candidates),
            vec![("2022", 5010.0, false), ("2023", 5870.0, true)]
        );
    }

    #[test]
    fn test_year_found_inside_header_cell() {
        let matchers = RowMatchers::from_config(&EpsParsingConfig::default());
        assert!(matchers.is_year_like("Năm 2023F"));
        assert!(matchers.is_year_like("Kết thúc 31/12/2022"));
        assert!(matchers.is_year_like("Dự phóng FY24E"));
        assert!(!matchers.is_year_like("3,993"));
        assert!(!matchers.is_year_like("Doanh thu"));
    }

    #[test]
    fn test_embedded_year_row_survives_narrowing() {
        // Without the header row the table would collapse to its EPS row.
        let rows = vec![
            vec!["Chỉ tiêu".to_string(), "Năm 2022".to_string(), "Năm 2023F".to_string()],
            vec!["Lợi nhuận".to_string(), "1,200".to_string(), "1,350".to_string()],
            vec!["EPS".to_string(), "3,000".to_string(), "3,300".to_string()],
        ];
        let matchers = RowMatchers::from_config(&EpsParsingConfig::default());
        let narrowed = narrow(rows, &matchers);
        assert_eq!(narrowed.len(), 2);
        assert_eq!(narrowed[0][1], "Năm 2022");
    }

    #[test]
    fn test_narrowing_drops_commentary_columns() {
        let table = RawTable::from_strings(
            1,
            &[
                vec!["Nhận định", "", "2022", "2023F"],
                vec!["Tăng trưởng ổn định", "Doanh thu", "10,000", "11,000"],
                vec!["", "EPS", "3,100", "3,400"],
            ],
        );
        let candidates = parse_table(&table, 2023, &EpsParsingConfig::default());
        assert_eq!(
            summary(&candidates),
            vec![("2022", 3100.0, false), ("2023", 3400.0, true)]
        );
    }

    #[test]
    fn test_ragged_rows_truncate() {
        let table = RawTable::from_strings(
            1,
            &[
                vec!["", "2022", "2023F", "2024F", "2025F"],
                vec!["EPS", "3,000", "3,300"],
            ],
        );
        let candidates = parse_table(&table, 2023, &EpsParsingConfig::default());
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_out_of_range_value_dropped_not_table() {
        let table = RawTable::from_strings(
            1,
            &[
                vec!["", "2022", "2023F", "2024F"],
                vec!["EPS", "3,000", "45", "3,600"],
            ],
        );
        let candidates = parse_table(&table, 2023, &EpsParsingConfig::default());
        assert_eq!(
            summary(&candidates),
            vec![("2022", 3000.0, false), ("2024", 3600.0, true)]
        );
    }

    #[test]
    fn test_single_row_table_is_skipped() {
        let table = RawTable::from_strings(1, &[vec!["EPS", "3,000", "3,300"]]);
        assert!(parse_table(&table, 2023, &EpsParsingConfig::default()).is_empty());
    }

    #[test]
    fn test_custom_label_pattern() {
        let table = RawTable::from_strings(
            1,
            &[vec!["", "2022", "2023F"], vec!["Earnings/share", "3,000", "3,300"]],
        );
        assert!(parse_table(&table, 2023, &EpsParsingConfig::default()).is_empty());

        let config = EpsParsingConfigBuilder::new()
            .add_eps_label_pattern(r"(?i)earnings\s*/\s*share".to_string())
            .build()
            .unwrap();
        assert_eq!(parse_table(&table, 2023, &config).len(), 2);
    }

    #[test]
    fn test_table_text() {
        let table = RawTable {
            page: 1,
            rows: vec![
                vec![Some("EPS".into()), None, Some(" 4,000 ".into())],
                vec![None, None],
            ],
        };
        assert_eq!(table_text(&table), "EPS 4,000");
    }
}
