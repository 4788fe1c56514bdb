use eps_harvest_core::{EpsRecord, EpsValue, ReportDate};

use crate::config::EpsParsingConfig;
use crate::normalize::{clean_number, normalize_year};

/// A validated `(year, EPS)` pair before report metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EpsCandidate {
    pub raw_year: String,
    pub clean_year: String,
    pub eps_value: EpsValue,
    pub is_forecast: bool,
}

impl EpsCandidate {
    pub fn into_record(
        self,
        report_date: ReportDate,
        sec_code: &str,
        firm: Option<&str>,
        url: Option<&str>,
    ) -> EpsRecord {
        EpsRecord {
            raw_year: self.raw_year,
            clean_year: self.clean_year,
            eps_value: self.eps_value,
            is_forecast: self.is_forecast,
            report_date,
            sec_code: sec_code.to_string(),
            firm: firm.map(str::to_string),
            url: url.map(str::to_string),
        }
    }

    /// Key used to compare results across strategies.
    pub(crate) fn same_observation(&self, other: &EpsCandidate) -> bool {
        self.clean_year == other.clean_year && self.eps_value == other.eps_value
    }
}

/// Validate one `(year label, value)` pair.
///
/// The value must parse and, when a range is configured, fall inside it.
/// The year label must normalize to a verified 4-digit year. A year is a
/// forecast when it is not before the report's own year.
pub(crate) fn validate(
    year_cell: &str,
    value_cell: &str,
    report_year: i32,
    config: &EpsParsingConfig,
) -> Option<EpsCandidate> {
    let Some(eps_value) = clean_number(value_cell) else {
        tracing::debug!(value = value_cell, "unparseable EPS value");
        return None;
    };

    if let Some((min, max)) = config.value_range {
        let v = eps_value.as_f64();
        if v < min || v > max {
            tracing::debug!(value = v, min, max, "EPS value outside plausible range");
            return None;
        }
    }

    let label = normalize_year(year_cell);
    let Some(clean_year) = label.resolve(config.passthrough_unmatched_years) else {
        tracing::debug!(year = year_cell, "unusable year label");
        return None;
    };
    let year: i32 = clean_year.parse().ok()?;

    Some(EpsCandidate {
        raw_year: year_cell.trim().to_string(),
        clean_year: clean_year.to_string(),
        eps_value,
        is_forecast: year >= report_year,
    })
}
