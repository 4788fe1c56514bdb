//! Pure text normalizers: report dates, fiscal-year labels and numbers.

use once_cell::sync::Lazy;
use regex::Regex;

use eps_harvest_core::{EpsValue, ReportDate};

/// Parse a report date written as `DD/MM/YYYY` or `YYYY-MM-DD`.
///
/// The date may be embedded in surrounding text. Returns `None` when no
/// date is found or when the parts do not form a real calendar date
/// (`31/02/2023`, `29/02/2021`).
pub fn parse_date(text: &str) -> Option<ReportDate> {
    static DMY_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());
    static ISO_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").unwrap());

    let text = text.trim();

    let (day, month, year) = if let Some(caps) = DMY_RE.captures(text) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    } else if let Some(caps) = ISO_RE.captures(text) {
        (caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?)
    } else {
        tracing::debug!(text, "no date found");
        return None;
    };

    let date = ReportDate::from_dmy(day, month, year);
    if date.is_none() {
        tracing::debug!(day, month, year, "invalid calendar date");
    }
    date
}

/// Outcome of [`normalize_year`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearLabel {
    /// A recognized label reduced to its 4-digit year.
    Normalized(String),
    /// No known label shape matched; carries the trimmed input unchanged.
    Unmatched(String),
}

impl YearLabel {
    pub fn as_str(&self) -> &str {
        match self {
            YearLabel::Normalized(s) | YearLabel::Unmatched(s) => s,
        }
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, YearLabel::Normalized(_))
    }

    /// The year to use, if any. Unmatched labels are only returned when
    /// `passthrough` is set, and then only if they already are a valid year.
    pub fn resolve(&self, passthrough: bool) -> Option<&str> {
        match self {
            YearLabel::Normalized(s) if verify_year(s) => Some(s),
            YearLabel::Unmatched(s) if passthrough && verify_year(s) => Some(s),
            _ => None,
        }
    }
}

/// Reduce a fiscal-year column label to a 4-digit year.
///
/// Recognized shapes, tried in order:
/// - `2022`, `2022F`, `2021E`, `2021 cũ`
/// - `31/12/2023`, `31/12/23`
/// - `Dec-21`, `Dec 21`, `Mar-2020`
/// - `FY22`, `FY2022F`
/// - `F*22`, `F22`, `F*2022`
///
/// Two-digit years pivot at 50: `21` is 2021, `98` is 1998.
pub fn normalize_year(raw: &str) -> YearLabel {
    static QUALIFIER_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\s+(?:cũ|mới|old|new)$").unwrap());
    static FOUR_DIGIT_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^(\d{4})\s?[EF]?$").unwrap());
    static DATE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^\d{1,2}/\d{1,2}/(\d{4}|\d{2})\s?[EF]?$").unwrap());
    static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*[-\s']?(\d{4}|\d{2})[EF]?$",
        )
        .unwrap()
    });
    static FY_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^FY\s?(\d{4}|\d{2})[EF]?$").unwrap());
    static F_STAR_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^F\*?(\d{4}|\d{2})[EF]?$").unwrap());

    let trimmed = raw.trim();
    let label = QUALIFIER_RE.replace(trimmed, "");

    for re in [
        &*FOUR_DIGIT_RE,
        &*DATE_RE,
        &*MONTH_RE,
        &*FY_RE,
        &*F_STAR_RE,
    ] {
        if let Some(caps) = re.captures(&label) {
            return YearLabel::Normalized(expand_year(&caps[1]));
        }
    }

    YearLabel::Unmatched(trimmed.to_string())
}

fn expand_year(digits: &str) -> String {
    if digits.len() == 2 {
        let yy: u32 = digits.parse().unwrap_or_default();
        let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
        year.to_string()
    } else {
        digits.to_string()
    }
}

/// True iff `year` is exactly four ASCII digits within 1900..=2100.
pub fn verify_year(year: &str) -> bool {
    year.len() == 4
        && year.bytes().all(|b| b.is_ascii_digit())
        && year
            .parse::<u32>()
            .is_ok_and(|y| (1900..=2100).contains(&y))
}

/// Parse a printed number, stripping `.` and `,` thousands separators.
///
/// Prefers an integer parse and falls back to a decimal one. Accounting
/// negatives written as `(1,234)` are read as `-1234`. Returns `None` for
/// empty or non-numeric input.
pub fn clean_number(raw: &str) -> Option<EpsValue> {
    let raw = raw.trim();
    let (negative, body) = match raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, raw),
    };

    let digits: String = body.chars().filter(|c| *c != '.' && *c != ',').collect();
    if digits.is_empty() {
        return None;
    }

    let value = if let Ok(v) = digits.parse::<i64>() {
        EpsValue::Integer(v)
    } else {
        match digits.parse::<f64>() {
            Ok(v) if v.is_finite() => EpsValue::Decimal(v),
            _ => return None,
        }
    };

    Some(match (negative, value) {
        (false, v) => v,
        (true, EpsValue::Integer(v)) => EpsValue::Integer(-v),
        (true, EpsValue::Decimal(v)) => EpsValue::Decimal(-v),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_day_first() {
        let d = parse_date("15/06/2023").unwrap();
        assert_eq!(d.as_tuple(), (15, 6, 2023));

        let d = parse_date(" 1/2/2020 ").unwrap();
        assert_eq!(d.as_tuple(), (1, 2, 2020));
    }

    #[test]
    fn test_parse_date_iso() {
        let d = parse_date("2023-12-31").unwrap();
        assert_eq!(d.as_tuple(), (31, 12, 2023));
    }

    #[test]
    fn test_parse_date_embedded_in_text() {
        let d = parse_date("Ngày 05/01/2024 - Báo cáo").unwrap();
        assert_eq!(d.as_tuple(), (5, 1, 2024));
    }

    #[test]
    fn test_parse_date_rejects_invalid() {
        assert!(parse_date("32/01/2020").is_none());
        assert!(parse_date("29/02/2021").is_none());
        assert!(parse_date("31/02/2023").is_none());
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_parse_date_leap_day() {
        assert!(parse_date("29/02/2024").is_some());
    }

    #[test]
    fn test_normalize_year_shapes() {
        let cases = [
            ("2022F", "2022"),
            ("2021E", "2021"),
            ("2020", "2020"),
            ("2021 cũ", "2021"),
            ("2023F mới", "2023"),
            ("Dec-21", "2021"),
            ("Dec 98", "1998"),
            ("FY22", "2022"),
            ("FY2022F", "2022"),
            ("31/12/2023", "2023"),
            ("31/12/23", "2023"),
            ("F*22", "2022"),
            ("F22", "2022"),
            ("F*2024", "2024"),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                normalize_year(raw),
                YearLabel::Normalized(expected.to_string()),
                "label {raw:?}"
            );
        }
    }

    #[test]
    fn test_normalize_year_unmatched_passthrough() {
        let label = normalize_year("  Chỉ số ");
        assert_eq!(label, YearLabel::Unmatched("Chỉ số".to_string()));
        assert_eq!(label.as_str(), "Chỉ số");
        assert!(!label.is_normalized());
        assert_eq!(label.resolve(true), None);
    }

    #[test]
    fn test_year_label_resolve() {
        assert_eq!(normalize_year("2023F").resolve(false), Some("2023"));
        // Recognized shape but out of range.
        assert_eq!(normalize_year("3023").resolve(false), None);
        // A bare year hidden behind an unknown qualifier is only kept with passthrough.
        let odd = YearLabel::Unmatched("2022".to_string());
        assert_eq!(odd.resolve(false), None);
        assert_eq!(odd.resolve(true), Some("2022"));
    }

    #[test]
    fn test_verify_year() {
        assert!(verify_year("2023"));
        assert!(verify_year("1900"));
        assert!(verify_year("2100"));
        assert!(!verify_year("23"));
        assert!(!verify_year("3023"));
        assert!(!verify_year("1899"));
        assert!(!verify_year("20a3"));
        assert!(!verify_year("+202"));
    }

    #[test]
    fn test_clean_number() {
        assert_eq!(clean_number("3,679"), Some(EpsValue::Integer(3679)));
        assert_eq!(clean_number("4.726"), Some(EpsValue::Integer(4726)));
        assert_eq!(clean_number("1.234,56"), Some(EpsValue::Integer(123456)));
        assert_eq!(clean_number("(1,234)"), Some(EpsValue::Integer(-1234)));
        assert_eq!(clean_number("-250"), Some(EpsValue::Integer(-250)));
        assert_eq!(clean_number(""), None);
        assert_eq!(clean_number("   "), None);
        assert_eq!(clean_number("n/a"), None);
        assert_eq!(clean_number("NaN"), None);
        assert_eq!(clean_number(".,"), None);
    }
}
