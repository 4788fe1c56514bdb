//! EPS extraction from plain text, for documents whose tables could not be
//! recovered.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::candidate::{self, EpsCandidate};
use crate::config::EpsParsingConfig;

/// `EPS` followed by exactly four numeric groups on the same line.
static DEFAULT_EPS_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bEPS\b[^\d\n]*(\(?-?[\d.,]+\)?)[ \t]+(\(?-?[\d.,]+\)?)[ \t]+(\(?-?[\d.,]+\)?)[ \t]+(\(?-?[\d.,]+\)?)(?:[ \t]|$)",
    )
    .unwrap()
});

/// Year labels in running text, in the shapes `normalize_year` understands.
static YEAR_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:19|20)\d{2}[EF]?|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*[-']?\d{2,4}[EF]?|\d{1,2}/\d{1,2}/\d{2,4}[EF]?|FY\s?\d{2,4}[EF]?|F\*?(?:\d{4}|\d{2})[EF]?)\b",
    )
    .unwrap()
});

fn year_tokens(line: &str) -> Vec<&str> {
    YEAR_TOKEN_RE.find_iter(line).map(|m| m.as_str()).collect()
}

/// Extract EPS candidates from free text.
///
/// For every line carrying an EPS label and four values, the year sequence
/// is taken from the closest line above it that lists at least two years,
/// or failing that the first such line anywhere in the text. Years and
/// values are paired positionally. The first EPS line that produces any
/// candidate wins.
pub fn parse_text(text: &str, report_year: i32, config: &EpsParsingConfig) -> Vec<EpsCandidate> {
    let eps_re = config.text_eps_re.as_ref().unwrap_or(&*DEFAULT_EPS_LINE_RE);
    let lines: Vec<&str> = text.lines().collect();

    let year_lines: Vec<(usize, Vec<&str>)> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| (i, year_tokens(line)))
        .filter(|(_, years)| years.len() >= 2)
        .collect();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = eps_re.captures(line) else {
            continue;
        };
        let values: Vec<&str> = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str())
            .collect();

        let years = year_lines
            .iter()
            .rev()
            .find(|(i, _)| *i < idx)
            .or_else(|| year_lines.first())
            .map(|(_, years)| years);
        let Some(years) = years else {
            tracing::debug!(line = idx, "EPS line without a year sequence");
            continue;
        };

        let candidates: Vec<EpsCandidate> = years
            .iter()
            .zip(values.iter())
            .filter_map(|(year, value)| candidate::validate(year, value, report_year, config))
            .collect();

        if !candidates.is_empty() {
            tracing::debug!(
                line = idx,
                candidates = candidates.len(),
                "EPS values found in text"
            );
            return candidates;
        }
    }

    Vec::new()
}
