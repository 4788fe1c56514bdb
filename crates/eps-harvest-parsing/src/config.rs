use regex::Regex;

use crate::tables::TableFlavor;
use crate::ticker::DEFAULT_TICKER_BLACKLIST;

/// Default EPS plausibility bounds, in local-currency units per share.
pub const DEFAULT_VALUE_RANGE: (f64, f64) = (500.0, 18_000.0);

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Configuration for the EPS extraction pipeline.
///
/// Each historical heuristic is a switch here rather than a separate code
/// path: the plausibility range, the text fallback, the table/text consensus
/// filter and the column narrowing step can be combined freely.
/// Use [`EpsParsingConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct EpsParsingConfig {
    // ── candidate validation ──
    /// Inclusive bounds for EPS values. `None` accepts any parsed number.
    pub(crate) value_range: Option<(f64, f64)>,
    /// Let year labels no pattern recognizes through to 4-digit verification.
    pub(crate) passthrough_unmatched_years: bool,

    // ── strategies ──
    /// Run the text parser over the whole document when tables yield nothing.
    pub(crate) text_fallback: bool,
    /// Keep only table results the per-table text parser agrees with.
    pub(crate) cross_validate: bool,
    /// Drop columns left of the EPS label and rows without EPS/year cells.
    pub(crate) column_narrowing: bool,
    pub(crate) table_flavor: TableFlavor,

    // ── ticker ──
    /// Pages scanned when inferring a ticker.
    pub(crate) ticker_scan_pages: usize,
    /// Pages searched when checking that a supplied ticker is present.
    pub(crate) ticker_check_pages: usize,
    pub(crate) ticker_blacklist: ListOverride<String>,

    // ── patterns ──
    /// Patterns identifying an EPS row label.
    pub(crate) eps_label_patterns: ListOverride<Regex>,
    /// Patterns identifying a year-like header cell.
    pub(crate) year_header_patterns: ListOverride<Regex>,
    /// EPS line regex for the text parser; must capture four value groups.
    pub(crate) text_eps_re: Option<Regex>,
}

impl Default for EpsParsingConfig {
    fn default() -> Self {
        Self {
            value_range: Some(DEFAULT_VALUE_RANGE),
            passthrough_unmatched_years: false,
            text_fallback: true,
            cross_validate: false,
            column_narrowing: true,
            table_flavor: TableFlavor::Stream,
            ticker_scan_pages: 3,
            ticker_check_pages: 2,
            ticker_blacklist: ListOverride::Default,
            eps_label_patterns: ListOverride::Default,
            year_header_patterns: ListOverride::Default,
            text_eps_re: None,
        }
    }
}

impl EpsParsingConfig {
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.value_range
    }

    pub fn text_fallback(&self) -> bool {
        self.text_fallback
    }

    pub fn cross_validate(&self) -> bool {
        self.cross_validate
    }

    pub fn table_flavor(&self) -> TableFlavor {
        self.table_flavor
    }

    /// The effective ticker deny-list.
    pub fn ticker_blacklist(&self) -> Vec<String> {
        let defaults: Vec<String> = DEFAULT_TICKER_BLACKLIST
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.ticker_blacklist.resolve(&defaults)
    }

    pub(crate) fn eps_label_patterns(&self) -> Vec<Regex> {
        self.eps_label_patterns
            .resolve(&crate::table_parser::DEFAULT_EPS_LABEL_PATTERNS)
    }

    pub(crate) fn year_header_patterns(&self) -> Vec<Regex> {
        self.year_header_patterns
            .resolve(&crate::table_parser::DEFAULT_YEAR_HEADER_PATTERNS)
    }
}

/// Builder for [`EpsParsingConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct EpsParsingConfigBuilder {
    value_range: Option<Option<(f64, f64)>>,
    passthrough_unmatched_years: Option<bool>,
    text_fallback: Option<bool>,
    cross_validate: Option<bool>,
    column_narrowing: Option<bool>,
    table_flavor: Option<TableFlavor>,
    ticker_scan_pages: Option<usize>,
    ticker_check_pages: Option<usize>,
    ticker_blacklist: ListOverride<String>,
    eps_label_patterns: ListOverrideBuilder,
    year_header_patterns: ListOverrideBuilder,
    text_eps_re: Option<String>,
}

/// Helper for building `ListOverride<Regex>` from string patterns.
#[derive(Debug, Clone, Default)]
enum ListOverrideBuilder {
    #[default]
    Default,
    Replace(Vec<String>),
    Extend(Vec<String>),
}

impl ListOverrideBuilder {
    fn push(&mut self, pattern: String) {
        match self {
            ListOverrideBuilder::Extend(v) => v.push(pattern),
            _ => *self = ListOverrideBuilder::Extend(vec![pattern]),
        }
    }

    fn compile(self) -> Result<ListOverride<Regex>, regex::Error> {
        let compile_all = |patterns: Vec<String>| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        };
        Ok(match self {
            ListOverrideBuilder::Default => ListOverride::Default,
            ListOverrideBuilder::Replace(p) => ListOverride::Replace(compile_all(p)?),
            ListOverrideBuilder::Extend(p) => ListOverride::Extend(compile_all(p)?),
        })
    }
}

impl EpsParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Candidate validation ──

    pub fn value_range(mut self, min: f64, max: f64) -> Self {
        self.value_range = Some(Some((min, max)));
        self
    }

    /// Accept EPS values of any magnitude.
    pub fn disable_value_range(mut self) -> Self {
        self.value_range = Some(None);
        self
    }

    pub fn passthrough_unmatched_years(mut self, enabled: bool) -> Self {
        self.passthrough_unmatched_years = Some(enabled);
        self
    }

    // ── Strategies ──

    pub fn text_fallback(mut self, enabled: bool) -> Self {
        self.text_fallback = Some(enabled);
        self
    }

    pub fn cross_validate(mut self, enabled: bool) -> Self {
        self.cross_validate = Some(enabled);
        self
    }

    pub fn column_narrowing(mut self, enabled: bool) -> Self {
        self.column_narrowing = Some(enabled);
        self
    }

    pub fn table_flavor(mut self, flavor: TableFlavor) -> Self {
        self.table_flavor = Some(flavor);
        self
    }

    // ── Ticker ──

    pub fn ticker_scan_pages(mut self, n: usize) -> Self {
        self.ticker_scan_pages = Some(n);
        self
    }

    pub fn ticker_check_pages(mut self, n: usize) -> Self {
        self.ticker_check_pages = Some(n);
        self
    }

    pub fn set_ticker_blacklist(mut self, codes: Vec<String>) -> Self {
        self.ticker_blacklist = ListOverride::Replace(codes);
        self
    }

    pub fn add_ticker_blacklist(mut self, code: String) -> Self {
        match &mut self.ticker_blacklist {
            ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(code),
            ListOverride::Default => self.ticker_blacklist = ListOverride::Extend(vec![code]),
        }
        self
    }

    // ── Patterns ──

    pub fn set_eps_label_patterns(mut self, patterns: Vec<String>) -> Self {
        self.eps_label_patterns = ListOverrideBuilder::Replace(patterns);
        self
    }

    pub fn add_eps_label_pattern(mut self, pattern: String) -> Self {
        self.eps_label_patterns.push(pattern);
        self
    }

    pub fn set_year_header_patterns(mut self, patterns: Vec<String>) -> Self {
        self.year_header_patterns = ListOverrideBuilder::Replace(patterns);
        self
    }

    pub fn add_year_header_pattern(mut self, pattern: String) -> Self {
        self.year_header_patterns.push(pattern);
        self
    }

    pub fn text_eps_regex(mut self, pattern: &str) -> Self {
        self.text_eps_re = Some(pattern.to_string());
        self
    }

    /// Compile all string patterns into regexes and produce an [`EpsParsingConfig`].
    pub fn build(self) -> Result<EpsParsingConfig, regex::Error> {
        let defaults = EpsParsingConfig::default();
        Ok(EpsParsingConfig {
            value_range: self.value_range.unwrap_or(defaults.value_range),
            passthrough_unmatched_years: self
                .passthrough_unmatched_years
                .unwrap_or(defaults.passthrough_unmatched_years),
            text_fallback: self.text_fallback.unwrap_or(defaults.text_fallback),
            cross_validate: self.cross_validate.unwrap_or(defaults.cross_validate),
            column_narrowing: self.column_narrowing.unwrap_or(defaults.column_narrowing),
            table_flavor: self.table_flavor.unwrap_or(defaults.table_flavor),
            ticker_scan_pages: self.ticker_scan_pages.unwrap_or(defaults.ticker_scan_pages),
            ticker_check_pages: self
                .ticker_check_pages
                .unwrap_or(defaults.ticker_check_pages),
            ticker_blacklist: self.ticker_blacklist,
            eps_label_patterns: self.eps_label_patterns.compile()?,
            year_header_patterns: self.year_header_patterns.compile()?,
            text_eps_re: self.text_eps_re.map(|p| Regex::new(&p)).transpose()?,
        })
    }
}
