use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use eps_harvest_core::config_file::ConfigFile;
use eps_harvest_parsing::{DEFAULT_VALUE_RANGE, EpsParsingConfig, EpsParsingConfigBuilder, TableFlavor};

/// Extraction options shared by every subcommand that opens a PDF.
#[derive(Args, Debug, Default, Clone)]
pub struct ExtractionArgs {
    /// Table finding strategy: stream (whitespace columns) or lattice (ruling lines)
    #[arg(long)]
    pub flavor: Option<TableFlavor>,

    /// Keep EPS values of any magnitude
    #[arg(long)]
    pub no_range: bool,

    /// Smallest plausible EPS value
    #[arg(long)]
    pub min_eps: Option<f64>,

    /// Largest plausible EPS value
    #[arg(long)]
    pub max_eps: Option<f64>,

    /// Do not scan page text when no table yields EPS figures
    #[arg(long)]
    pub no_text_fallback: bool,

    /// Keep only table values the text parser also finds, and require a
    /// supplied ticker to appear on the first pages
    #[arg(long)]
    pub cross_validate: bool,

    /// Keep all table columns and rows instead of narrowing to the EPS block
    #[arg(long)]
    pub no_column_narrowing: bool,

    /// Accept year labels no pattern recognizes if they are plain years
    #[arg(long)]
    pub passthrough_years: bool,

    /// Comma-separated ticker deny-list replacing the built-in one
    #[arg(long, value_delimiter = ',')]
    pub blacklist: Vec<String>,

    /// Comma-separated tickers added to the deny-list
    #[arg(long, value_delimiter = ',')]
    pub extra_blacklist: Vec<String>,

    /// File of valid tickers (CSV with a sec_code column, or one per line)
    #[arg(long)]
    pub valid_codes: Option<PathBuf>,

    /// Password for encrypted PDFs
    #[arg(long)]
    pub password: Option<String>,
}

impl ExtractionArgs {
    /// Fill options left unset on the command line from `EPS_HARVEST_*`
    /// environment variables.
    pub fn with_env(mut self) -> Self {
        self.flavor = self.flavor.or_else(|| {
            std::env::var("EPS_HARVEST_TABLE_FLAVOR")
                .ok()
                .and_then(|v| v.parse().ok())
        });
        self.valid_codes = self
            .valid_codes
            .or_else(|| std::env::var("EPS_HARVEST_VALID_CODES").ok().map(PathBuf::from));
        self.password = self
            .password
            .or_else(|| std::env::var("EPS_HARVEST_PDF_PASSWORD").ok());
        self
    }
}

/// Resolve the parsing configuration: CLI flags > config file > defaults.
pub fn build_config(args: &ExtractionArgs, file: &ConfigFile) -> anyhow::Result<EpsParsingConfig> {
    let extraction = file.extraction.clone().unwrap_or_default();
    let tickers = file.tickers.clone().unwrap_or_default();
    let mut builder = EpsParsingConfigBuilder::new();

    if args.no_range || extraction.range_filter == Some(false) {
        builder = builder.disable_value_range();
    } else {
        let min = args
            .min_eps
            .or(extraction.value_range_min)
            .unwrap_or(DEFAULT_VALUE_RANGE.0);
        let max = args
            .max_eps
            .or(extraction.value_range_max)
            .unwrap_or(DEFAULT_VALUE_RANGE.1);
        if min > max {
            anyhow::bail!("EPS range minimum {} exceeds maximum {}", min, max);
        }
        builder = builder.value_range(min, max);
    }

    if args.no_text_fallback {
        builder = builder.text_fallback(false);
    } else if let Some(enabled) = extraction.text_fallback {
        builder = builder.text_fallback(enabled);
    }

    builder = builder
        .cross_validate(args.cross_validate || extraction.cross_validate.unwrap_or(false))
        .column_narrowing(!args.no_column_narrowing && extraction.column_narrowing.unwrap_or(true))
        .passthrough_unmatched_years(
            args.passthrough_years || extraction.passthrough_unmatched_years.unwrap_or(false),
        );

    let flavor = match (args.flavor, extraction.table_flavor.as_deref()) {
        (Some(flavor), _) => Some(flavor),
        (None, Some(name)) => Some(
            name.parse::<TableFlavor>()
                .map_err(|e| anyhow::anyhow!("config file: {}", e))?,
        ),
        (None, None) => None,
    };
    if let Some(flavor) = flavor {
        builder = builder.table_flavor(flavor);
    }

    if let Some(n) = extraction.ticker_scan_pages {
        builder = builder.ticker_scan_pages(n);
    }
    if let Some(n) = extraction.ticker_check_pages {
        builder = builder.ticker_check_pages(n);
    }

    let replacement = if args.blacklist.is_empty() {
        tickers.blacklist
    } else {
        Some(args.blacklist.clone())
    };
    if let Some(codes) = replacement {
        builder = builder.set_ticker_blacklist(upper(codes));
    }
    let extras = tickers
        .extra_blacklist
        .unwrap_or_default()
        .into_iter()
        .chain(args.extra_blacklist.iter().cloned());
    for code in upper(extras) {
        builder = builder.add_ticker_blacklist(code);
    }

    Ok(builder.build()?)
}

/// Load the ticker allow-list named on the command line or in the config file.
pub fn resolve_valid_codes(
    args: &ExtractionArgs,
    file: &ConfigFile,
) -> anyhow::Result<Option<HashSet<String>>> {
    let path = args.valid_codes.clone().or_else(|| {
        file.tickers
            .as_ref()
            .and_then(|t| t.valid_codes_path.as_ref())
            .map(PathBuf::from)
    });
    let Some(path) = path else {
        return Ok(None);
    };
    let codes = eps_harvest_reporting::load_valid_codes(&path)
        .with_context(|| format!("loading valid tickers from {}", path.display()))?;
    tracing::debug!(path = %path.display(), codes = codes.len(), "valid tickers loaded");
    Ok(Some(codes))
}

/// CSV destination: flag > `EPS_HARVEST_OUTPUT` > config file.
pub fn resolve_output(flag: Option<PathBuf>, file: &ConfigFile) -> Option<PathBuf> {
    flag.or_else(|| std::env::var("EPS_HARVEST_OUTPUT").ok().map(PathBuf::from))
        .or_else(|| {
            file.output
                .as_ref()
                .and_then(|o| o.csv_path.as_ref())
                .map(PathBuf::from)
        })
}

/// Worker count: flag > `EPS_HARVEST_WORKERS` > config file > available cores.
pub fn resolve_workers(flag: Option<usize>, file: &ConfigFile) -> usize {
    flag.or_else(|| {
        std::env::var("EPS_HARVEST_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
    })
    .or_else(|| file.batch.as_ref().and_then(|b| b.num_workers))
    .unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    })
    .max(1)
}

fn upper(codes: impl IntoIterator<Item = String>) -> Vec<String> {
    codes
        .into_iter()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}
