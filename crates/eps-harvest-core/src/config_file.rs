use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub extraction: Option<ExtractionConfig>,
    pub tickers: Option<TickersConfig>,
    pub batch: Option<BatchConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Disable to keep EPS values of any magnitude.
    pub range_filter: Option<bool>,
    pub value_range_min: Option<f64>,
    pub value_range_max: Option<f64>,
    pub text_fallback: Option<bool>,
    pub cross_validate: Option<bool>,
    pub column_narrowing: Option<bool>,
    /// `"stream"` or `"lattice"`.
    pub table_flavor: Option<String>,
    pub ticker_scan_pages: Option<usize>,
    pub ticker_check_pages: Option<usize>,
    pub passthrough_unmatched_years: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickersConfig {
    /// Replaces the built-in deny-list.
    pub blacklist: Option<Vec<String>>,
    /// Appended to the deny-list (built-in or replaced).
    pub extra_blacklist: Option<Vec<String>>,
    /// CSV (with a `sec_code` column) or plain list of valid tickers.
    pub valid_codes_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub num_workers: Option<usize>,
    /// Reports published before this year are skipped.
    pub min_report_year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub csv_path: Option<String>,
}

/// Platform config directory path: `<config_dir>/eps-harvest/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("eps-harvest").join("config.toml"))
}

/// Load config by cascading CWD `.eps-harvest.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".eps-harvest.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let extraction = {
        let b = base.extraction.unwrap_or_default();
        let o = overlay.extraction.unwrap_or_default();
        ExtractionConfig {
            range_filter: o.range_filter.or(b.range_filter),
            value_range_min: o.value_range_min.or(b.value_range_min),
            value_range_max: o.value_range_max.or(b.value_range_max),
            text_fallback: o.text_fallback.or(b.text_fallback),
            cross_validate: o.cross_validate.or(b.cross_validate),
            column_narrowing: o.column_narrowing.or(b.column_narrowing),
            table_flavor: o.table_flavor.or(b.table_flavor),
            ticker_scan_pages: o.ticker_scan_pages.or(b.ticker_scan_pages),
            ticker_check_pages: o.ticker_check_pages.or(b.ticker_check_pages),
            passthrough_unmatched_years: o
                .passthrough_unmatched_years
                .or(b.passthrough_unmatched_years),
        }
    };

    let tickers = {
        let b = base.tickers.unwrap_or_default();
        let o = overlay.tickers.unwrap_or_default();
        TickersConfig {
            blacklist: o.blacklist.or(b.blacklist),
            extra_blacklist: o.extra_blacklist.or(b.extra_blacklist),
            valid_codes_path: o.valid_codes_path.or(b.valid_codes_path),
        }
    };

    let batch = {
        let b = base.batch.unwrap_or_default();
        let o = overlay.batch.unwrap_or_default();
        BatchConfig {
            num_workers: o.num_workers.or(b.num_workers),
            min_report_year: o.min_report_year.or(b.min_report_year),
        }
    };

    let output = {
        let b = base.output.unwrap_or_default();
        let o = overlay.output.unwrap_or_default();
        OutputConfig {
            csv_path: o.csv_path.or(b.csv_path),
        }
    };

    ConfigFile {
        extraction: Some(extraction),
        tickers: Some(tickers),
        batch: Some(batch),
        output: Some(output),
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
