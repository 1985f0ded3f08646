//! Configuration structures for the lotscout system.

use crate::error::{Error, Result};
use crate::reference::SetCatalog;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Multiplier applied when a lot's grade is missing from the grade table.
pub const DEFAULT_GRADE_MULTIPLIER: f64 = 0.75;

/// Bid ratios below this are labelled "yes".
pub const YES_BELOW_RATIO: f64 = 0.75;

/// Bid ratios at or above this are labelled "no".
pub const NO_AT_OR_ABOVE_RATIO: f64 = 1.25;

fn calendar_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Price-history builder configuration.
    pub history: HistoryConfig,
    /// Auction scoring configuration.
    pub scoring: ScoringConfig,
    /// Auction listing acquisition configuration.
    pub listing: ListingConfig,
    /// Chart rendering configuration.
    pub chart: ChartConfig,
    /// Set name to set code catalogue.
    pub sets: SetCatalog,
}

impl Config {
    /// Load configuration from a TOML file. Missing sections use defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if scoring.value_median_lowest > scoring.value_median_max {
            return Err(Error::config(format!(
                "value_median_lowest ({}) exceeds value_median_max ({})",
                scoring.value_median_lowest, scoring.value_median_max
            )));
        }
        if scoring.bid_ratio_threshold <= 0.0 {
            return Err(Error::config("bid_ratio_threshold must be positive"));
        }
        if scoring.policy.yes_below > scoring.policy.no_at_or_above {
            return Err(Error::config("policy.yes_below must not exceed policy.no_at_or_above"));
        }
        if scoring.policy.default_grade_multiplier <= 0.0 {
            return Err(Error::config("policy.default_grade_multiplier must be positive"));
        }
        if self.history.download_poll_interval_ms == 0 {
            return Err(Error::config("download_poll_interval_ms must be positive"));
        }
        Ok(())
    }
}

/// Price-history builder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Re-fetch items even if their download already exists.
    pub force_refresh: bool,
    /// Column delimiter of card list files.
    pub delimiter: char,
    /// Pause between two fetches from the price source (ms).
    pub fetch_delay_ms: u64,
    /// Upper bound for waiting on a started download to land (ms).
    pub download_timeout_ms: u64,
    /// Pause between two checks for a started download (ms).
    pub download_poll_interval_ms: u64,
    /// Directory per-item downloads land in.
    pub download_dir: PathBuf,
    /// Directory assembled tables are written to.
    pub output_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            force_refresh: false,
            delimiter: ',',
            fetch_delay_ms: 600,
            download_timeout_ms: 10_000,
            download_poll_interval_ms: 250,
            download_dir: PathBuf::from("downloads"),
            output_dir: PathBuf::from("output/pricehistory"),
        }
    }
}

/// Fixed constants of the scoring rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Multiplier used for grades missing from the grade table.
    pub default_grade_multiplier: f64,
    /// Ratios below this are "yes".
    pub yes_below: f64,
    /// Ratios at or above this are "no".
    pub no_at_or_above: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            default_grade_multiplier: DEFAULT_GRADE_MULTIPLIER,
            yes_below: YES_BELOW_RATIO,
            no_at_or_above: NO_AT_OR_ABOVE_RATIO,
        }
    }
}

/// Auction scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// First date of the price-history window.
    pub window_begin: NaiveDate,
    /// Last date of the price-history window.
    pub window_end: NaiveDate,
    /// Minimum grade-adjusted median value to consider.
    pub value_median_lowest: f64,
    /// Maximum grade-adjusted median value to consider.
    pub value_median_max: f64,
    /// Maximum bid / median ratio to keep a lot.
    pub bid_ratio_threshold: f64,
    /// Currency the price history is quoted in.
    pub reference_currency: String,
    /// Grades never worth bidding on (e.g., "PR").
    pub skip_grades: Vec<String>,
    /// Set names to accept; `None` accepts every set in the catalogue.
    pub accepted_sets: Option<Vec<String>>,
    /// Scoring policy constants.
    pub policy: ScoringPolicy,
    /// Directory result tables are written to.
    pub output_dir: PathBuf,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_begin: calendar_date(2020, 1, 1),
            window_end: calendar_date(2022, 1, 1),
            value_median_lowest: 15.0,
            value_median_max: 2500.0,
            bid_ratio_threshold: 1.25,
            reference_currency: "USD".to_string(),
            skip_grades: vec!["PR".to_string()],
            accepted_sets: None,
            policy: ScoringPolicy::default(),
            output_dir: PathBuf::from("output/auctions"),
        }
    }
}

/// Auction listing acquisition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Only auctions posted within this many days.
    pub max_days_online: u32,
    /// Only auctions closing within this many days.
    pub max_days_left: u32,
    /// The index lists auctions in closing order.
    pub assume_sorted_by_close: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_days_online: 2,
            max_days_left: 99,
            assume_sorted_by_close: true,
        }
    }
}

/// Chart rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Values above this are clipped to it.
    pub clip: f64,
    /// Values at or above this are removed.
    pub remove: f64,
    /// Series whose maximum stays below this are omitted.
    pub min_max_value: f64,
    /// Chart width in px (height is a third of it).
    pub width: u32,
    /// Carry the last known value forward over gaps.
    pub fill_missing: bool,
    /// Plot the y axis on a log10 scale.
    pub log10: bool,
    /// Directory charts are written to.
    pub output_dir: PathBuf,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            clip: 5000.0,
            remove: 10000.0,
            min_max_value: 5.0,
            width: 2000,
            fill_missing: true,
            log10: false,
            output_dir: PathBuf::from("output/plots"),
        }
    }
}
