//! PyO3 bindings for lotscout Rust components.
//!
//! Exposes the scoring and price-history pipeline to the Python scraping
//! scripts:
//! - Auction lots and scored lots
//! - Lot scoring against a price-history table
//! - Recommendation labels
//! - Price-history assembly from a card list

use chrono::{NaiveDate, NaiveDateTime};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

use lotscout_core::{
    AuctionLot as RustAuctionLot, Config as RustConfig, Error as RustError, Language, Money, Rarity,
    ScoredLot as RustScoredLot,
};
use lotscout_ingestion::{
    read_card_list_file, read_currency_table, read_grade_table, read_price_history_file,
    write_price_history_file, HistoryBuilder, OfflineSource,
};
use lotscout_scoring::{LotScorer as RustLotScorer, RecommendationPolicy};

const ENDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn to_py_err(e: RustError) -> PyErr {
    match e {
        RustError::Io(io) => PyIOError::new_err(io.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn parse_date(text: &str) -> PyResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| PyValueError::new_err(format!("invalid date '{}': {}", text, e)))
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// One biddable item within an auction.
#[pyclass]
#[derive(Clone)]
pub struct AuctionLot {
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub set_name: String,
    /// "C", "U", "R", "MR" or None.
    #[pyo3(get, set)]
    pub rarity: Option<String>,
    /// "eng" or "foreign".
    #[pyo3(get, set)]
    pub language: String,
    #[pyo3(get, set)]
    pub grade: String,
    #[pyo3(get, set)]
    pub current_bid: f64,
    #[pyo3(get, set)]
    pub currency: String,
    #[pyo3(get, set)]
    pub highest_bidder: Option<String>,
    /// Buyout amount, in the bid currency.
    #[pyo3(get, set)]
    pub buyout: Option<f64>,
    #[pyo3(get, set)]
    pub bought_out: bool,
    /// Closing time, "YYYY-MM-DD HH:MM:SS".
    #[pyo3(get, set)]
    pub ends: String,
    #[pyo3(get, set)]
    pub auction_id: u64,
    #[pyo3(get, set)]
    pub url: String,
    #[pyo3(get, set)]
    pub bid_box_name: String,
}

#[pymethods]
impl AuctionLot {
    #[new]
    #[pyo3(signature = (
        name, set_name, grade, current_bid, currency, ends, auction_id,
        rarity=None, language="eng".to_string(), highest_bidder=None, buyout=None,
        bought_out=false, url=String::new(), bid_box_name=String::new()
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        set_name: String,
        grade: String,
        current_bid: f64,
        currency: String,
        ends: String,
        auction_id: u64,
        rarity: Option<String>,
        language: String,
        highest_bidder: Option<String>,
        buyout: Option<f64>,
        bought_out: bool,
        url: String,
        bid_box_name: String,
    ) -> Self {
        AuctionLot {
            name,
            set_name,
            rarity,
            language,
            grade,
            current_bid,
            currency,
            highest_bidder,
            buyout,
            bought_out,
            ends,
            auction_id,
            url,
            bid_box_name,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "AuctionLot(name={:?}, set={:?}, grade={}, bid={} {}, auction={})",
            self.name, self.set_name, self.grade, self.current_bid, self.currency, self.auction_id
        )
    }
}

impl TryFrom<AuctionLot> for RustAuctionLot {
    type Error = PyErr;

    fn try_from(lot: AuctionLot) -> PyResult<Self> {
        let ends = NaiveDateTime::parse_from_str(&lot.ends, ENDS_FORMAT).map_err(|e| {
            PyValueError::new_err(format!("invalid closing time '{}': {}", lot.ends, e))
        })?;
        let language = match lot.language.as_str() {
            "eng" => Language::English,
            _ => Language::Foreign,
        };
        Ok(RustAuctionLot {
            name: lot.name,
            set_name: lot.set_name,
            rarity: lot.rarity.as_deref().and_then(Rarity::from_code),
            language,
            grade: lot.grade,
            buyout: lot.buyout.map(|amount| Money::new(amount, lot.currency.clone())),
            current_bid: Money::new(lot.current_bid, lot.currency),
            highest_bidder: lot.highest_bidder,
            bought_out: lot.bought_out,
            ends,
            auction_id: lot.auction_id,
            url: lot.url,
            bid_box_name: lot.bid_box_name,
        })
    }
}

impl From<RustAuctionLot> for AuctionLot {
    fn from(lot: RustAuctionLot) -> Self {
        AuctionLot {
            name: lot.name,
            set_name: lot.set_name,
            rarity: lot.rarity.map(|r| r.code().to_string()),
            language: lot.language.as_str().to_string(),
            grade: lot.grade,
            current_bid: lot.current_bid.amount,
            currency: lot.current_bid.currency,
            highest_bidder: lot.highest_bidder,
            buyout: lot.buyout.map(|m| m.amount),
            bought_out: lot.bought_out,
            ends: lot.ends.format(ENDS_FORMAT).to_string(),
            auction_id: lot.auction_id,
            url: lot.url,
            bid_box_name: lot.bid_box_name,
        }
    }
}

/// A lot that passed every filter, with its valuation.
#[pyclass]
#[derive(Clone)]
pub struct ScoredLot {
    #[pyo3(get)]
    pub lot: AuctionLot,
    /// Price-history column used for the valuation.
    #[pyo3(get)]
    pub column: String,
    #[pyo3(get)]
    pub grade_multiplier: f64,
    #[pyo3(get)]
    pub value_min: f64,
    #[pyo3(get)]
    pub value_max: f64,
    #[pyo3(get)]
    pub value_mean: f64,
    #[pyo3(get)]
    pub value_median: f64,
    #[pyo3(get)]
    pub current_bid_ref: f64,
    #[pyo3(get)]
    pub buyout_ref: Option<f64>,
    #[pyo3(get)]
    pub bid_median_value_ratio: f64,
    #[pyo3(get)]
    pub buyout_median_value_ratio: Option<f64>,
    /// "yes", "maybe" or "no".
    #[pyo3(get)]
    pub recommend: String,
    /// Highest sensible bid, in the bid currency.
    #[pyo3(get)]
    pub my_bid_max: f64,
}

#[pymethods]
impl ScoredLot {
    fn __repr__(&self) -> String {
        format!(
            "ScoredLot(name={:?}, median={:.2}, ratio={:.2}, recommend={})",
            self.lot.name, self.value_median, self.bid_median_value_ratio, self.recommend
        )
    }
}

impl From<RustScoredLot> for ScoredLot {
    fn from(s: RustScoredLot) -> Self {
        ScoredLot {
            column: s.column,
            grade_multiplier: s.grade_multiplier,
            value_min: s.value.min,
            value_max: s.value.max,
            value_mean: s.value.mean,
            value_median: s.value.median,
            current_bid_ref: s.current_bid_ref,
            buyout_ref: s.buyout_ref,
            bid_median_value_ratio: s.bid_median_value_ratio,
            buyout_median_value_ratio: s.buyout_median_value_ratio,
            recommend: s.recommendation.as_str().to_string(),
            my_bid_max: s.max_bid.amount,
            lot: s.lot.into(),
        }
    }
}

// ============================================================================
// Python-exposed Engine Classes
// ============================================================================

/// Scores auction lots against a price-history table.
#[pyclass]
pub struct LotScorer {
    inner: RustLotScorer,
}

#[pymethods]
impl LotScorer {
    #[new]
    #[pyo3(signature = (
        history, grades, currencies,
        window_begin="2020-01-01", window_end="2022-01-01",
        value_median_lowest=15.0, value_median_max=2500.0, bid_ratio_threshold=1.25,
        reference_currency="USD", sets=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        history: PathBuf,
        grades: PathBuf,
        currencies: PathBuf,
        window_begin: &str,
        window_end: &str,
        value_median_lowest: f64,
        value_median_max: f64,
        bid_ratio_threshold: f64,
        reference_currency: &str,
        sets: Option<Vec<String>>,
    ) -> PyResult<Self> {
        let mut config = RustConfig::default();
        config.scoring.window_begin = parse_date(window_begin)?;
        config.scoring.window_end = parse_date(window_end)?;
        config.scoring.value_median_lowest = value_median_lowest;
        config.scoring.value_median_max = value_median_max;
        config.scoring.bid_ratio_threshold = bid_ratio_threshold;
        config.scoring.reference_currency = reference_currency.to_string();
        config.scoring.accepted_sets = sets;
        config.validate().map_err(to_py_err)?;

        let table = read_price_history_file(history).map_err(to_py_err)?;
        let grades = read_grade_table(grades).map_err(to_py_err)?;
        let currencies = read_currency_table(currencies).map_err(to_py_err)?;
        Ok(LotScorer {
            inner: RustLotScorer::from_config(&table, grades, currencies, &config),
        })
    }

    /// Score one lot; None if it was rejected or could not be valued.
    fn score(&self, lot: AuctionLot) -> PyResult<Option<ScoredLot>> {
        let lot = RustAuctionLot::try_from(lot)?;
        Ok(self.inner.score(&lot).accepted().map(|s| s.into()))
    }

    /// Score a batch; accepted lots come back sorted by bid / median ratio.
    fn score_all(&self, lots: Vec<AuctionLot>) -> PyResult<Vec<ScoredLot>> {
        let rust_lots = lots
            .into_iter()
            .map(RustAuctionLot::try_from)
            .collect::<PyResult<Vec<_>>>()?;
        Ok(self
            .inner
            .score_all(&rust_lots)
            .accepted
            .into_iter()
            .map(|s| s.into())
            .collect())
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Recommendation label ("yes", "maybe", "no") for a bid / median ratio.
#[pyfunction]
fn recommend(ratio: f64) -> &'static str {
    RecommendationPolicy::default().label(ratio).as_str()
}

/// Assemble a price-history CSV from downloads already present in
/// `download_dir`. Returns the number of cards with history.
#[pyfunction]
#[pyo3(signature = (card_list, output, sep=',', download_dir=None, force=false))]
fn build_price_history(
    card_list: PathBuf,
    output: PathBuf,
    sep: char,
    download_dir: Option<PathBuf>,
    force: bool,
) -> PyResult<usize> {
    let mut config = RustConfig::default().history;
    config.delimiter = sep;
    config.force_refresh = force;
    if let Some(dir) = download_dir {
        config.download_dir = dir;
    }

    let cards = read_card_list_file(&card_list, config.delimiter).map_err(to_py_err)?;
    let report = HistoryBuilder::new(OfflineSource, &config)
        .build(&cards)
        .map_err(to_py_err)?;
    write_price_history_file(&output, &report.table).map_err(to_py_err)?;
    Ok(report.table.column_count())
}

// ============================================================================
// Module Definition
// ============================================================================

/// lotscout - auction lot scoring for Python.
#[pymodule]
fn lotscout_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<AuctionLot>()?;
    m.add_class::<ScoredLot>()?;

    // Engine classes
    m.add_class::<LotScorer>()?;

    // Functions
    m.add_function(wrap_pyfunction!(recommend, m)?)?;
    m.add_function(wrap_pyfunction!(build_price_history, m)?)?;

    Ok(())
}
