//! Core data types for the lotscout system.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price-history column identifier: `name_setCode[_variant]`.
pub type ItemKey = String;

/// Auction identifier on the auction site.
pub type AuctionId = u64;

/// A tracked card printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardId {
    /// Card name as used by the price source.
    pub name: String,
    /// Set code (e.g., "LEA").
    pub set_code: String,
    /// Printing variant (illustration number, promo tag...).
    pub variant: Option<String>,
}

impl CardId {
    /// Create a new card id.
    pub fn new(
        name: impl Into<String>,
        set_code: impl Into<String>,
        variant: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            set_code: set_code.into(),
            variant,
        }
    }

    /// The variant, if it starts with a letter.
    ///
    /// Numeric variants are collector numbers and do not tell printings apart
    /// at the price source, so they are ignored.
    pub fn alphabetic_variant(&self) -> Option<&str> {
        self.variant
            .as_deref()
            .map(str::trim)
            .filter(|v| v.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
    }

    /// Column name in the price-history table.
    pub fn column_name(&self) -> ItemKey {
        match self.alphabetic_variant() {
            Some(variant) => format!("{}_{}_{}", self.name, self.set_code, variant),
            None => format!("{}_{}", self.name, self.set_code),
        }
    }

    /// File name the price source downloads this card's series to.
    pub fn download_file_name(&self) -> String {
        match self.alphabetic_variant() {
            Some(variant) => format!("{} _{}_ [{}].csv", self.name, variant, self.set_code),
            None => format!("{} [{}].csv", self.name, self.set_code),
        }
    }
}

/// Drop a `" v. X"` variant suffix from a displayed card name.
pub fn strip_variant_suffix(name: &str) -> &str {
    if name.contains(" v. ") {
        name.split(" v.").next().unwrap_or(name).trim()
    } else {
        name
    }
}

/// An amount in a named currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in currency units.
    pub amount: f64,
    /// ISO-style currency code (e.g., "DKK").
    pub currency: String,
}

impl Money {
    /// Create a new amount.
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Card rarity as printed on the auction listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    MythicRare,
}

impl Rarity {
    /// Short code used on listings.
    pub fn code(self) -> &'static str {
        match self {
            Rarity::Common => "C",
            Rarity::Uncommon => "U",
            Rarity::Rare => "R",
            Rarity::MythicRare => "MR",
        }
    }

    /// Parse a short code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" => Some(Rarity::Common),
            "U" => Some(Rarity::Uncommon),
            "R" => Some(Rarity::Rare),
            "MR" => Some(Rarity::MythicRare),
            _ => None,
        }
    }
}

/// Printing language of a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Foreign,
}

impl Language {
    /// Short label used in result tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::Foreign => "foreign",
        }
    }
}

/// One biddable item within an auction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionLot {
    /// Card name as displayed (may carry a " v. X" suffix).
    pub name: String,
    /// Set name as displayed (e.g., "Alpha").
    pub set_name: String,
    /// Rarity, when the listing shows one.
    #[serde(default)]
    pub rarity: Option<Rarity>,
    /// Printing language.
    pub language: Language,
    /// Condition grade code (e.g., "NM").
    pub grade: String,
    /// Current bid.
    pub current_bid: Money,
    /// Current highest bidder.
    #[serde(default)]
    pub highest_bidder: Option<String>,
    /// Buyout price, if the seller offers one.
    #[serde(default)]
    pub buyout: Option<Money>,
    /// Whether the lot was already bought out.
    #[serde(default)]
    pub bought_out: bool,
    /// Auction closing time.
    pub ends: NaiveDateTime,
    /// Parent auction.
    pub auction_id: AuctionId,
    /// Page the lot was found on.
    pub url: String,
    /// Name of the bid input for this lot.
    pub bid_box_name: String,
}

/// Time left as shown on the auction index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum TimeLeft {
    /// Less than a day left, in whole hours.
    Hours(u32),
    /// One or more whole days left.
    Days(u32),
}

impl TimeLeft {
    /// Check whether the auction closes within `max_days_left`.
    ///
    /// Anything shown in hours, and a single day, is within. Longer day
    /// counts are truncated by the site, so they are only compared against
    /// windows of two days or more.
    pub fn within(self, max_days_left: u32) -> bool {
        match self {
            TimeLeft::Hours(_) | TimeLeft::Days(0..=1) => true,
            TimeLeft::Days(days) => max_days_left >= 2 && days <= max_days_left,
        }
    }
}

/// An entry of the auction index page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionIndexEntry {
    /// Auction id.
    pub auction_id: AuctionId,
    /// Time left until close.
    pub time_left: TimeLeft,
}

/// A fetched auction with all its lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auction {
    /// Auction id.
    pub auction_id: AuctionId,
    /// When the auction was posted.
    pub starts: NaiveDateTime,
    /// When the auction closes.
    pub ends: NaiveDateTime,
    /// Auction page URL.
    pub url: String,
    /// Lots, across all pages of the auction.
    #[serde(default)]
    pub lots: Vec<AuctionLot>,
}

/// Summary statistics of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl ValueStats {
    /// Scale all statistics by a multiplier.
    pub fn scaled(self, multiplier: f64) -> Self {
        Self {
            min: self.min * multiplier,
            max: self.max * multiplier,
            mean: self.mean * multiplier,
            median: self.median * multiplier,
        }
    }
}

/// Bid recommendation label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Yes,
    Maybe,
    No,
}

impl Recommendation {
    /// Label as written to result tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Yes => "yes",
            Recommendation::Maybe => "maybe",
            Recommendation::No => "no",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lot that passed every filter, with its valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLot {
    /// The scraped lot.
    pub lot: AuctionLot,
    /// Price-history column the lot was matched to.
    pub column: ItemKey,
    /// Grade multiplier applied to the statistics.
    pub grade_multiplier: f64,
    /// Windowed, grade-adjusted value statistics (reference currency).
    pub value: ValueStats,
    /// Current bid in the reference currency.
    pub current_bid_ref: f64,
    /// Buyout in the reference currency.
    pub buyout_ref: Option<f64>,
    /// Current bid / median value.
    pub bid_median_value_ratio: f64,
    /// Buyout / median value.
    pub buyout_median_value_ratio: Option<f64>,
    /// Recommendation label.
    pub recommendation: Recommendation,
    /// Median value expressed in the bid currency.
    pub max_bid: Money,
    /// Filled in by hand after the run.
    pub do_bid: bool,
    /// Filled in by hand after the run.
    pub status: Option<String>,
    /// Filled in by hand after the run.
    pub paid: Option<f64>,
}

/// A row of a watchlist: a held card and how many copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub name: String,
    pub set_code: String,
    pub grade: String,
    pub quantity: u32,
}

impl WatchlistEntry {
    /// Price-history column for this entry.
    pub fn column_name(&self) -> ItemKey {
        format!("{}_{}", self.name, self.set_code)
    }
}
