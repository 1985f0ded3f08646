//! Auction listing acquisition.
//!
//! The auction site is reached through an [`AuctionSource`]. The listing
//! window decides which index entries are worth opening and when to stop.

use crate::lot_text::{
    detect_language, parse_auction_period, parse_buyout, parse_money, parse_rarity, parse_time_left,
};
use chrono::{Duration, NaiveDateTime};
use lotscout_core::config::ListingConfig;
use lotscout_core::{Auction, AuctionId, AuctionIndexEntry, AuctionLot, Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Access to the auction site.
#[cfg_attr(test, mockall::automock)]
pub trait AuctionSource {
    /// Entries of the auction index, in site order.
    fn index(&mut self) -> Result<Vec<AuctionIndexEntry>>;

    /// Fetch one auction with the lots of all its pages.
    fn fetch_auction(&mut self, auction_id: AuctionId) -> Result<Auction>;
}

/// Which auctions to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingWindow {
    /// Only auctions posted within this many days.
    pub max_days_online: u32,
    /// Only auctions closing within this many days.
    pub max_days_left: u32,
    /// The index lists auctions in closing order.
    pub assume_sorted_by_close: bool,
}

impl From<&ListingConfig> for ListingWindow {
    fn from(config: &ListingConfig) -> Self {
        Self {
            max_days_online: config.max_days_online,
            max_days_left: config.max_days_left,
            assume_sorted_by_close: config.assume_sorted_by_close,
        }
    }
}

impl ListingWindow {
    /// Whether auctions are visited newest first.
    ///
    /// When the posting window is the tighter bound, newer auctions have
    /// higher ids, so the walk can stop at the first auction that is too old.
    pub fn newest_first(&self) -> bool {
        self.max_days_online < self.max_days_left
    }

    /// Ids of index entries closing within the window, in visiting order.
    pub fn select_candidates(&self, index: &[AuctionIndexEntry]) -> Vec<AuctionId> {
        let within = |entry: &&AuctionIndexEntry| entry.time_left.within(self.max_days_left);
        let mut ids: Vec<AuctionId> = if self.assume_sorted_by_close {
            index.iter().take_while(within).map(|e| e.auction_id).collect()
        } else {
            index.iter().filter(within).map(|e| e.auction_id).collect()
        };
        if self.newest_first() {
            ids.sort_unstable_by(|a, b| b.cmp(a));
        }
        ids
    }

    /// Whether an auction was posted within the online window.
    pub fn posted_within(&self, auction: &Auction, now: NaiveDateTime) -> bool {
        auction.starts >= self.posted_since(now)
    }

    /// Earliest start time inside the online window, saturating at the
    /// earliest representable time.
    pub fn posted_since(&self, now: NaiveDateTime) -> NaiveDateTime {
        now.checked_sub_signed(Duration::days(i64::from(self.max_days_online)))
            .unwrap_or(NaiveDateTime::MIN)
    }

    /// Latest closing time inside the time-left window, saturating at the
    /// latest representable time.
    pub fn closes_by(&self, now: NaiveDateTime) -> NaiveDateTime {
        now.checked_add_signed(Duration::days(i64::from(self.max_days_left)))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// Collect the auctions inside the listing window.
pub fn collect_auctions<A>(
    source: &mut A,
    window: &ListingWindow,
    now: NaiveDateTime,
) -> Result<Vec<Auction>>
where
    A: AuctionSource + ?Sized,
{
    let index = source.index()?;
    let candidates = window.select_candidates(&index);
    info!(
        indexed = index.len(),
        candidates = candidates.len(),
        "auction index read"
    );

    let mut auctions = Vec::new();
    for auction_id in candidates {
        let auction = source.fetch_auction(auction_id)?;
        if !window.posted_within(&auction, now) {
            if window.newest_first() {
                debug!(auction_id, starts = %auction.starts, "older than online window, stopping");
                break;
            }
            debug!(auction_id, starts = %auction.starts, "older than online window, skipping");
            continue;
        }
        info!(auction_id, lots = auction.lots.len(), "getting auction");
        auctions.push(auction);
    }
    Ok(auctions)
}

/// An index row as scraped.
#[derive(Debug, Clone, Deserialize)]
struct RawIndexEntry {
    auction_id: AuctionId,
    time_left: String,
}

/// A lot row as scraped.
#[derive(Debug, Clone, Deserialize)]
struct RawLot {
    /// Text of the card cell (name, rarity, language and grade markers).
    card_cell: String,
    /// Card name as linked in the card cell.
    name: String,
    grade: String,
    bid: String,
    #[serde(default)]
    bidder: Option<String>,
    #[serde(default)]
    buyout: String,
    #[serde(default)]
    bought_out: bool,
    bid_box: String,
}

/// A set section of an auction page.
#[derive(Debug, Clone, Deserialize)]
struct RawSetSection {
    set_name: String,
    #[serde(default)]
    lots: Vec<RawLot>,
}

/// An auction as scraped: its header and every page.
#[derive(Debug, Clone, Deserialize)]
struct RawAuction {
    auction_id: AuctionId,
    url: String,
    header: String,
    #[serde(default)]
    pages: Vec<Vec<RawSetSection>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Snapshot {
    index: Vec<RawIndexEntry>,
    auctions: Vec<RawAuction>,
}

/// Rows of the card column that are announcements, not lots.
const FLAG_ROWS: [&str; 2] = ["Auktion oldschoo", "Auktion"];

impl RawLot {
    fn into_lot(
        self,
        set_name: &str,
        auction: &RawAuction,
        ends: NaiveDateTime,
    ) -> Result<AuctionLot> {
        Ok(AuctionLot {
            rarity: parse_rarity(&self.card_cell),
            language: detect_language(&self.card_cell, &self.grade),
            current_bid: parse_money(&self.bid)?,
            buyout: parse_buyout(&self.buyout)?,
            name: self.name.trim().to_string(),
            set_name: set_name.trim().to_string(),
            grade: self.grade.trim().to_string(),
            highest_bidder: self.bidder.filter(|b| !b.trim().is_empty()),
            bought_out: self.bought_out,
            ends,
            auction_id: auction.auction_id,
            url: auction.url.clone(),
            bid_box_name: self.bid_box,
        })
    }
}

impl RawAuction {
    fn parse(&self) -> Result<Auction> {
        let (starts, ends) = parse_auction_period(&self.header)?;
        let mut lots = Vec::new();
        for section in self.pages.iter().flatten() {
            for raw in &section.lots {
                if FLAG_ROWS.contains(&raw.card_cell.trim()) {
                    continue;
                }
                let lot = raw
                    .clone()
                    .into_lot(&section.set_name, self, ends)
                    .map_err(|e| {
                        let card = raw.name.trim();
                        Error::parse(format!("auction {} lot '{}': {}", self.auction_id, card, e))
                    })?;
                lots.push(lot);
            }
        }
        Ok(Auction {
            auction_id: self.auction_id,
            starts,
            ends,
            url: self.url.clone(),
            lots,
        })
    }
}

/// Auction source backed by a scraped snapshot file.
///
/// The snapshot holds the site's displayed text:
/// `{ "index": [{ "auction_id", "time_left" }], "auctions": [{ "auction_id",
/// "url", "header", "pages": [[{ "set_name", "lots": [...] }]] }] }`.
#[derive(Debug, Clone)]
pub struct JsonAuctionSource {
    snapshot: Snapshot,
}

impl JsonAuctionSource {
    /// Parse a snapshot from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot = serde_json::from_reader(reader)?;
        Ok(Self { snapshot })
    }

    /// Open a snapshot file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl AuctionSource for JsonAuctionSource {
    fn index(&mut self) -> Result<Vec<AuctionIndexEntry>> {
        self.snapshot
            .index
            .iter()
            .map(|raw| {
                Ok(AuctionIndexEntry {
                    auction_id: raw.auction_id,
                    time_left: parse_time_left(&raw.time_left)?,
                })
            })
            .collect()
    }

    fn fetch_auction(&mut self, auction_id: AuctionId) -> Result<Auction> {
        self.snapshot
            .auctions
            .iter()
            .find(|a| a.auction_id == auction_id)
            .ok_or_else(|| Error::external(format!("auction {} not in snapshot", auction_id)))?
            .parse()
    }
}
