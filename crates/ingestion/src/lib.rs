//! Data ingestion for the lotscout system.
//!
//! This crate handles:
//! - Grade and currency reference tables
//! - Card lists and watchlists
//! - Price-history downloads, caching and table assembly
//! - Auction site text parsing
//! - Auction listing acquisition within a time window

pub mod reference_csv;
pub mod history_csv;
pub mod card_list;
pub mod pacing;
pub mod history_builder;
pub mod lot_text;
pub mod listing;

pub use reference_csv::{read_currency_table, read_grade_table};
pub use history_csv::{
    read_item_series, read_price_history, read_price_history_file, write_price_history,
    write_price_history_file,
};
pub use card_list::{read_card_list, read_card_list_file, read_watchlist, read_watchlist_file};
pub use pacing::{Poller, Sleeper, ThreadSleeper};
pub use history_builder::{BuildReport, FetchStatus, HistoryBuilder, OfflineSource, PriceSource};
pub use listing::{collect_auctions, AuctionSource, JsonAuctionSource, ListingWindow};
