//! Result table output.
//!
//! One row per accepted lot with a fixed column set. Monetary and ratio
//! columns are rounded to two decimals; the bookkeeping columns (`do_bid`,
//! `status`, `paid`) are left for the user to fill in.

use chrono::NaiveDateTime;
use csv::WriterBuilder;
use lotscout_core::{Result, ScoredLot};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Output row for an accepted lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub ends: String,
    pub magic_set: String,
    pub cardname: String,
    pub rarity: Option<&'static str>,
    pub language: &'static str,
    pub grade: String,
    pub current_bid: String,
    pub current_bid_ref: f64,
    pub highestbidder_username: Option<String>,
    pub buyout_price: Option<String>,
    pub buyout_price_ref: Option<f64>,
    pub value_min: f64,
    pub value_max: f64,
    pub value_mean: f64,
    pub value_median: f64,
    pub bid_median_value_ratio: f64,
    pub buyout_median_value_ratio: Option<f64>,
    pub recommend: &'static str,
    pub my_bid_max: String,
    pub do_bid: bool,
    pub auction_id: u64,
    pub bid_box_name: String,
    pub url: String,
    pub status: Option<String>,
    pub paid: Option<f64>,
}

impl From<&ScoredLot> for ResultRecord {
    fn from(scored: &ScoredLot) -> Self {
        let lot = &scored.lot;
        let max_bid = format!("{} {}", round2(scored.max_bid.amount), scored.max_bid.currency);
        Self {
            ends: lot.ends.format(TIMESTAMP_FORMAT).to_string(),
            magic_set: lot.set_name.clone(),
            cardname: lot.name.clone(),
            rarity: lot.rarity.map(|r| r.code()),
            language: lot.language.as_str(),
            grade: lot.grade.clone(),
            current_bid: lot.current_bid.to_string(),
            current_bid_ref: round2(scored.current_bid_ref),
            highestbidder_username: lot.highest_bidder.clone(),
            buyout_price: lot.buyout.as_ref().map(ToString::to_string),
            buyout_price_ref: scored.buyout_ref.map(round2),
            value_min: round2(scored.value.min),
            value_max: round2(scored.value.max),
            value_mean: round2(scored.value.mean),
            value_median: round2(scored.value.median),
            bid_median_value_ratio: round2(scored.bid_median_value_ratio),
            buyout_median_value_ratio: scored.buyout_median_value_ratio.map(round2),
            recommend: scored.recommendation.as_str(),
            my_bid_max: max_bid,
            do_bid: scored.do_bid,
            auction_id: lot.auction_id,
            bid_box_name: lot.bid_box_name.clone(),
            url: lot.url.clone(),
            status: scored.status.clone(),
            paid: scored.paid,
        }
    }
}

/// Header row; reference-currency columns carry the currency code.
pub fn result_header(reference_currency: &str) -> Vec<String> {
    [
        "ends",
        "magic_set",
        "cardname",
        "rarity",
        "language",
        "grade",
        "current_bid",
        "current_bid_{}",
        "highestbidder_username",
        "buyout_price",
        "buyout_price_{}",
        "value_min",
        "value_max",
        "value_mean",
        "value_median",
        "bid_median_value_ratio",
        "buyout_median_value_ratio",
        "recommend",
        "my_bid_max",
        "do_bid",
        "auction_id",
        "bid_box_name",
        "URL",
        "status",
        "paid",
    ]
    .iter()
    .map(|column| column.replace("{}", reference_currency))
    .collect()
}

/// Write accepted lots in the given order.
pub fn write_results<W: Write>(
    writer: W,
    lots: &[ScoredLot],
    reference_currency: &str,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(result_header(reference_currency))?;
    for scored in lots {
        wtr.serialize(ResultRecord::from(scored))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write accepted lots to a file, creating parent directories.
pub fn write_results_file(
    path: impl AsRef<Path>,
    lots: &[ScoredLot],
    reference_currency: &str,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_results(File::create(path)?, lots, reference_currency)
}

/// `<now>__<until>_auctions.csv`, where `until` is the end of the
/// closing-time window.
pub fn results_file_name(now: NaiveDateTime, until: NaiveDateTime) -> String {
    format!(
        "{}__{}_auctions.csv",
        now.format(FILE_STAMP_FORMAT),
        until.format(FILE_STAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotscout_core::{AuctionLot, Language, Money, Rarity, Recommendation, ValueStats};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 9, 19).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    fn scored(ratio: f64) -> ScoredLot {
        ScoredLot {
            lot: AuctionLot {
                name: "Black Lotus".to_string(),
                set_name: "Alpha".to_string(),
                rarity: Some(Rarity::Rare),
                language: Language::English,
                grade: "NM".to_string(),
                current_bid: Money::new(500.0, "DKK"),
                highest_bidder: Some("someone".to_string()),
                buyout: None,
                bought_out: false,
                ends: at(20, 0, 0),
                auction_id: 35697,
                url: "https://example.test/auction/35697".to_string(),
                bid_box_name: "bud[1]".to_string(),
            },
            column: "Black Lotus_LEA".to_string(),
            grade_multiplier: 1.0,
            value: ValueStats {
                min: 90.0,
                max: 110.0,
                mean: 100.0,
                median: 100.0 / 3.0,
            },
            current_bid_ref: 80.0,
            buyout_ref: None,
            bid_median_value_ratio: ratio,
            buyout_median_value_ratio: None,
            recommendation: Recommendation::Yes,
            max_bid: Money::new(625.0, "DKK"),
            do_bid: false,
            status: None,
            paid: None,
        }
    }

    #[test]
    fn test_results_file_name() {
        let name = results_file_name(at(9, 5, 3), at(20, 0, 0));
        assert_eq!(name, "2021-09-19_09.05.03__2021-09-19_20.00.00_auctions.csv");
    }

    #[test]
    fn test_write_results() {
        let mut out = Vec::new();
        write_results(&mut out, &[scored(0.456)], "USD").unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with(
            "ends,magic_set,cardname,rarity,language,grade,current_bid,current_bid_USD,"
        ));
        assert!(header.ends_with(",URL,status,paid"));

        let row = lines.next().unwrap();
        assert_eq!(
            row,
            concat!(
                "2021-09-19 20:00:00,Alpha,Black Lotus,R,eng,NM,500 DKK,80.0,someone,,,",
                "90.0,110.0,100.0,33.33,0.46,,yes,625 DKK,false,35697,bud[1],",
                "https://example.test/auction/35697,,"
            )
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_header_matches_record_width() {
        let mut out = Vec::new();
        write_results(&mut out, &[scored(0.5)], "EUR").unwrap();
        let text = String::from_utf8(out).unwrap();
        let widths: Vec<usize> = text.lines().map(|l| l.split(',').count()).collect();
        assert_eq!(widths[0], widths[1]);
        assert!(text.contains("buyout_price_EUR"));
    }
}
