//! Parsers for the auction site's displayed text.
//!
//! The site renders amounts as `"12 DKK"`, time left as `"3 dage"` or
//! `"5h 20m"` and auction periods as
//! `"Startede: 12 Sep '21, 14:33 /slutter: 19 Sep '21, 20:00"`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lotscout_core::{Error, Language, Money, Rarity, Result, TimeLeft};

pub use lotscout_core::types::strip_variant_suffix;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Amounts use `.` for thousands and `,` for decimals (`"1.500,50"`).
/// Without a comma, a dot only groups thousands when every group after it
/// has three digits, so `"12.5"` stays a decimal.
fn parse_amount(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    let grouped = raw.contains(',') || {
        let mut groups = raw.split('.');
        groups.next();
        let rest: Vec<&str> = groups.collect();
        !rest.is_empty() && rest.iter().all(|g| g.len() == 3)
    };
    let normalized = if grouped {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.to_string()
    };
    normalized
        .parse::<f64>()
        .map_err(|_| Error::parse(format!("bad amount '{}'", raw)))
}

/// Parse `"<amount> <CUR>"`.
pub fn parse_money(text: &str) -> Result<Money> {
    let mut parts = text.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(amount), Some(currency), None) => Ok(Money::new(parse_amount(amount)?, currency)),
        _ => Err(Error::parse(format!("bad money '{}'", text))),
    }
}

/// Parse a buyout cell such as `"Køb nu: 150 SEK"`.
///
/// A blank cell means no buyout is offered.
pub fn parse_buyout(text: &str) -> Result<Option<Money>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| Error::parse(format!("buyout without amount '{}'", text)))?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let amount = parse_amount(digits.trim_end_matches(['.', ',']))?;

    let currency = text
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|word| word.len() == 3 && word.chars().all(|c| c.is_ascii_uppercase()))
        .ok_or_else(|| Error::parse(format!("buyout without currency '{}'", text)))?;

    Ok(Some(Money::new(amount, currency)))
}

/// Parse the index page's time-left cell.
pub fn parse_time_left(text: &str) -> Result<TimeLeft> {
    let text = text.trim();
    let first = text
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::parse("empty time left"))?;

    let number = |raw: &str| {
        raw.parse::<u32>()
            .map_err(|_| Error::parse(format!("bad time left '{}'", text)))
    };

    if text.contains("dag") {
        Ok(TimeLeft::Days(number(first)?))
    } else if let Some(hours) = first.strip_suffix('h') {
        Ok(TimeLeft::Hours(number(hours)?))
    } else if first.strip_suffix('m').is_some() {
        Ok(TimeLeft::Hours(0))
    } else {
        Err(Error::parse(format!("bad time left '{}'", text)))
    }
}

/// Parse a displayed timestamp like `"12 Sep '21, 14:33"`.
pub fn parse_site_datetime(text: &str) -> Result<NaiveDateTime> {
    let bad = || Error::parse(format!("bad timestamp '{}'", text));
    let cleaned = text.replace([',', '\''], " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let [day, month, year, time] = tokens[..] else {
        return Err(bad());
    };

    let day: u32 = day.parse().map_err(|_| bad())?;
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month))
        .ok_or_else(bad)? as u32
        + 1;
    let mut year: i32 = year.parse().map_err(|_| bad())?;
    if year < 100 {
        year += 2000;
    }
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| bad())?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(bad)?;
    Ok(date.and_time(time))
}

/// Parse an auction header into (starts, ends).
pub fn parse_auction_period(text: &str) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let text = text.replace(['\n', '\t'], "");
    let rest = text
        .split_once("Startede:")
        .map(|(_, rest)| rest)
        .ok_or_else(|| Error::parse("auction header without start"))?;
    let (starts, ends) = rest
        .split_once("/slutter:")
        .ok_or_else(|| Error::parse("auction header without end"))?;
    Ok((parse_site_datetime(starts)?, parse_site_datetime(ends)?))
}

/// Rarity marker in a card cell: `(C)`, `(U)`, `(R)` or `(MR)`.
pub fn parse_rarity(text: &str) -> Option<Rarity> {
    ["C", "U", "R", "MR"]
        .into_iter()
        .find(|code| text.contains(&format!("({})", code)))
        .and_then(Rarity::from_code)
}

/// Printing language from a card cell.
///
/// English printings carry `(eng` or show the bare grade in parentheses.
pub fn detect_language(card_cell: &str, grade: &str) -> Language {
    if card_cell.contains("(eng") || card_cell.contains(&format!("({})", grade)) {
        Language::English
    } else {
        Language::Foreign
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_money() {
        let money = parse_money("12 DKK").unwrap();
        assert_relative_eq!(money.amount, 12.0);
        assert_eq!(money.currency, "DKK");
        assert_relative_eq!(parse_money("12,5 SEK").unwrap().amount, 12.5);
        assert!(parse_money("12").is_err());
        assert!(parse_money("1.000,00 DKK kr").is_err());
    }

    #[test]
    fn test_parse_money_thousands_separator() {
        assert_relative_eq!(parse_money("1.500 SEK").unwrap().amount, 1500.0);
        assert_relative_eq!(parse_money("1.000.000 DKK").unwrap().amount, 1_000_000.0);
        assert_relative_eq!(parse_money("1.500,50 DKK").unwrap().amount, 1500.5);
        assert_relative_eq!(parse_money("12.5 EUR").unwrap().amount, 12.5);
    }

    #[test]
    fn test_parse_buyout() {
        let buyout = parse_buyout("Køb nu: 150 SEK").unwrap().unwrap();
        assert_eq!(buyout, Money::new(150.0, "SEK"));
        let grouped = parse_buyout("Køb nu: 1.500 SEK").unwrap().unwrap();
        assert_eq!(grouped, Money::new(1500.0, "SEK"));
        assert_eq!(parse_buyout("   ").unwrap(), None);
        assert!(parse_buyout("Køb nu").is_err());
    }

    #[test]
    fn test_parse_time_left() {
        assert_eq!(parse_time_left("3 dage").unwrap(), TimeLeft::Days(3));
        assert_eq!(parse_time_left("1 dag 4h").unwrap(), TimeLeft::Days(1));
        assert_eq!(parse_time_left("5h 20m").unwrap(), TimeLeft::Hours(5));
        assert_eq!(parse_time_left("45m").unwrap(), TimeLeft::Hours(0));
        assert!(parse_time_left("soon").is_err());
    }

    #[test]
    fn test_parse_auction_period() {
        let header = "Startede: 12 Sep '21, 14:33 /slutter:\n\t19 Sep '21, 20:00";
        let (starts, ends) = parse_auction_period(header).unwrap();
        assert_eq!(starts.to_string(), "2021-09-12 14:33:00");
        assert_eq!(ends.to_string(), "2021-09-19 20:00:00");
    }

    #[test]
    fn test_parse_site_datetime_rejects_unknown_month() {
        assert!(parse_site_datetime("12 Foo '21, 14:33").is_err());
        assert!(parse_site_datetime("31 Feb '21, 14:33").is_err());
    }

    #[test]
    fn test_parse_rarity() {
        assert_eq!(parse_rarity("Black Lotus (R) (NM)"), Some(Rarity::Rare));
        assert_eq!(parse_rarity("Jace (MR)"), Some(Rarity::MythicRare));
        assert_eq!(parse_rarity("Plains"), None);
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("Black Lotus (eng, NM)", "NM"), Language::English);
        assert_eq!(detect_language("Black Lotus (NM)", "NM"), Language::English);
        assert_eq!(detect_language("Black Lotus (ger, NM)", "NM"), Language::Foreign);
    }

    #[test]
    fn test_strip_variant_suffix() {
        assert_eq!(strip_variant_suffix("Plains v. 2"), "Plains");
        assert_eq!(strip_variant_suffix("Black Lotus"), "Black Lotus");
        assert_eq!(strip_variant_suffix("Will-o'-the-Wisp v.2"), "Will-o'-the-Wisp v.2");
    }
}
