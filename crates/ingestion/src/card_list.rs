//! Card list and watchlist readers.

use csv::{ReaderBuilder, StringRecord, Trim};
use lotscout_core::{CardId, Error, Result, WatchlistEntry};
use std::fs::File;
use std::io::Read;
use std::path::Path;

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::config(format!("delimiter '{}' is not ASCII", delimiter)))
}

fn field<'r>(record: &'r StringRecord, index: usize, column: &str) -> Result<&'r str> {
    record
        .get(index)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::missing_column(column))
}

/// Read a card list: a header row, then `name,set[,variant]` rows.
///
/// `:` in names is replaced by `_` so names are usable as file names. The
/// result is sorted by set code, then name.
pub fn read_card_list<R: Read>(reader: R, delimiter: char) -> Result<Vec<CardId>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut cards = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let name = field(&record, 0, "name")?.replace(':', "_");
        let set_code = field(&record, 1, "set")?;
        let variant = record
            .get(2)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        cards.push(CardId::new(name.trim(), set_code, variant));
    }

    cards.sort_by(|a, b| a.set_code.cmp(&b.set_code).then_with(|| a.name.cmp(&b.name)));
    Ok(cards)
}

/// Read a card list file.
pub fn read_card_list_file(path: impl AsRef<Path>, delimiter: char) -> Result<Vec<CardId>> {
    read_card_list(File::open(path)?, delimiter)
}

/// Read a watchlist: a header row, then `name,set,grade,quantity` rows.
///
/// Names and set codes are lower-cased; the chart matches them against
/// price-history columns case-insensitively. Sorted by name.
pub fn read_watchlist<R: Read>(reader: R, delimiter: char) -> Result<Vec<WatchlistEntry>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let name = field(&record, 0, "name")?.to_lowercase();
        let raw_quantity = field(&record, 3, "quantity")?;
        let quantity = raw_quantity
            .parse::<u32>()
            .map_err(|_| Error::parse(format!("{}: bad quantity '{}'", name, raw_quantity)))?;
        entries.push(WatchlistEntry {
            set_code: field(&record, 1, "set")?.to_lowercase(),
            grade: field(&record, 2, "grade")?.to_string(),
            name,
            quantity,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Read a watchlist file.
pub fn read_watchlist_file(path: impl AsRef<Path>, delimiter: char) -> Result<Vec<WatchlistEntry>> {
    read_watchlist(File::open(path)?, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_list_sorted_and_cleaned() {
        let data = "name,set,variant\n\
                    Time Walk,LEB,\n\
                    Plains,LEA,A\n\
                    Circle of Protection: Red,LEA,\n\
                    Black Lotus,LEA,\n";
        let cards = read_card_list(data.as_bytes(), ',').unwrap();

        let keys: Vec<String> = cards.iter().map(CardId::column_name).collect();
        assert_eq!(
            keys,
            vec![
                "Black Lotus_LEA",
                "Circle of Protection_ Red_LEA",
                "Plains_LEA_A",
                "Time Walk_LEB",
            ]
        );
    }

    #[test]
    fn test_card_list_semicolon_delimiter() {
        let data = "name;set\nMox Pearl;LEA\n";
        let cards = read_card_list(data.as_bytes(), ';').unwrap();
        assert_eq!(cards, vec![CardId::new("Mox Pearl", "LEA", None)]);
    }

    #[test]
    fn test_card_list_missing_set() {
        let data = "name,set\nMox Pearl,\n";
        let err = read_card_list(data.as_bytes(), ',').unwrap_err();
        assert!(matches!(err, Error::MissingColumn(_)));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        assert!(read_card_list("a".as_bytes(), '§').is_err());
    }

    #[test]
    fn test_watchlist() {
        let data = "name,set,grade,quantity\nTime Walk,LEB,EX,2\nBlack Lotus,LEA,NM,1\n";
        let entries = read_watchlist(data.as_bytes(), ',').unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "black lotus");
        assert_eq!(entries[0].set_code, "lea");
        assert_eq!(entries[0].column_name(), "black lotus_lea");
        assert_eq!(entries[1].grade, "EX");
        assert_eq!(entries[1].quantity, 2);
    }

    #[test]
    fn test_watchlist_bad_quantity() {
        let data = "name,set,grade,quantity\nTime Walk,LEB,EX,two\n";
        assert!(matches!(
            read_watchlist(data.as_bytes(), ',').unwrap_err(),
            Error::Parse(_)
        ));
    }
}
