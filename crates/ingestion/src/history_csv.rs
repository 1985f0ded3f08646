//! CSV persistence of price-history tables and per-item downloads.
//!
//! Tables are written with a `date` column followed by one column per item.
//! Absent cells are written as empty fields, numbers with Rust's shortest
//! round-trip formatting, so re-writing an unchanged table is byte-identical.

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use lotscout_core::{Error, PriceHistoryTable, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(raw: &str) -> Result<NaiveDate> {
    // Some sources append a time of day; only the date part is kept.
    let day = raw.split_whitespace().next().unwrap_or_default();
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map_err(|e| Error::parse(format!("bad date '{}': {}", raw, e)))
}

fn parse_cell(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| Error::parse(format!("bad price '{}'", raw)))
}

/// Read a wide price-history table.
///
/// The first column is the date index; rows may come in any order but dates
/// must be unique.
pub fn read_price_history<R: Read>(reader: R) -> Result<PriceHistoryTable> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(Error::missing_column("date"));
    }
    let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let date = parse_date(record.get(0).unwrap_or_default())?;
        let cells = (1..=names.len())
            .map(|i| parse_cell(record.get(i).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;
        rows.push((date, cells));
    }
    rows.sort_by_key(|(date, _)| *date);

    let dates: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, rows.iter().map(|(_, cells)| cells[i]).collect()))
        .collect();

    PriceHistoryTable::from_columns(dates, columns)
}

/// Read a price-history table file.
pub fn read_price_history_file(path: impl AsRef<Path>) -> Result<PriceHistoryTable> {
    read_price_history(File::open(path)?)
}

/// Write a price-history table.
pub fn write_price_history<W: Write>(writer: W, table: &PriceHistoryTable) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    let mut header = Vec::with_capacity(table.column_count() + 1);
    header.push("date");
    header.extend(table.column_names().iter().map(String::as_str));
    wtr.write_record(&header)?;

    let columns: Vec<&[Option<f64>]> = table.columns().map(|(_, cells)| cells).collect();
    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        record.extend(
            columns
                .iter()
                .map(|cells| cells[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a price-history table file, creating parent directories.
pub fn write_price_history_file(path: impl AsRef<Path>, table: &PriceHistoryTable) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_price_history(File::create(path)?, table)
}

/// Read a single item's headerless `date,price` series.
///
/// Later rows win when a date repeats.
pub fn read_item_series<R: Read>(reader: R) -> Result<BTreeMap<NaiveDate, f64>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut series = BTreeMap::new();
    for record in rdr.records() {
        let record = record?;
        let date_raw = record.get(0).unwrap_or_default();
        if date_raw.is_empty() {
            continue;
        }
        let date = parse_date(date_raw)?;
        if let Some(price) = parse_cell(record.get(1).unwrap_or_default())? {
            series.insert(date, price);
        }
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_read_item_series() {
        let data = "2021-01-02, 12.5\n2021-01-01, 10\n\n2021-01-03,\n";
        let series = read_item_series(data.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[&date("2021-01-01")], 10.0);
        assert_eq!(series[&date("2021-01-02")], 12.5);
    }

    #[test]
    fn test_read_item_series_bad_price() {
        let data = "2021-01-01, n/a\n";
        assert!(read_item_series(data.as_bytes()).is_err());
    }

    #[test]
    fn test_read_price_history_sorts_rows() {
        let data = "date,A_LEA,B_LEB\n2021-01-02,2,\n2021-01-01,1,5.5\n";
        let table = read_price_history(data.as_bytes()).unwrap();
        assert_eq!(table.dates(), &[date("2021-01-01"), date("2021-01-02")]);
        assert_eq!(table.column("A_LEA").unwrap(), &[Some(1.0), Some(2.0)]);
        assert_eq!(table.column("B_LEB").unwrap(), &[Some(5.5), None]);
    }

    #[test]
    fn test_read_price_history_duplicate_date() {
        let data = "date,A_LEA\n2021-01-01,1\n2021-01-01,2\n";
        assert!(read_price_history(data.as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_read_is_stable() {
        let data = "date,A_LEA,B_LEB\n2021-01-01,1,5.5\n2021-01-02,2.25,\n";
        let table = read_price_history(data.as_bytes()).unwrap();

        let mut first = Vec::new();
        write_price_history(&mut first, &table).unwrap();
        assert_eq!(String::from_utf8(first.clone()).unwrap(), data);

        let reread = read_price_history(first.as_slice()).unwrap();
        let mut second = Vec::new();
        write_price_history(&mut second, &reread).unwrap();
        assert_eq!(first, second);
    }
}
