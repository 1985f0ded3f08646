//! Readers for the grade and currency reference tables.

use csv::{ReaderBuilder, Trim};
use lotscout_core::{CurrencyTable, Error, GradeTable, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GradeRow {
    abbreviation: String,
    price_multiplier: f64,
}

/// Read a grade table file with `abbreviation,price_multiplier` columns.
pub fn read_grade_table(path: impl AsRef<Path>) -> Result<GradeTable> {
    grade_table_from_reader(File::open(path)?)
}

/// Read a grade table from any reader. Extra columns are ignored.
pub fn grade_table_from_reader<R: Read>(reader: R) -> Result<GradeTable> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut entries = Vec::new();
    for row in rdr.deserialize::<GradeRow>() {
        let row = row?;
        if row.price_multiplier <= 0.0 {
            return Err(Error::data(format!(
                "grade '{}' has non-positive multiplier {}",
                row.abbreviation, row.price_multiplier
            )));
        }
        entries.push((row.abbreviation, row.price_multiplier));
    }
    Ok(GradeTable::new(entries))
}

/// Read a currency table file with `currency,<REF>_multiplier` columns.
pub fn read_currency_table(path: impl AsRef<Path>) -> Result<CurrencyTable> {
    currency_table_from_reader(File::open(path)?)
}

/// Read a currency table from any reader.
///
/// The multiplier column is the first header ending in `_multiplier`
/// (e.g. `USD_multiplier`), so the reference currency is named by the file.
pub fn currency_table_from_reader<R: Read>(reader: R) -> Result<CurrencyTable> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let currency_idx = headers
        .iter()
        .position(|h| h == "currency")
        .ok_or_else(|| Error::missing_column("currency"))?;
    let (multiplier_idx, reference) = headers
        .iter()
        .enumerate()
        .find_map(|(i, h)| h.strip_suffix("_multiplier").map(|code| (i, code.to_string())))
        .ok_or_else(|| Error::missing_column("<CUR>_multiplier"))?;

    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let code = record.get(currency_idx).unwrap_or_default();
        let raw = record.get(multiplier_idx).unwrap_or_default();
        let multiplier: f64 = raw
            .parse()
            .map_err(|_| Error::parse(format!("currency '{}': bad multiplier '{}'", code, raw)))?;
        entries.push((code.to_string(), multiplier));
    }
    Ok(CurrencyTable::new(entries).with_reference(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_read_grades() {
        let data = "abbreviation,name,price_multiplier\nnm,Near Mint,1.0\nex,Excellent,0.8\n";
        let grades = grade_table_from_reader(data.as_bytes()).unwrap();
        assert_eq!(grades.len(), 2);
        assert_eq!(grades.lookup("EX"), Some(0.8));
    }

    #[test]
    fn test_grades_reject_zero_multiplier() {
        let data = "abbreviation,price_multiplier\nnm,0\n";
        assert!(grade_table_from_reader(data.as_bytes()).is_err());
    }

    #[test]
    fn test_read_currencies() {
        let data = "currency,USD_multiplier\nDKK,0.16\nSEK,0.11\nUSD,1\n";
        let currencies = currency_table_from_reader(data.as_bytes()).unwrap();
        assert_eq!(currencies.len(), 3);
        assert_relative_eq!(currencies.multiplier("sek").unwrap(), 0.11);
        assert_eq!(currencies.reference(), Some("USD"));
    }

    #[test]
    fn test_currencies_missing_column() {
        let data = "currency,rate\nDKK,0.16\n";
        let err = currency_table_from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(_)));
    }
}
