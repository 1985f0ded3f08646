//! Wide price-history table: one row per date, one column per item.

use crate::error::{Error, Result};
use crate::types::ItemKey;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Date-indexed price table.
///
/// Dates are unique and ascending. Cells are stored column-major; an absent
/// cell means the source had no observation for that date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceHistoryTable {
    dates: Vec<NaiveDate>,
    columns: Vec<ItemKey>,
    values: Vec<Vec<Option<f64>>>,
}

impl PriceHistoryTable {
    /// Outer-join per-item series into one table, keeping the given column order.
    pub fn from_series<I>(series: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ItemKey, BTreeMap<NaiveDate, f64>)>,
    {
        let series: Vec<(ItemKey, BTreeMap<NaiveDate, f64>)> = series.into_iter().collect();

        let mut seen = HashSet::with_capacity(series.len());
        for (name, _) in &series {
            if !seen.insert(name.as_str()) {
                return Err(Error::data(format!("duplicate column '{}'", name)));
            }
        }

        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, points)| points.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut columns = Vec::with_capacity(series.len());
        let mut values = Vec::with_capacity(series.len());
        for (name, points) in series {
            values.push(dates.iter().map(|d| points.get(d).copied()).collect());
            columns.push(name);
        }

        Ok(Self { dates, columns, values })
    }

    /// Build a table from an ascending date index and aligned columns.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(ItemKey, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::data(format!(
                "dates must be unique and ascending ({} then {})",
                pair[0], pair[1]
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, cells) in columns {
            if cells.len() != dates.len() {
                return Err(Error::data(format!(
                    "column '{}' has {} cells for {} dates",
                    name,
                    cells.len(),
                    dates.len()
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::data(format!("duplicate column '{}'", name)));
            }
            names.push(name);
            values.push(cells);
        }

        Ok(Self {
            dates,
            columns: names,
            values,
        })
    }

    /// Date index.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Column names in table order.
    pub fn column_names(&self) -> &[ItemKey] {
        &self.columns
    }

    /// Cells of a column, aligned with `dates()`.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Cells of a column whose name matches case-insensitively.
    pub fn column_ignore_case(&self, name: &str) -> Option<(&str, &[Option<f64>])> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| (self.columns[i].as_str(), self.values[i].as_slice()))
    }

    /// Iterate over (name, cells) pairs.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(name, cells)| (name.as_str(), cells.as_slice()))
    }

    /// Resolve a `name_setCode` key to a column.
    ///
    /// An exact match wins; otherwise the first column containing the key is
    /// used, which picks up variant columns (`name_setCode_variant`).
    pub fn find_column(&self, key: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.as_str() == key)
            .or_else(|| self.columns.iter().find(|c| c.contains(key)))
            .map(String::as_str)
    }

    /// Restrict the table to dates in `[begin, end]`.
    ///
    /// An inverted window yields a table with no rows.
    pub fn window(&self, begin: NaiveDate, end: NaiveDate) -> Self {
        let start = self.dates.partition_point(|d| *d < begin);
        let stop = self.dates.partition_point(|d| *d <= end).max(start);

        Self {
            dates: self.dates[start..stop].to_vec(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|cells| cells[start..stop].to_vec())
                .collect(),
        }
    }

    /// Number of date rows.
    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    /// Number of item columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(points: &[(&str, f64)]) -> BTreeMap<NaiveDate, f64> {
        points.iter().map(|(d, v)| (date(d), *v)).collect()
    }

    fn sample_table() -> PriceHistoryTable {
        PriceHistoryTable::from_series(vec![
            (
                "Black Lotus_LEA".to_string(),
                series(&[("2021-01-01", 10.0), ("2021-01-02", 20.0), ("2021-01-03", 30.0)]),
            ),
            (
                "Plains_LEA_A".to_string(),
                series(&[("2021-01-02", 1.0), ("2021-01-04", 2.0)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_outer_join() {
        let table = sample_table();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.column_count(), 2);

        let plains = table.column("Plains_LEA_A").unwrap();
        assert_eq!(plains, &[None, Some(1.0), None, Some(2.0)]);

        let lotus = table.column("Black Lotus_LEA").unwrap();
        assert_eq!(lotus[3], None);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = PriceHistoryTable::from_series(vec![
            ("A_LEA".to_string(), series(&[("2021-01-01", 1.0)])),
            ("A_LEA".to_string(), series(&[("2021-01-02", 2.0)])),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_find_column_prefers_exact() {
        let table = PriceHistoryTable::from_series(vec![
            ("Plains_LEA_A".to_string(), series(&[("2021-01-01", 1.0)])),
            ("Plains_LEA".to_string(), series(&[("2021-01-01", 2.0)])),
        ])
        .unwrap();
        assert_eq!(table.find_column("Plains_LEA"), Some("Plains_LEA"));
    }

    #[test]
    fn test_find_column_variant_fallback() {
        let table = sample_table();
        assert_eq!(table.find_column("Plains_LEA"), Some("Plains_LEA_A"));
        assert_eq!(table.find_column("Island_LEA"), None);
    }

    #[test]
    fn test_window() {
        let table = sample_table();
        let windowed = table.window(date("2021-01-02"), date("2021-01-03"));
        assert_eq!(windowed.dates(), &[date("2021-01-02"), date("2021-01-03")]);
        assert_eq!(windowed.column("Black Lotus_LEA").unwrap(), &[Some(20.0), Some(30.0)]);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let table = sample_table();
        let windowed = table.window(date("2021-01-03"), date("2021-01-01"));
        assert!(windowed.is_empty());
        assert_eq!(windowed.column_count(), 2);
        assert!(windowed.column("Black Lotus_LEA").unwrap().is_empty());
    }

    #[test]
    fn test_from_columns_rejects_unsorted_dates() {
        let result = PriceHistoryTable::from_columns(
            vec![date("2021-01-02"), date("2021-01-01")],
            vec![("A_LEA".to_string(), vec![Some(1.0), Some(2.0)])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_columns_rejects_ragged_column() {
        let result = PriceHistoryTable::from_columns(
            vec![date("2021-01-01")],
            vec![("A_LEA".to_string(), vec![Some(1.0), Some(2.0)])],
        );
        assert!(result.is_err());
    }
}
