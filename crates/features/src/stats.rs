//! Summary statistics of a price column.

use lotscout_core::ValueStats;
use statrs::statistics::{Data, Median, Statistics};

/// Min, max, mean and median of the observed cells.
///
/// Absent and NaN cells are skipped. Returns `None` when nothing is left,
/// e.g. for a column restricted to an empty date window.
pub fn value_stats(cells: &[Option<f64>]) -> Option<ValueStats> {
    let values: Vec<f64> = cells
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if values.is_empty() {
        return None;
    }

    let min = Statistics::min(values.iter());
    let max = Statistics::max(values.iter());
    let mean = Statistics::mean(values.iter());
    let median = Data::new(values).median();

    Some(ValueStats { min, max, mean, median })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_value_stats_odd() {
        let stats = value_stats(&[Some(30.0), None, Some(10.0), Some(20.0)]).unwrap();
        assert_relative_eq!(stats.min, 10.0);
        assert_relative_eq!(stats.max, 30.0);
        assert_relative_eq!(stats.mean, 20.0);
        assert_relative_eq!(stats.median, 20.0);
    }

    #[test]
    fn test_value_stats_even_median() {
        let stats = value_stats(&[Some(1.0), Some(2.0), Some(3.0), Some(10.0)]).unwrap();
        assert_relative_eq!(stats.median, 2.5);
        assert_relative_eq!(stats.mean, 4.0);
    }

    #[test]
    fn test_value_stats_empty() {
        assert!(value_stats(&[]).is_none());
        assert!(value_stats(&[None, Some(f64::NAN)]).is_none());
    }
}
