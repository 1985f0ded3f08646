//! Column transforms used to prepare price series for charting.

/// Drop values at or above `limit`.
pub fn remove_at_or_above(cells: &[Option<f64>], limit: f64) -> Vec<Option<f64>> {
    cells
        .iter()
        .map(|cell| cell.filter(|v| *v < limit))
        .collect()
}

/// Cap values at `limit`.
pub fn clip_upper(cells: &[Option<f64>], limit: f64) -> Vec<Option<f64>> {
    cells.iter().map(|cell| cell.map(|v| v.min(limit))).collect()
}

/// Carry the last observed value forward over gaps.
///
/// Leading gaps stay absent.
pub fn forward_fill(cells: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    cells
        .iter()
        .map(|cell| {
            if cell.is_some() {
                last = *cell;
            }
            last
        })
        .collect()
}

/// Multiply every value by `factor`.
pub fn scale(cells: &[Option<f64>], factor: f64) -> Vec<Option<f64>> {
    cells.iter().map(|cell| cell.map(|v| v * factor)).collect()
}

/// Largest observed value.
pub fn max_value(cells: &[Option<f64>]) -> Option<f64> {
    cells.iter().flatten().copied().reduce(f64::max)
}

/// Row-wise weighted average of aligned series.
///
/// A row has no value when any series lacks one there.
pub fn weighted_average(series: &[(&[Option<f64>], f64)]) -> Vec<Option<f64>> {
    let total_weight: f64 = series.iter().map(|(_, w)| w).sum();
    let len = series.iter().map(|(cells, _)| cells.len()).max().unwrap_or(0);
    if total_weight <= 0.0 {
        return vec![None; len];
    }

    (0..len)
        .map(|row| {
            series
                .iter()
                .map(|(cells, weight)| cells.get(row).copied().flatten().map(|v| v * weight))
                .sum::<Option<f64>>()
                .map(|sum| sum / total_weight)
        })
        .collect()
}

/// Row-wise sum of the observed values; rows with nothing observed sum to 0.
pub fn row_sums(columns: &[&[Option<f64>]], len: usize) -> Vec<f64> {
    (0..len)
        .map(|row| {
            columns
                .iter()
                .filter_map(|cells| cells.get(row).copied().flatten())
                .sum()
        })
        .collect()
}
