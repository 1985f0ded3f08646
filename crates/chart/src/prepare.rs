//! Turning price-history tables into chart series.

use crate::render::{ChartSeries, ChartSpec};
use chrono::NaiveDate;
use lotscout_core::config::ChartConfig;
use lotscout_core::{Error, GradeTable, ItemKey, PriceHistoryTable, Result, WatchlistEntry};
use lotscout_features::grade_multiplier;
use lotscout_features::series::{
    clip_upper, forward_fill, max_value, remove_at_or_above, row_sums, scale, weighted_average,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Label of the quantity-weighted average line.
pub const WEIGHTED_AVG_LABEL: &str = "_WEIGHTED_AVG";

/// Label of the grand-total line.
pub const TOTAL_ALL_LABEL: &str = "_TOTAL_ALL";

fn tame(cells: &[Option<f64>], config: &ChartConfig) -> Vec<Option<f64>> {
    clip_upper(&remove_at_or_above(cells, config.remove), config.clip)
}

/// A watchlist's grade-adjusted price lines and their weighted average.
#[derive(Debug, Clone)]
pub struct WatchlistChart {
    pub spec: ChartSpec,
    /// Copies across the plotted cards.
    pub total_quantity: u32,
    /// Watchlist keys without a price-history column.
    pub missing: Vec<ItemKey>,
    /// Series left out for staying below the minimum max value.
    pub dropped: Vec<String>,
}

impl WatchlistChart {
    /// Prepare the chart.
    ///
    /// Per card: values at or above `remove` are dropped, the rest clipped
    /// at `clip` and scaled by the grade multiplier. Cards whose maximum
    /// stays below `min_max_value` are left out. Gaps are then filled
    /// forward if configured, and the weighted average is taken over what
    /// remains.
    pub fn build(
        table: &PriceHistoryTable,
        watchlist: &[WatchlistEntry],
        grades: &GradeTable,
        config: &ChartConfig,
        default_multiplier: f64,
    ) -> Result<Self> {
        let mut missing = Vec::new();
        let mut dropped = Vec::new();
        let mut kept: Vec<(ChartSeries, u32)> = Vec::new();

        for entry in watchlist {
            let key = entry.column_name();
            let Some((_, cells)) = table.column_ignore_case(&key) else {
                missing.push(key);
                continue;
            };

            let (multiplier, defaulted) =
                grade_multiplier(grades, &entry.grade, default_multiplier);
            if defaulted {
                warn!(
                    item = %key,
                    grade = %entry.grade,
                    multiplier,
                    "grade not in grade table, using default multiplier"
                );
            }

            let label = format!("{}_{} ({})", key, entry.grade, entry.quantity);
            let values = scale(&tame(cells, config), multiplier);
            match max_value(&values) {
                Some(max) if max >= config.min_max_value => {}
                _ => {
                    info!(series = %label, "below minimum max value, omitted");
                    dropped.push(label);
                    continue;
                }
            }
            kept.push((ChartSeries { label, values }, entry.quantity));
        }

        if !missing.is_empty() {
            warn!(cards = ?missing, "cards not found in price history");
        }
        if kept.is_empty() {
            return Err(Error::data("no watchlist card has price history to plot"));
        }

        if config.fill_missing {
            for (series, _) in &mut kept {
                series.values = forward_fill(&series.values);
            }
        }

        let weighted: Vec<(&[Option<f64>], f64)> = kept
            .iter()
            .map(|(series, quantity)| (series.values.as_slice(), f64::from(*quantity)))
            .collect();
        let average = weighted_average(&weighted);

        let total_quantity = kept.iter().map(|(_, q)| q).sum();
        let mut series: Vec<ChartSeries> = kept.into_iter().map(|(s, _)| s).collect();
        series.push(ChartSeries {
            label: WEIGHTED_AVG_LABEL.to_string(),
            values: average,
        });

        Ok(Self {
            spec: ChartSpec {
                title: Some(format!("Price trends, n={} cards", total_quantity)),
                color_field: "name".to_string(),
                dates: table.dates().to_vec(),
                series,
                width: config.width,
                log10: config.log10,
                tick_count: 100,
            },
            total_quantity,
            missing,
            dropped,
        })
    }
}

/// Per-table totals over several price-history tables, plus their sum.
#[derive(Debug, Clone)]
pub struct SetTotalsChart {
    pub spec: ChartSpec,
}

impl SetTotalsChart {
    /// Prepare the chart from labelled tables (typically one per set).
    ///
    /// Every column is tamed like the watchlist chart, filled forward if
    /// configured, and summed per date. Dates are the union over all
    /// tables; a table contributes nothing on dates it does not cover.
    pub fn build(tables: &[(String, PriceHistoryTable)], config: &ChartConfig) -> Result<Self> {
        if tables.is_empty() {
            return Err(Error::data("no price-history tables to sum"));
        }

        let dates: Vec<NaiveDate> = tables
            .iter()
            .flat_map(|(_, table)| table.dates().iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut series = Vec::with_capacity(tables.len() + 1);
        for (label, table) in tables {
            let columns: Vec<Vec<Option<f64>>> = table
                .columns()
                .map(|(_, cells)| {
                    let tamed = tame(cells, config);
                    if config.fill_missing {
                        forward_fill(&tamed)
                    } else {
                        tamed
                    }
                })
                .collect();
            let slices: Vec<&[Option<f64>]> = columns.iter().map(Vec::as_slice).collect();
            let totals: BTreeMap<NaiveDate, f64> = table
                .dates()
                .iter()
                .copied()
                .zip(row_sums(&slices, table.row_count()))
                .collect();

            series.push(ChartSeries {
                label: label.clone(),
                values: dates.iter().map(|d| totals.get(d).copied()).collect(),
            });
        }

        let per_table: Vec<&[Option<f64>]> = series.iter().map(|s| s.values.as_slice()).collect();
        let grand_total = row_sums(&per_table, dates.len()).into_iter().map(Some).collect();
        series.push(ChartSeries {
            label: TOTAL_ALL_LABEL.to_string(),
            values: grand_total,
        });

        Ok(Self {
            spec: ChartSpec {
                title: None,
                color_field: "set".to_string(),
                dates,
                series,
                width: config.width,
                log10: config.log10,
                tick_count: 50,
            },
        })
    }
}
