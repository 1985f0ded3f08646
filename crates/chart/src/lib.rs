//! Price-history charts for the lotscout system.
//!
//! This crate handles:
//! - Watchlist charts (grade-adjusted lines plus a quantity-weighted average)
//! - Set-total charts over several price-history tables
//! - Rendering to a standalone Vega-Lite HTML page

pub mod prepare;
pub mod render;

pub use prepare::{SetTotalsChart, WatchlistChart, TOTAL_ALL_LABEL, WEIGHTED_AVG_LABEL};
pub use render::{
    render_html, set_totals_file_name, watchlist_plot_file_name, write_html, ChartSeries,
    ChartSpec,
};
