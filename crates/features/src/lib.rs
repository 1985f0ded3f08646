//! Value features for the lotscout system.
//!
//! This crate handles:
//! - Summary statistics of price columns (min, max, mean, median)
//! - Grade-adjusted card valuation over a date window
//! - Series transforms for charting (outlier removal, clipping, gap filling,
//!   weighted averages)

pub mod stats;
pub mod series;
pub mod valuation;

pub use stats::value_stats;
pub use valuation::{grade_multiplier, Valuation, ValuationEngine, ValuationOutcome};
