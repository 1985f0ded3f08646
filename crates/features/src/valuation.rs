//! Grade-adjusted valuation of a card from its price history.

use crate::stats::value_stats;
use chrono::NaiveDate;
use lotscout_core::{GradeTable, ItemKey, PriceHistoryTable, ValueStats};
use tracing::warn;

/// Multiplier for `grade`, or `default` when the grade table lacks it.
///
/// The flag is true when the default was applied.
pub fn grade_multiplier(grades: &GradeTable, grade: &str, default: f64) -> (f64, bool) {
    match grades.lookup(grade) {
        Some(multiplier) => (multiplier, false),
        None => (default, true),
    }
}

/// Value estimate for one card.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    /// Price-history column used.
    pub column: ItemKey,
    /// Grade multiplier applied.
    pub multiplier: f64,
    /// True when the grade was unknown and the default multiplier used.
    pub grade_defaulted: bool,
    /// Grade-adjusted statistics over the window.
    pub stats: ValueStats,
}

/// Result of a valuation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ValuationOutcome {
    /// Statistics are available.
    Valued(Valuation),
    /// No price-history column matches the card.
    NoHistory { key: ItemKey },
    /// The column has no observations inside the window.
    NoObservations { column: ItemKey },
}

/// Values cards against a windowed price-history table.
#[derive(Debug, Clone)]
pub struct ValuationEngine {
    table: PriceHistoryTable,
    grades: GradeTable,
    default_multiplier: f64,
}

impl ValuationEngine {
    /// Create an engine over an already windowed table.
    pub fn new(table: PriceHistoryTable, grades: GradeTable, default_multiplier: f64) -> Self {
        Self {
            table,
            grades,
            default_multiplier,
        }
    }

    /// Create an engine over `table` restricted to `[begin, end]`.
    pub fn windowed(
        table: &PriceHistoryTable,
        begin: NaiveDate,
        end: NaiveDate,
        grades: GradeTable,
        default_multiplier: f64,
    ) -> Self {
        if begin > end {
            warn!(%begin, %end, "price-history window is inverted, no lot can be valued");
        }
        Self::new(table.window(begin, end), grades, default_multiplier)
    }

    /// The windowed table.
    pub fn table(&self) -> &PriceHistoryTable {
        &self.table
    }

    /// Value `name` from set `set_code` in condition `grade`.
    ///
    /// `name` must already be stripped of any variant suffix; variant
    /// columns are picked up by the column lookup.
    pub fn valuate(&self, name: &str, set_code: &str, grade: &str) -> ValuationOutcome {
        let key = format!("{}_{}", name, set_code);
        let Some(column) = self.table.find_column(&key) else {
            warn!(item = %key, "no matches in price history");
            return ValuationOutcome::NoHistory { key };
        };

        let (multiplier, grade_defaulted) =
            grade_multiplier(&self.grades, grade, self.default_multiplier);
        if grade_defaulted {
            warn!(
                item = %key,
                grade,
                multiplier,
                "grade not in grade table, discounting value estimates by default multiplier"
            );
        }

        let cells = self.table.column(column).unwrap_or_default();
        match value_stats(cells) {
            Some(stats) => ValuationOutcome::Valued(Valuation {
                column: column.to_string(),
                multiplier,
                grade_defaulted,
                stats: stats.scaled(multiplier),
            }),
            None => ValuationOutcome::NoObservations {
                column: column.to_string(),
            },
        }
    }
}
