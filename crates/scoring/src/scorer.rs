//! Per-lot scoring against the price history.
//!
//! A lot goes through eligibility checks, valuation, the value band and the
//! bid-ratio threshold. Lots that cannot be valued get an explicit
//! [`ScoreOutcome::Unresolvable`] instead of silently failing comparisons.

use crate::recommend::RecommendationPolicy;
use crate::summary::ScoreSummary;
use lotscout_core::config::ScoringConfig;
use lotscout_core::{
    strip_variant_suffix, AuctionLot, Config, CurrencyTable, GradeTable, Language, Money,
    PriceHistoryTable, ScoredLot, SetCatalog,
};
use lotscout_features::{ValuationEngine, ValuationOutcome};
use ordered_float::OrderedFloat;
use tracing::{debug, info};

/// Why a lot was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    /// Not an English printing.
    ForeignLanguage,
    /// Already bought out.
    BoughtOut,
    /// Grade is on the skip list.
    SkippedGrade,
    /// Set is not among the accepted sets.
    SetNotAccepted,
    /// Set name has no set code.
    UnknownSet,
    /// Median value below the band.
    ValueBelowBand,
    /// Median value above the band.
    ValueAboveBand,
    /// Bid / median ratio above the threshold.
    BidRatioAboveThreshold,
}

/// Why a lot could not be valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unresolvable {
    /// No price-history column matches.
    NoHistory,
    /// The matched column has no observations in the window.
    NoObservations,
    /// The bid currency is not in the currency table.
    UnknownCurrency,
}

/// Result of scoring one lot.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Accepted(ScoredLot),
    Rejected(RejectReason),
    Unresolvable(Unresolvable),
}

impl ScoreOutcome {
    /// The scored lot, if accepted.
    pub fn accepted(self) -> Option<ScoredLot> {
        match self {
            ScoreOutcome::Accepted(scored) => Some(scored),
            _ => None,
        }
    }
}

/// Accepted lots of a run and the outcome tally.
#[derive(Debug, Clone, Default)]
pub struct ScoreRun {
    /// Accepted lots, ascending by bid / median ratio.
    pub accepted: Vec<ScoredLot>,
    pub summary: ScoreSummary,
}

/// Scores auction lots.
#[derive(Debug, Clone)]
pub struct LotScorer {
    engine: ValuationEngine,
    currencies: CurrencyTable,
    sets: SetCatalog,
    policy: RecommendationPolicy,
    value_median_lowest: f64,
    value_median_max: f64,
    bid_ratio_threshold: f64,
    skip_grades: Vec<String>,
    accepted_sets: Option<Vec<String>>,
}

impl LotScorer {
    /// Create a scorer from a valuation engine and scoring settings.
    pub fn new(
        engine: ValuationEngine,
        currencies: CurrencyTable,
        config: &ScoringConfig,
        sets: SetCatalog,
    ) -> Self {
        Self {
            engine,
            currencies,
            sets,
            policy: RecommendationPolicy::from(&config.policy),
            value_median_lowest: config.value_median_lowest,
            value_median_max: config.value_median_max,
            bid_ratio_threshold: config.bid_ratio_threshold,
            skip_grades: config.skip_grades.clone(),
            accepted_sets: config.accepted_sets.clone(),
        }
    }

    /// Create a scorer over `table` windowed as configured.
    pub fn from_config(
        table: &PriceHistoryTable,
        grades: GradeTable,
        currencies: CurrencyTable,
        config: &Config,
    ) -> Self {
        let scoring = &config.scoring;
        let engine = ValuationEngine::windowed(
            table,
            scoring.window_begin,
            scoring.window_end,
            grades,
            scoring.policy.default_grade_multiplier,
        );
        Self::new(engine, currencies, scoring, config.sets.clone())
    }

    fn eligibility(&self, lot: &AuctionLot) -> Result<(), RejectReason> {
        if lot.language != Language::English {
            return Err(RejectReason::ForeignLanguage);
        }
        if lot.bought_out {
            return Err(RejectReason::BoughtOut);
        }
        if self.skip_grades.iter().any(|g| g.eq_ignore_ascii_case(lot.grade.trim())) {
            return Err(RejectReason::SkippedGrade);
        }
        if let Some(accepted) = &self.accepted_sets {
            if !accepted.iter().any(|s| s.trim().eq_ignore_ascii_case(lot.set_name.trim())) {
                return Err(RejectReason::SetNotAccepted);
            }
        }
        Ok(())
    }

    /// Score one lot.
    pub fn score(&self, lot: &AuctionLot) -> ScoreOutcome {
        if let Err(reason) = self.eligibility(lot) {
            return ScoreOutcome::Rejected(reason);
        }
        let Some(set_code) = self.sets.code_for(&lot.set_name) else {
            debug!(set = %lot.set_name, "no set code");
            return ScoreOutcome::Rejected(RejectReason::UnknownSet);
        };

        let name = strip_variant_suffix(lot.name.trim());
        let valuation = match self.engine.valuate(name, set_code, &lot.grade) {
            ValuationOutcome::Valued(valuation) => valuation,
            ValuationOutcome::NoHistory { .. } => {
                return ScoreOutcome::Unresolvable(Unresolvable::NoHistory)
            }
            ValuationOutcome::NoObservations { .. } => {
                return ScoreOutcome::Unresolvable(Unresolvable::NoObservations)
            }
        };

        let median = valuation.stats.median;
        if median < self.value_median_lowest || median <= 0.0 {
            return ScoreOutcome::Rejected(RejectReason::ValueBelowBand);
        }
        if median > self.value_median_max {
            return ScoreOutcome::Rejected(RejectReason::ValueAboveBand);
        }

        let Some(bid_multiplier) = self.currencies.multiplier(&lot.current_bid.currency) else {
            debug!(currency = %lot.current_bid.currency, "unknown bid currency");
            return ScoreOutcome::Unresolvable(Unresolvable::UnknownCurrency);
        };
        let current_bid_ref = lot.current_bid.amount * bid_multiplier;
        let bid_ratio = current_bid_ref / median;
        if bid_ratio > self.bid_ratio_threshold {
            return ScoreOutcome::Rejected(RejectReason::BidRatioAboveThreshold);
        }

        let buyout_ref = lot.buyout.as_ref().and_then(|b| self.currencies.to_reference(b));
        let buyout_ratio = buyout_ref.map(|b| b / median);

        ScoreOutcome::Accepted(ScoredLot {
            lot: lot.clone(),
            column: valuation.column,
            grade_multiplier: valuation.multiplier,
            value: valuation.stats,
            current_bid_ref,
            buyout_ref,
            bid_median_value_ratio: bid_ratio,
            buyout_median_value_ratio: buyout_ratio,
            recommendation: self.policy.label(bid_ratio),
            max_bid: Money::new(median / bid_multiplier, lot.current_bid.currency.clone()),
            do_bid: false,
            status: None,
            paid: None,
        })
    }

    /// Score every lot; accepted lots come back sorted by bid ratio.
    pub fn score_all<'a, I>(&self, lots: I) -> ScoreRun
    where
        I: IntoIterator<Item = &'a AuctionLot>,
    {
        let mut run = ScoreRun::default();
        for lot in lots {
            let outcome = self.score(lot);
            run.summary.record(&outcome);
            if let Some(scored) = outcome.accepted() {
                run.accepted.push(scored);
            }
        }
        sort_by_bid_ratio(&mut run.accepted);
        info!(summary = %run.summary, "lots scored");
        run
    }
}

/// Sort ascending by bid / median ratio; ties keep their order.
pub fn sort_by_bid_ratio(lots: &mut [ScoredLot]) {
    lots.sort_by_key(|scored| OrderedFloat(scored.bid_median_value_ratio));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use lotscout_core::{Recommendation, ValueStats};
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn history() -> PriceHistoryTable {
        let series = |values: &[f64]| -> BTreeMap<NaiveDate, f64> {
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (date(2021, 1, i as u32 + 1), *v))
                .collect()
        };
        PriceHistoryTable::from_series(vec![
            ("Black Lotus_LEA".to_string(), series(&[10.0, 20.0, 30.0])),
            ("Mox Pearl_LEA".to_string(), series(&[100.0, 100.0, 100.0])),
            ("Plains_LEA_A".to_string(), series(&[40.0, 40.0])),
            ("Time Walk_LEB".to_string(), series(&[5000.0])),
            ("Ancestral Recall_LEA".to_string(), series(&[2.0, 2.0])),
        ])
        .unwrap()
    }

    fn grades() -> GradeTable {
        GradeTable::new([("nm", 1.0), ("ex", 0.8), ("gd", 0.5)])
    }

    fn currencies() -> CurrencyTable {
        CurrencyTable::new([("USD", 1.0), ("DKK", 0.16), ("EUR", 1.1)])
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.scoring.window_begin = date(2021, 1, 1);
        config.scoring.window_end = date(2021, 12, 31);
        config.scoring.value_median_lowest = 5.0;
        config.scoring.value_median_max = 2500.0;
        config.scoring.bid_ratio_threshold = 1.25;
        config
    }

    fn scorer_with(config: &Config) -> LotScorer {
        LotScorer::from_config(&history(), grades(), currencies(), config)
    }

    fn lot(name: &str, set: &str, grade: &str, bid: Money) -> AuctionLot {
        AuctionLot {
            name: name.to_string(),
            set_name: set.to_string(),
            rarity: None,
            language: Language::English,
            grade: grade.to_string(),
            current_bid: bid,
            highest_bidder: None,
            buyout: None,
            bought_out: false,
            ends: date(2021, 9, 19).and_hms_opt(20, 0, 0).unwrap(),
            auction_id: 35697,
            url: "https://example.test/auction/35697".to_string(),
            bid_box_name: "bud[1]".to_string(),
        }
    }

    #[test]
    fn test_accepted_lot() {
        let scorer = scorer_with(&config());
        let mut candidate = lot("Mox Pearl", "Alpha", "NM", Money::new(500.0, "DKK"));
        candidate.buyout = Some(Money::new(1000.0, "EUR"));

        let scored = scorer.score(&candidate).accepted().unwrap();
        assert_eq!(scored.column, "Mox Pearl_LEA");
        assert_relative_eq!(scored.current_bid_ref, 80.0, epsilon = 1e-9);
        assert_relative_eq!(scored.bid_median_value_ratio, 0.8, epsilon = 1e-9);
        assert_eq!(scored.recommendation, Recommendation::Maybe);
        assert_relative_eq!(scored.buyout_ref.unwrap(), 1100.0, epsilon = 1e-9);
        assert_relative_eq!(scored.buyout_median_value_ratio.unwrap(), 11.0, epsilon = 1e-9);
        assert_relative_eq!(scored.max_bid.amount, 625.0, epsilon = 1e-9);
        assert_eq!(scored.max_bid.currency, "DKK");
    }

    #[test]
    fn test_grade_adjusted_statistics() {
        let scorer = scorer_with(&config());
        let scored = scorer
            .score(&lot("Black Lotus", "Alpha", "GD", Money::new(5.0, "USD")))
            .accepted()
            .unwrap();
        let ValueStats { min, max, median, .. } = scored.value;
        assert_relative_eq!(median, 10.0);
        assert_relative_eq!(min, 5.0);
        assert_relative_eq!(max, 15.0);
        assert_eq!(scored.recommendation, Recommendation::Yes);
    }

    #[test]
    fn test_unknown_grade_uses_default_multiplier() {
        let scorer = scorer_with(&config());
        let scored = scorer
            .score(&lot("Mox Pearl", "Alpha", "ZZ", Money::new(10.0, "USD")))
            .accepted()
            .unwrap();
        assert_relative_eq!(scored.grade_multiplier, 0.75);
        assert_relative_eq!(scored.value.median, 75.0);
    }

    #[test]
    fn test_variant_suffix_stripped() {
        let scorer = scorer_with(&config());
        let scored = scorer
            .score(&lot("Plains v. 2", "Alpha", "NM", Money::new(10.0, "USD")))
            .accepted()
            .unwrap();
        assert_eq!(scored.column, "Plains_LEA_A");
    }

    #[test]
    fn test_unknown_currency_is_unresolvable() {
        let scorer = scorer_with(&config());
        let outcome = scorer.score(&lot("Mox Pearl", "Alpha", "NM", Money::new(10.0, "XYZ")));
        assert_eq!(outcome, ScoreOutcome::Unresolvable(Unresolvable::UnknownCurrency));
    }

    #[test]
    fn test_no_history_is_unresolvable() {
        let scorer = scorer_with(&config());
        let outcome = scorer.score(&lot("Mox Sapphire", "Alpha", "NM", Money::new(10.0, "USD")));
        assert_eq!(outcome, ScoreOutcome::Unresolvable(Unresolvable::NoHistory));
    }

    #[test]
    fn test_value_below_band_rejected_regardless_of_ratio() {
        let scorer = scorer_with(&config());
        let outcome =
            scorer.score(&lot("Ancestral Recall", "Alpha", "NM", Money::new(0.01, "USD")));
        assert_eq!(outcome, ScoreOutcome::Rejected(RejectReason::ValueBelowBand));
    }

    #[test]
    fn test_value_above_band_rejected() {
        let scorer = scorer_with(&config());
        let outcome = scorer.score(&lot("Time Walk", "Beta", "NM", Money::new(10.0, "USD")));
        assert_eq!(outcome, ScoreOutcome::Rejected(RejectReason::ValueAboveBand));
    }

    #[test]
    fn test_ratio_threshold_inclusive() {
        let scorer = scorer_with(&config());
        let at = scorer.score(&lot("Mox Pearl", "Alpha", "NM", Money::new(125.0, "USD")));
        assert_eq!(at.accepted().unwrap().recommendation, Recommendation::No);

        let above = scorer.score(&lot("Mox Pearl", "Alpha", "NM", Money::new(126.0, "USD")));
        assert_eq!(above, ScoreOutcome::Rejected(RejectReason::BidRatioAboveThreshold));
    }

    #[test]
    fn test_eligibility_checks() {
        let mut cfg = config();
        cfg.scoring.accepted_sets = Some(vec!["alpha".to_string()]);
        let scorer = scorer_with(&cfg);
        let bid = Money::new(10.0, "USD");

        let mut foreign = lot("Mox Pearl", "Alpha", "NM", bid.clone());
        foreign.language = Language::Foreign;
        assert_eq!(scorer.score(&foreign), ScoreOutcome::Rejected(RejectReason::ForeignLanguage));

        let mut bought = lot("Mox Pearl", "Alpha", "NM", bid.clone());
        bought.bought_out = true;
        assert_eq!(scorer.score(&bought), ScoreOutcome::Rejected(RejectReason::BoughtOut));

        let poor = lot("Mox Pearl", "Alpha", "PR", bid.clone());
        assert_eq!(scorer.score(&poor), ScoreOutcome::Rejected(RejectReason::SkippedGrade));

        let other_set = lot("Time Walk", "Beta", "NM", bid.clone());
        assert_eq!(scorer.score(&other_set), ScoreOutcome::Rejected(RejectReason::SetNotAccepted));

        cfg.scoring.accepted_sets = None;
        let scorer = scorer_with(&cfg);
        let unknown_set = lot("Mox Pearl", "Zendikar", "NM", bid);
        assert_eq!(scorer.score(&unknown_set), ScoreOutcome::Rejected(RejectReason::UnknownSet));
    }

    #[test]
    fn test_inverted_window_rejects_every_lot() {
        let mut cfg = config();
        cfg.scoring.window_begin = date(2021, 12, 31);
        cfg.scoring.window_end = date(2021, 1, 1);
        let scorer = scorer_with(&cfg);

        let lots = vec![
            lot("Mox Pearl", "Alpha", "NM", Money::new(10.0, "USD")),
            lot("Black Lotus", "Alpha", "NM", Money::new(1.0, "USD")),
            lot("Plains", "Alpha", "NM", Money::new(1.0, "USD")),
        ];
        let run = scorer.score_all(&lots);
        assert!(run.accepted.is_empty());
        assert_eq!(run.summary.unresolvable.get(&Unresolvable::NoObservations), Some(&3));
    }

    #[test]
    fn test_score_all_sorted_by_ratio() {
        let scorer = scorer_with(&config());
        let lots = vec![
            lot("Mox Pearl", "Alpha", "NM", Money::new(110.0, "USD")),
            lot("Black Lotus", "Alpha", "NM", Money::new(2.0, "USD")),
            lot("Plains", "Alpha", "NM", Money::new(20.0, "USD")),
            lot("Mox Pearl", "Alpha", "NM", Money::new(10.0, "XYZ")),
            lot("Ancestral Recall", "Alpha", "NM", Money::new(1.0, "USD")),
        ];
        let run = scorer.score_all(&lots);

        let ratios: Vec<f64> = run.accepted.iter().map(|s| s.bid_median_value_ratio).collect();
        assert_eq!(ratios.len(), 3);
        assert!(ratios.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(run.accepted[0].lot.name, "Black Lotus");

        assert_eq!(run.summary.evaluated, 5);
        assert_eq!(run.summary.accepted(), 3);
        assert_eq!(run.summary.yes, 2);
        assert_eq!(run.summary.maybe, 1);
        assert_eq!(run.summary.rejected_total(), 1);
        assert_eq!(run.summary.unresolvable_total(), 1);
    }
}
