//! Counters over a scoring run.

use crate::scorer::{RejectReason, ScoreOutcome, Unresolvable};
use lotscout_core::Recommendation;
use std::collections::BTreeMap;
use std::fmt;

/// Tally of scoring outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSummary {
    /// Lots scored.
    pub evaluated: usize,
    /// Accepted lots labelled "yes".
    pub yes: usize,
    /// Accepted lots labelled "maybe".
    pub maybe: usize,
    /// Accepted lots labelled "no".
    pub no: usize,
    /// Rejections per reason.
    pub rejected: BTreeMap<RejectReason, usize>,
    /// Lots that could not be valued, per cause.
    pub unresolvable: BTreeMap<Unresolvable, usize>,
}

impl ScoreSummary {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &ScoreOutcome) {
        self.evaluated += 1;
        match outcome {
            ScoreOutcome::Accepted(scored) => match scored.recommendation {
                Recommendation::Yes => self.yes += 1,
                Recommendation::Maybe => self.maybe += 1,
                Recommendation::No => self.no += 1,
            },
            ScoreOutcome::Rejected(reason) => *self.rejected.entry(*reason).or_default() += 1,
            ScoreOutcome::Unresolvable(cause) => *self.unresolvable.entry(*cause).or_default() += 1,
        }
    }

    /// Number of accepted lots.
    pub fn accepted(&self) -> usize {
        self.yes + self.maybe + self.no
    }

    /// Number of rejected lots.
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Number of lots that could not be valued.
    pub fn unresolvable_total(&self) -> usize {
        self.unresolvable.values().sum()
    }
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lots: {} accepted ({} yes, {} maybe, {} no), {} rejected, {} unresolvable",
            self.evaluated,
            self.accepted(),
            self.yes,
            self.maybe,
            self.no,
            self.rejected_total(),
            self.unresolvable_total()
        )
    }
}
