//! Bid recommendation labels.

use lotscout_core::config::{ScoringPolicy, NO_AT_OR_ABOVE_RATIO, YES_BELOW_RATIO};
use lotscout_core::Recommendation;

/// Maps a bid / median ratio to a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationPolicy {
    /// Ratios below this are "yes".
    pub yes_below: f64,
    /// Ratios at or above this are "no".
    pub no_at_or_above: f64,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            yes_below: YES_BELOW_RATIO,
            no_at_or_above: NO_AT_OR_ABOVE_RATIO,
        }
    }
}

impl From<&ScoringPolicy> for RecommendationPolicy {
    fn from(policy: &ScoringPolicy) -> Self {
        Self {
            yes_below: policy.yes_below,
            no_at_or_above: policy.no_at_or_above,
        }
    }
}

impl RecommendationPolicy {
    /// Label a ratio.
    pub fn label(&self, ratio: f64) -> Recommendation {
        if ratio < self.yes_below {
            Recommendation::Yes
        } else if ratio < self.no_at_or_above {
            Recommendation::Maybe
        } else {
            Recommendation::No
        }
    }
}
