//! Auction lot scoring for the lotscout system.
//!
//! This crate handles:
//! - Eligibility checks (language, buyout, grade, set)
//! - Value band and bid-ratio filtering
//! - Recommendation labels
//! - Result table output

pub mod recommend;
pub mod scorer;
pub mod summary;
pub mod report;

pub use recommend::RecommendationPolicy;
pub use scorer::{sort_by_bid_ratio, LotScorer, RejectReason, ScoreOutcome, ScoreRun, Unresolvable};
pub use summary::ScoreSummary;
pub use report::{results_file_name, write_results, write_results_file, ResultRecord};
