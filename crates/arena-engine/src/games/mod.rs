//! Per-game rules the client enforces locally: winner judging,
//! pre-flight validation, and the betting policy.

mod auction;
mod poker;
mod rps;

pub use auction::validate_bid;
pub use poker::{check_budget, validate_hand, BettingPolicy, PolicyAction};
pub use rps::{judge, judge_by_scores, parse_move, RoundOutcome};
