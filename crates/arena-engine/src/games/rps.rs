//! Round judging for the simultaneous-move game.

use crate::error::EngineError;
use arena_ledger::Move;
use serde::Serialize;
use std::fmt;

/// Parse a move name at the string boundary (CLI, config, wire)
pub fn parse_move(s: &str) -> Result<Move, EngineError> {
    Move::parse(s).ok_or_else(|| EngineError::InvalidMove(s.to_string()))
}

/// Outcome of one round from this participant's perspective
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RoundOutcome {
    Win,
    Loss,
    Draw,
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundOutcome::Win => "win",
            RoundOutcome::Loss => "loss",
            RoundOutcome::Draw => "draw",
        };
        f.write_str(s)
    }
}

/// Decide the round from both revealed moves, using the fixed 3-cycle
/// beats-relation.
pub fn judge(mine: Move, theirs: Move) -> RoundOutcome {
    if mine == theirs {
        RoundOutcome::Draw
    } else if mine.beats(&theirs) {
        RoundOutcome::Win
    } else {
        RoundOutcome::Loss
    }
}

/// Decide a round from score movement alone, against a baseline taken
/// when the round was entered. Used when the ledger resolves a round
/// without both reveals (a fold, or a counterparty timeout claim).
pub fn judge_by_scores(baseline: [u32; 2], current: [u32; 2], seat: usize) -> RoundOutcome {
    let mine = current[seat].saturating_sub(baseline[seat]);
    let theirs = current[1 - seat].saturating_sub(baseline[1 - seat]);
    match mine.cmp(&theirs) {
        std::cmp::Ordering::Greater => RoundOutcome::Win,
        std::cmp::Ordering::Less => RoundOutcome::Loss,
        std::cmp::Ordering::Equal => RoundOutcome::Draw,
    }
}
