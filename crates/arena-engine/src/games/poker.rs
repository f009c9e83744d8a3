//! Local rules for the budgeted betting game: hand validation, the
//! budget pre-flight, and the caller-supplied betting policy.

use crate::error::EngineError;
use arena_ledger::BetMove;

/// Validate a hand value is in the playable domain (1–100)
pub fn validate_hand(hand: u8) -> Result<(), EngineError> {
    if (1..=100).contains(&hand) {
        Ok(())
    } else {
        Err(EngineError::InvalidHand(hand))
    }
}

/// Budget pre-flight for a commit: the hand may spend at most the
/// remaining budget minus one unit reserved for every round still to be
/// played after this one. Checked locally before any transaction is
/// spent; the ledger remains the final arbiter.
pub fn check_budget(
    hand: u8,
    budget: u64,
    current_round: u32,
    total_rounds: u32,
) -> Result<(), EngineError> {
    let rounds_after = u64::from(total_rounds.saturating_sub(current_round + 1));
    let max_allowed = budget.saturating_sub(rounds_after);
    if u64::from(hand) > max_allowed {
        Err(EngineError::ExceedsBudget { hand, max_allowed })
    } else {
        Ok(())
    }
}

/// One configured response in a betting policy. Amounts are optional at
/// configuration time; resolving a `Bet`/`Raise` without one fails with
/// `MISSING_AMOUNT` before anything is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyAction {
    Check,
    Bet { amount: Option<u64> },
    Call,
    Raise { amount: Option<u64> },
    Fold,
}

impl PolicyAction {
    fn resolve(&self) -> Result<BetMove, EngineError> {
        match self {
            PolicyAction::Check => Ok(BetMove::Check),
            PolicyAction::Bet { amount: Some(n) } => Ok(BetMove::Bet(*n)),
            PolicyAction::Bet { amount: None } => {
                Err(EngineError::MissingAmount { action: "bet" })
            }
            PolicyAction::Call => Ok(BetMove::Call),
            PolicyAction::Raise { amount: Some(n) } => Ok(BetMove::Raise(*n)),
            PolicyAction::Raise { amount: None } => {
                Err(EngineError::MissingAmount { action: "raise" })
            }
            PolicyAction::Fold => Ok(BetMove::Fold),
        }
    }
}

/// Caller-supplied betting behaviour, keyed on whether an opposing bet
/// is pending when it is our turn.
#[derive(Clone, Copy, Debug)]
pub struct BettingPolicy {
    /// Action when no bet is pending
    pub when_unopposed: PolicyAction,
    /// Action when facing an active bet
    pub when_facing_bet: PolicyAction,
}

impl BettingPolicy {
    /// Passive default: check when unopposed, call when facing a bet
    pub fn passive() -> Self {
        Self {
            when_unopposed: PolicyAction::Check,
            when_facing_bet: PolicyAction::Call,
        }
    }

    /// Pick and resolve the action for the current snapshot state. The
    /// caller never tracks the pending amount; `call` matches whatever
    /// the snapshot reports.
    pub fn action_for(&self, pending_bet: u64) -> Result<BetMove, EngineError> {
        let chosen = if pending_bet > 0 {
            &self.when_facing_bet
        } else {
            &self.when_unopposed
        };
        let resolved = chosen.resolve()?;

        // A response that only makes sense against a pending bet (or
        // without one) is a configuration error; reject it locally.
        match (resolved, pending_bet) {
            (BetMove::Check, p) if p > 0 => Err(EngineError::InvalidAction(
                "cannot check against a pending bet".into(),
            )),
            (BetMove::Call, 0) | (BetMove::Raise(_), 0) => Err(EngineError::InvalidAction(
                "nothing to call or raise".into(),
            )),
            _ => Ok(resolved),
        }
    }
}
