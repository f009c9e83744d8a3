//! Engine error type with stable machine-readable codes.

use crate::store::{CommitmentKey, StoreError};
use arena_ledger::LedgerError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a round orchestration.
///
/// Every variant maps to a stable code via [`EngineError::code`]; the
/// terminal report carries the code separately from the human message.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid move: {0:?}")]
    InvalidMove(String),

    #[error("invalid hand value {0}: must be between 1 and 100")]
    InvalidHand(u8),

    #[error("invalid betting action: {0}")]
    InvalidAction(String),

    #[error("invalid bid: {0}")]
    InvalidBid(u64),

    #[error("hand {hand} exceeds budget: at most {max_allowed} may be spent this round")]
    ExceedsBudget { hand: u8, max_allowed: u64 },

    #[error("{action} requires an explicit amount")]
    MissingAmount { action: &'static str },

    #[error("commitment record missing for {0}; cannot reveal")]
    SaltLost(CommitmentKey),

    #[error("timed out after {waited:?} waiting for {waiting_for}")]
    OpponentTimeout {
        waiting_for: &'static str,
        waited: Duration,
    },

    #[error("reveal failed after {attempts} attempts and the round did not resolve")]
    RevealFailed { attempts: u32 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("not a participant of game {0}")]
    NotParticipant(u64),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Stable machine-readable code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidMove(_) => "INVALID_MOVE",
            EngineError::InvalidHand(_) => "INVALID_HAND",
            EngineError::InvalidAction(_) => "INVALID_ACTION",
            EngineError::InvalidBid(_) => "INVALID_BID",
            EngineError::ExceedsBudget { .. } => "EXCEEDS_BUDGET",
            EngineError::MissingAmount { .. } => "MISSING_AMOUNT",
            EngineError::SaltLost(_) => "SALT_LOST",
            EngineError::OpponentTimeout { .. } => "OPPONENT_TIMEOUT",
            EngineError::RevealFailed { .. } => "REVEAL_FAILED",
            EngineError::Cancelled => "CANCELLED",
            EngineError::NotParticipant(_) => "NOT_PARTICIPANT",
            EngineError::Ledger(_) => "LEDGER",
            EngineError::Store(_) => "STORE",
        }
    }
}
