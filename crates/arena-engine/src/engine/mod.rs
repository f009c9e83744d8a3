//! Round orchestrators: drive a single decision through the full
//! commit → wait → reveal → wait → result sequence against the ledger.
//!
//! One orchestrator per game kind, all sharing the same discipline:
//! state is derived from fresh snapshots (never cached across ticks,
//! the commitment store excepted), every mutating call goes through the
//! retry executor, and every wait is bounded by the phase poller.

mod auction;
mod poker;
mod rps;

pub use auction::AuctionResult;
pub use poker::{PokerFinal, PokerOutcome, PokerRoundSummary};
pub use rps::{RpsFinal, RpsOutcome, RpsRoundSummary};

use crate::error::EngineError;
use crate::poll::{CancelToken, PollConfig};
use crate::report::{Reporter, TerminalReport};
use crate::retry::RetryPolicy;
use crate::store::{CommitmentKey, CommitmentRecord, CommitmentStore, CommittedValue};
use arena_ledger::{GameKind, LedgerClient};
use serde::Serialize;
use std::sync::Arc;

/// Tunables for one engine instance
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub poll: PollConfig,
    /// Showdown reveal retries before `REVEAL_FAILED`
    pub reveal_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll: PollConfig::default(),
            reveal_attempts: 3,
        }
    }
}

/// Final standing of a settled match, from this participant's side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MatchOutcome {
    Won,
    Lost,
    Drawn,
}

impl MatchOutcome {
    pub(crate) fn from_scores(mine: u32, theirs: u32) -> Self {
        match mine.cmp(&theirs) {
            std::cmp::Ordering::Greater => MatchOutcome::Won,
            std::cmp::Ordering::Less => MatchOutcome::Lost,
            std::cmp::Ordering::Equal => MatchOutcome::Drawn,
        }
    }
}

/// The round-orchestration engine.
///
/// All state is constructor-injected; nothing ambient is shared between
/// engine instances, so several may run in one process against the same
/// ledger.
pub struct Engine<L, S, R> {
    pub(crate) ledger: Arc<L>,
    pub(crate) store: S,
    pub(crate) reporter: R,
    pub(crate) config: EngineConfig,
    pub(crate) cancel: CancelToken,
}

impl<L, S, R> Engine<L, S, R>
where
    L: LedgerClient,
    S: CommitmentStore,
    R: Reporter,
{
    pub fn new(ledger: Arc<L>, store: S, reporter: R) -> Self {
        Self {
            ledger,
            store,
            reporter,
            config: EngineConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle for aborting in-flight waits from another task
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(crate) fn commitment_key(&self, kind: GameKind, game_id: u64, round: u32) -> CommitmentKey {
        CommitmentKey {
            kind,
            game_id,
            round,
            participant: self.ledger.self_address(),
        }
    }

    /// Fetch or create the commitment record for this key.
    ///
    /// The record is persisted before the commit call is submitted, so a
    /// crash between persist and submit recovers the same salt, and a
    /// second invocation for the same round reuses the existing record
    /// instead of re-committing to a different one.
    pub(crate) fn load_or_create_record(
        &self,
        key: &CommitmentKey,
        value: CommittedValue,
    ) -> Result<CommitmentRecord, EngineError> {
        if let Some(existing) = self.store.load(key)? {
            if existing.value != value {
                tracing::warn!(
                    key = %key,
                    "recovered commitment record differs from requested value; the record wins"
                );
            }
            return Ok(existing);
        }
        let record = CommitmentRecord::new(value);
        self.store.save(key, &record)?;
        Ok(record)
    }

    /// Emit the single terminal report for this invocation and pass the
    /// result through.
    pub(crate) fn finish<T>(
        &self,
        kind: GameKind,
        game_id: u64,
        result: Result<T, EngineError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, EngineError> {
        let report = match &result {
            Ok(value) => TerminalReport {
                kind,
                game_id,
                success: true,
                code: None,
                message: describe(value),
            },
            Err(e) => TerminalReport {
                kind,
                game_id,
                success: false,
                code: Some(e.code()),
                message: e.to_string(),
            },
        };
        self.reporter.terminal(&report);
        result
    }
}
