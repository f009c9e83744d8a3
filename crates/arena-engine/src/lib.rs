//! Arena Engine Library
//!
//! Client-side round orchestration for commit-reveal games against an
//! authoritative remote ledger:
//! - Durable commitment store (salt survives crashes between commit and
//!   reveal)
//! - Resilient retry executor and bounded phase poller
//! - One orchestrator per game kind (RPS, budgeted poker, sealed-bid
//!   auction)
//! - Progress and terminal reporting

pub mod engine;
pub mod error;
pub mod games;
pub mod poll;
pub mod report;
pub mod retry;
pub mod store;

pub use engine::{
    AuctionResult, Engine, EngineConfig, MatchOutcome, PokerFinal, PokerOutcome,
    PokerRoundSummary, RpsFinal, RpsOutcome, RpsRoundSummary,
};
pub use error::EngineError;
pub use games::{parse_move, BettingPolicy, PolicyAction, RoundOutcome};
pub use poll::{CancelToken, PollConfig};
pub use report::{LogReporter, ProgressEvent, RecordingReporter, Reporter, TerminalReport};
pub use retry::RetryPolicy;
pub use store::{
    CommitmentKey, CommitmentRecord, CommitmentStore, CommittedValue, FileCommitmentStore,
    MemoryCommitmentStore, StoreError,
};
