//! Progress and terminal reporting.
//!
//! Orchestrations are long-running; progress events give a caller
//! liveness without polling the ledger itself. Exactly one terminal
//! report is emitted per invocation, carrying a machine-readable code
//! separate from the human message.

use arena_ledger::{BetMove, GameKind};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{error, info};

/// Non-fatal progress, emitted at most once per poll tick
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ProgressEvent {
    Committed { kind: GameKind, game_id: u64, round: u32 },
    WaitingForOpponentCommit { kind: GameKind, game_id: u64, round: u32 },
    Revealed { kind: GameKind, game_id: u64, round: u32 },
    WaitingForOpponentReveal { kind: GameKind, game_id: u64, round: u32 },
    WaitingForRoundEnd { kind: GameKind, game_id: u64, round: u32 },
    ActionSubmitted { game_id: u64, round: u32, action: BetMove },
    WaitingForTurn { game_id: u64, round: u32 },
    WaitingForSettlement { kind: GameKind, game_id: u64 },
}

/// The single end-of-invocation record
#[derive(Clone, Debug, Serialize)]
pub struct TerminalReport {
    pub kind: GameKind,
    pub game_id: u64,
    pub success: bool,
    /// Stable failure code; `None` on success
    pub code: Option<&'static str>,
    pub message: String,
}

/// Sink for progress and terminal reports.
///
/// `progress` is fire-and-forget: it must not block, retry, or touch
/// commitment state.
pub trait Reporter: Send + Sync {
    fn progress(&self, event: &ProgressEvent);

    fn terminal(&self, report: &TerminalReport);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn progress(&self, event: &ProgressEvent) {
        (**self).progress(event)
    }

    fn terminal(&self, report: &TerminalReport) {
        (**self).terminal(report)
    }
}

/// Reporter backed by `tracing`
#[derive(Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn progress(&self, event: &ProgressEvent) {
        info!(?event, "progress");
    }

    fn terminal(&self, report: &TerminalReport) {
        if report.success {
            info!(
                kind = %report.kind,
                game_id = report.game_id,
                message = %report.message,
                "round complete"
            );
        } else {
            error!(
                kind = %report.kind,
                game_id = report.game_id,
                code = report.code.unwrap_or("UNKNOWN"),
                message = %report.message,
                "round failed"
            );
        }
    }
}

/// Reporter that records everything for test inspection
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<ProgressEvent>>,
    pub terminals: Mutex<Vec<TerminalReport>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress_events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn terminal_reports(&self) -> Vec<TerminalReport> {
        self.terminals.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn terminal(&self, report: &TerminalReport) {
        self.terminals.lock().unwrap().push(report.clone());
    }
}
