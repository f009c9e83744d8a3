//! Phase poller: repeatedly snapshot remote state until a condition
//! holds, the game settles, or a deadline passes.

use crate::error::EngineError;
use arena_ledger::{AuctionSnapshot, PokerSnapshot, RpsSnapshot};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cooperative cancellation handle threaded through every wait.
///
/// Cancelling resolves pending poll and backoff sleeps with
/// [`EngineError::Cancelled`]; an in-flight remote call is allowed to
/// finish first.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(watch::channel(false).0),
        }
    }

    /// Request cancellation; wakes every pending wait
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Polling cadence and bound for one wait
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    /// Fixed interval between snapshot fetches
    pub interval: Duration,
    /// Maximum total wait before `OPPONENT_TIMEOUT`
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Snapshot types that expose the terminal settlement flag
pub trait SettledView {
    fn is_settled(&self) -> bool;
}

impl SettledView for RpsSnapshot {
    fn is_settled(&self) -> bool {
        self.settled
    }
}

impl SettledView for PokerSnapshot {
    fn is_settled(&self) -> bool {
        self.settled
    }
}

impl SettledView for AuctionSnapshot {
    fn is_settled(&self) -> bool {
        self.settled
    }
}

/// How a wait ended
#[derive(Debug)]
pub enum WaitOutcome<S> {
    /// The caller's predicate held
    Satisfied(S),
    /// The game settled; takes priority over any predicate
    Settled(S),
}

impl<S> WaitOutcome<S> {
    /// The final snapshot, however the wait ended
    pub fn snapshot(&self) -> &S {
        match self {
            WaitOutcome::Satisfied(s) | WaitOutcome::Settled(s) => s,
        }
    }
}

/// Poll `fetch` on a fixed interval until `pred` holds or the game
/// settles, whichever comes first. Settlement is checked before the
/// predicate on every tick. `on_tick` is for progress reporting only
/// and must not mutate commitment state.
pub async fn wait_until<S, Fetch, FetchFut, Pred, Tick>(
    cfg: &PollConfig,
    cancel: &CancelToken,
    waiting_for: &'static str,
    mut fetch: Fetch,
    pred: Pred,
    mut on_tick: Tick,
) -> Result<WaitOutcome<S>, EngineError>
where
    S: SettledView,
    Fetch: FnMut() -> FetchFut,
    FetchFut: Future<Output = Result<S, EngineError>>,
    Pred: Fn(&S) -> bool,
    Tick: FnMut(&S),
{
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    let started = Instant::now();
    loop {
        let snapshot = fetch().await?;

        // Settlement always wins, even when the predicate is about
        // something else entirely.
        if snapshot.is_settled() {
            return Ok(WaitOutcome::Settled(snapshot));
        }
        if pred(&snapshot) {
            return Ok(WaitOutcome::Satisfied(snapshot));
        }
        on_tick(&snapshot);

        let waited = started.elapsed();
        if waited >= cfg.max_wait {
            return Err(EngineError::OpponentTimeout { waiting_for, waited });
        }

        tokio::select! {
            _ = tokio::time::sleep(cfg.interval) => {}
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Snap {
        phase: u32,
        settled: bool,
    }

    impl SettledView for Snap {
        fn is_settled(&self) -> bool {
            self.settled
        }
    }

    fn short() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_wait: Duration::from_millis(50),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_satisfied() {
        let ticks = Arc::new(AtomicU32::new(0));
        let fetches = ticks.clone();
        let outcome = wait_until(
            &short(),
            &CancelToken::new(),
            "phase change",
            move || {
                let n = fetches.fetch_add(1, Ordering::SeqCst);
                async move {
                    Ok(Snap {
                        phase: n,
                        settled: false,
                    })
                }
            },
            |s: &Snap| s.phase >= 3,
            |_| {},
        )
        .await
        .unwrap();

        match outcome {
            WaitOutcome::Satisfied(s) => assert_eq!(s.phase, 3),
            other => panic!("expected Satisfied, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_short_circuits_predicate() {
        // The predicate is watching for a phase change that never comes;
        // the very next snapshot is settled instead.
        let outcome = wait_until(
            &short(),
            &CancelToken::new(),
            "phase change",
            || async {
                Ok(Snap {
                    phase: 0,
                    settled: true,
                })
            },
            |s: &Snap| s.phase >= 5,
            |_| {},
        )
        .await
        .unwrap();

        assert!(matches!(outcome, WaitOutcome::Settled(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_converges() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let err = wait_until(
            &short(),
            &CancelToken::new(),
            "opponent commit",
            || async {
                Ok(Snap {
                    phase: 0,
                    settled: false,
                })
            },
            |_| false,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "OPPONENT_TIMEOUT");
        // Progress was reported at most once per tick while waiting
        let n = ticks.load(Ordering::SeqCst);
        assert!(n >= 2, "expected multiple ticks, got {n}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_wait() {
        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(12)).await;
            canceller.cancel();
        });

        let cfg = PollConfig {
            interval: Duration::from_millis(5),
            max_wait: Duration::from_secs(60),
        };
        let err = wait_until(
            &cfg,
            &cancel,
            "anything",
            || async {
                Ok(Snap {
                    phase: 0,
                    settled: false,
                })
            },
            |_| false,
            |_| {},
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "CANCELLED");
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let err = wait_until(
            &short(),
            &CancelToken::new(),
            "anything",
            || async { Err::<Snap, _>(EngineError::NotParticipant(9)) },
            |_| false,
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::NotParticipant(9)));
    }
}
