//! Resilient call executor: one shared retry/backoff discipline for
//! every remote call, with transient-vs-authoritative classification
//! centralized in `LedgerError::is_transient`.

use crate::error::EngineError;
use crate::poll::CancelToken;
use arena_ledger::LedgerError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with exponential backoff and jitter
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` (0-based): exponential
    /// in the attempt index, capped, plus random jitter so concurrent
    /// clients do not retry in lockstep.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=self.base_delay.as_millis() as u64 / 2);
        exp + Duration::from_millis(jitter_ms)
    }
}

/// Run `op` until it succeeds, fails authoritatively, or the attempt
/// budget is exhausted. Only transient transport failures are retried;
/// an authoritative rejection propagates immediately since retrying a
/// logically-rejected call cannot succeed.
pub async fn with_retry<T, Op, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    label: &'static str,
    mut op: Op,
) -> Result<T, EngineError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(label, attempt, error = %e, ?delay, "transient ledger failure, backing off");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                }
                attempt += 1;
            }
            // Authoritative, or out of attempts: surface the underlying error
            Err(e) => return Err(e.into()),
        }
    }
}
