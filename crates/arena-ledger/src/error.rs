//! Ledger error types and transient-vs-authoritative classification.

use thiserror::Error;

/// Errors from ledger operations.
///
/// Transport-class failures are safe to retry; authoritative rejections
/// are definitive and retrying them cannot succeed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rejected by ledger: {0}")]
    Rejected(String),

    #[error("game not found: {0}")]
    GameNotFound(u64),

    #[error("not a participant of game {0}")]
    NotParticipant(u64),

    #[error("malformed ledger response: {0}")]
    BadResponse(String),
}

impl LedgerError {
    /// Whether this failure may resolve on retry.
    ///
    /// Transport conditions (connection resets, timeouts, rate limiting)
    /// are transient; everything else is an authoritative answer from the
    /// ledger and must propagate immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::Transport(_) | LedgerError::RateLimited(_) | LedgerError::Timeout(_)
        )
    }
}

/// Classify a raw transport-layer message into a `LedgerError`.
///
/// Used by the RPC client, which only sees error strings from the HTTP
/// stack and the JSON-RPC error object.
pub fn classify_transport(message: &str) -> LedgerError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429")
    {
        LedgerError::RateLimited(message.to_string())
    } else if lower.contains("timed out") || lower.contains("timeout") {
        LedgerError::Timeout(message.to_string())
    } else {
        LedgerError::Transport(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Transport("connection reset".into()).is_transient());
        assert!(LedgerError::RateLimited("429".into()).is_transient());
        assert!(LedgerError::Timeout("deadline".into()).is_transient());

        assert!(!LedgerError::Rejected("bad commitment".into()).is_transient());
        assert!(!LedgerError::GameNotFound(7).is_transient());
        assert!(!LedgerError::NotParticipant(7).is_transient());
        assert!(!LedgerError::BadResponse("no result".into()).is_transient());
    }

    #[test]
    fn test_classify_transport_vocabulary() {
        assert!(matches!(
            classify_transport("429 Too Many Requests"),
            LedgerError::RateLimited(_)
        ));
        assert!(matches!(
            classify_transport("operation timed out"),
            LedgerError::Timeout(_)
        ));
        assert!(matches!(
            classify_transport("connection reset by peer"),
            LedgerError::Transport(_)
        ));
    }
}
