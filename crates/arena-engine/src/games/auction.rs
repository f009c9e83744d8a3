//! Local validation for the sealed-bid auction.

use crate::error::EngineError;

/// A bid must be positive; zero is the ledger's "no bid" sentinel.
pub fn validate_bid(bid: u64) -> Result<(), EngineError> {
    if bid == 0 {
        Err(EngineError::InvalidBid(bid))
    } else {
        Ok(())
    }
}
