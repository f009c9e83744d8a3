//! Ledger client trait definition.

use crate::crypto::{Commitment, Salt};
use crate::error::LedgerError;
use crate::types::{
    AuctionSnapshot, BetMove, Move, PokerRoundView, PokerSnapshot, RpsRoundView, RpsSnapshot,
};
use crate::Address;
use async_trait::async_trait;

/// Client surface of the authoritative remote ledger.
///
/// Snapshot reads are side-effect-free. Mutating calls resolve only once
/// the ledger has confirmed them; a rejection surfaces as an authoritative
/// `LedgerError`, a network problem as a transient one.
///
/// Implementations:
/// - `MockLedger` for tests and demos
/// - `RpcLedger` against a real ledger node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Address this client signs and submits as
    fn self_address(&self) -> Address;

    // --- Rock-Paper-Scissors ---

    async fn rps_state(&self, game_id: u64) -> Result<RpsSnapshot, LedgerError>;

    /// Revealed moves for one round of an RPS game
    async fn rps_round(&self, game_id: u64, round: u32) -> Result<RpsRoundView, LedgerError>;

    async fn rps_commit(&self, game_id: u64, commitment: Commitment) -> Result<(), LedgerError>;

    async fn rps_reveal(&self, game_id: u64, mv: Move, salt: Salt) -> Result<(), LedgerError>;

    // --- Budgeted poker ---

    async fn poker_state(&self, game_id: u64) -> Result<PokerSnapshot, LedgerError>;

    /// Revealed hand values for one round of a poker game
    async fn poker_round(&self, game_id: u64, round: u32) -> Result<PokerRoundView, LedgerError>;

    async fn poker_commit(&self, game_id: u64, commitment: Commitment) -> Result<(), LedgerError>;

    async fn poker_bet(&self, game_id: u64, action: BetMove) -> Result<(), LedgerError>;

    async fn poker_reveal(&self, game_id: u64, hand: u8, salt: Salt) -> Result<(), LedgerError>;

    // --- Sealed-bid auction ---

    async fn auction_state(&self, game_id: u64) -> Result<AuctionSnapshot, LedgerError>;

    async fn auction_commit(&self, game_id: u64, commitment: Commitment)
        -> Result<(), LedgerError>;

    async fn auction_reveal(&self, game_id: u64, bid: u64, salt: Salt) -> Result<(), LedgerError>;
}
