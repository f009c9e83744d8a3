//! Arena Ledger Library
//!
//! Collaborator surface for the commit-reveal round engine:
//! - Commitment crypto (Salt, Commitment)
//! - Domain types and ledger-state snapshots
//! - `LedgerClient` trait, `MockLedger`, and `RpcLedger`

pub mod client;
pub mod crypto;
pub mod error;
pub mod mock;
pub mod rpc;
pub mod types;

pub use client::LedgerClient;
pub use crypto::{Commitment, Salt};
pub use error::LedgerError;
pub use mock::MockLedger;
pub use rpc::RpcLedger;
pub use types::{
    Address, AuctionPhase, AuctionSnapshot, BetMove, GameKind, Move, PokerPhase, PokerRoundView,
    PokerSnapshot, RpsPhase, RpsRoundView, RpsSnapshot,
};
