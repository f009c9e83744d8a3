//! JSON-RPC client for a remote arena ledger node.
//!
//! This is the production implementation of `LedgerClient`. It never
//! retries by itself; transient/authoritative classification happens here
//! and the engine's call executor decides what to do with it.

use crate::crypto::{Commitment, Salt};
use crate::error::{classify_transport, LedgerError};
use crate::types::{
    AuctionSnapshot, BetMove, Move, PokerRoundView, PokerSnapshot, RpsRoundView, RpsSnapshot,
};
use crate::{Address, LedgerClient};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// RPC client for an arena ledger node
pub struct RpcLedger {
    client: Client,
    rpc_url: String,
    address: Address,
}

impl RpcLedger {
    /// Create a new RPC client submitting as `address`
    pub fn new(rpc_url: impl Into<String>, address: Address) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
            address,
        }
    }

    /// Make a JSON-RPC call
    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        debug!(method, "ledger rpc request");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(&e.to_string()))?;

        if response.status().as_u16() == 429 {
            return Err(LedgerError::RateLimited("HTTP 429".to_string()));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| classify_transport(&e.to_string()))?;

        if let Some(error) = result.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            // A JSON-RPC error object is the ledger speaking, not the
            // network, unless it is explicitly a throttling message.
            let lower = msg.to_ascii_lowercase();
            if lower.contains("rate limit") || lower.contains("too many requests") {
                return Err(LedgerError::RateLimited(msg.to_string()));
            }
            return Err(LedgerError::Rejected(msg.to_string()));
        }

        result
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::BadResponse("no result in response".to_string()))
    }

    async fn read<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value).map_err(|e| LedgerError::BadResponse(e.to_string()))
    }

    async fn submit(&self, method: &str, params: Value) -> Result<(), LedgerError> {
        self.call(method, params).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn self_address(&self) -> Address {
        self.address
    }

    async fn rps_state(&self, game_id: u64) -> Result<RpsSnapshot, LedgerError> {
        self.read("arena_rpsState", json!({ "game_id": game_id }))
            .await
    }

    async fn rps_round(&self, game_id: u64, round: u32) -> Result<RpsRoundView, LedgerError> {
        self.read(
            "arena_rpsRound",
            json!({ "game_id": game_id, "round": round }),
        )
        .await
    }

    async fn rps_commit(&self, game_id: u64, commitment: Commitment) -> Result<(), LedgerError> {
        self.submit(
            "arena_rpsCommit",
            json!({
                "game_id": game_id,
                "from": self.address,
                "commitment": hex::encode(commitment.as_bytes()),
            }),
        )
        .await
    }

    async fn rps_reveal(&self, game_id: u64, mv: Move, salt: Salt) -> Result<(), LedgerError> {
        self.submit(
            "arena_rpsReveal",
            json!({
                "game_id": game_id,
                "from": self.address,
                "move": mv.to_byte(),
                "salt": hex::encode(salt.as_bytes()),
            }),
        )
        .await
    }

    async fn poker_state(&self, game_id: u64) -> Result<PokerSnapshot, LedgerError> {
        self.read("arena_pokerState", json!({ "game_id": game_id }))
            .await
    }

    async fn poker_round(&self, game_id: u64, round: u32) -> Result<PokerRoundView, LedgerError> {
        self.read(
            "arena_pokerRound",
            json!({ "game_id": game_id, "round": round }),
        )
        .await
    }

    async fn poker_commit(&self, game_id: u64, commitment: Commitment) -> Result<(), LedgerError> {
        self.submit(
            "arena_pokerCommit",
            json!({
                "game_id": game_id,
                "from": self.address,
                "commitment": hex::encode(commitment.as_bytes()),
            }),
        )
        .await
    }

    async fn poker_bet(&self, game_id: u64, action: BetMove) -> Result<(), LedgerError> {
        self.submit(
            "arena_pokerBet",
            json!({
                "game_id": game_id,
                "from": self.address,
                "action": action,
            }),
        )
        .await
    }

    async fn poker_reveal(&self, game_id: u64, hand: u8, salt: Salt) -> Result<(), LedgerError> {
        self.submit(
            "arena_pokerReveal",
            json!({
                "game_id": game_id,
                "from": self.address,
                "hand": hand,
                "salt": hex::encode(salt.as_bytes()),
            }),
        )
        .await
    }

    async fn auction_state(&self, game_id: u64) -> Result<AuctionSnapshot, LedgerError> {
        self.read("arena_auctionState", json!({ "game_id": game_id }))
            .await
    }

    async fn auction_commit(
        &self,
        game_id: u64,
        commitment: Commitment,
    ) -> Result<(), LedgerError> {
        self.submit(
            "arena_auctionCommit",
            json!({
                "game_id": game_id,
                "from": self.address,
                "commitment": hex::encode(commitment.as_bytes()),
            }),
        )
        .await
    }

    async fn auction_reveal(&self, game_id: u64, bid: u64, salt: Salt) -> Result<(), LedgerError> {
        self.submit(
            "arena_auctionReveal",
            json!({
                "game_id": game_id,
                "from": self.address,
                "bid": bid,
                "salt": hex::encode(salt.as_bytes()),
            }),
        )
        .await
    }
}
