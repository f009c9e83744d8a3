//! Sealed-bid auction orchestrator. Single round: commit the bid, wait
//! for the reveal phase, reveal, wait for settlement.

use super::Engine;
use crate::error::EngineError;
use crate::games::validate_bid;
use crate::poll::{wait_until, WaitOutcome};
use crate::report::{ProgressEvent, Reporter};
use crate::retry::with_retry;
use crate::store::{CommitmentStore, CommittedValue};
use arena_ledger::{
    Address, AuctionPhase, AuctionSnapshot, Commitment, GameKind, LedgerClient,
};
use serde::Serialize;

/// Settled auction, from this participant's side
#[derive(Clone, Copy, Debug, Serialize)]
pub struct AuctionResult {
    pub my_bid: Option<u64>,
    pub winner: Option<Address>,
    pub winning_bid: Option<u64>,
    pub won: bool,
}

impl AuctionResult {
    fn from_snapshot(snap: &AuctionSnapshot, seat: usize, me: &Address) -> Self {
        Self {
            my_bid: snap.bids[seat],
            winner: snap.winner,
            winning_bid: snap.winning_bid,
            won: snap.winner.as_ref() == Some(me),
        }
    }
}

impl<L, S, R> Engine<L, S, R>
where
    L: LedgerClient,
    S: CommitmentStore,
    R: Reporter,
{
    /// Run the auction to settlement with the given sealed bid.
    pub async fn play_auction(&self, game_id: u64, bid: u64) -> Result<AuctionResult, EngineError> {
        let result = self.auction_inner(game_id, bid).await;
        self.finish(GameKind::Auction, game_id, result, |r| match r.winner {
            Some(_) if r.won => format!(
                "auction settled: won at {}",
                r.winning_bid.unwrap_or_default()
            ),
            Some(winner) => format!(
                "auction settled: lost to {} at {}",
                winner.short(),
                r.winning_bid.unwrap_or_default()
            ),
            None => "auction settled with no winner".to_string(),
        })
    }

    async fn auction_inner(&self, game_id: u64, bid: u64) -> Result<AuctionResult, EngineError> {
        validate_bid(bid)?;
        let me = self.ledger.self_address();
        let snap = self.auction_snapshot(game_id).await?;
        let seat = snap
            .seat_of(&me)
            .ok_or(EngineError::NotParticipant(game_id))?;
        if snap.settled {
            return Ok(AuctionResult::from_snapshot(&snap, seat, &me));
        }
        // Single round per auction; round 0 in the store key.
        let key = self.commitment_key(GameKind::Auction, game_id, 0);

        if snap.phase == AuctionPhase::Commit && !snap.committed[seat] {
            let record = self.load_or_create_record(&key, CommittedValue::Bid(bid))?;
            let commitment = Commitment::new(&record.value.to_bytes(), &record.salt);
            with_retry(&self.config.retry, &self.cancel, "auction commit", || {
                self.ledger.auction_commit(game_id, commitment)
            })
            .await?;
            self.reporter.progress(&ProgressEvent::Committed {
                kind: GameKind::Auction,
                game_id,
                round: 0,
            });
        }

        let outcome = wait_until(
            &self.config.poll,
            &self.cancel,
            "opponent commit",
            || self.auction_snapshot(game_id),
            |s: &AuctionSnapshot| s.phase != AuctionPhase::Commit,
            |_| {
                self.reporter
                    .progress(&ProgressEvent::WaitingForOpponentCommit {
                        kind: GameKind::Auction,
                        game_id,
                        round: 0,
                    })
            },
        )
        .await?;
        let snap = match outcome {
            WaitOutcome::Settled(s) => return Ok(AuctionResult::from_snapshot(&s, seat, &me)),
            WaitOutcome::Satisfied(s) => s,
        };

        if !snap.revealed[seat] {
            let record = self.store.load(&key)?.ok_or(EngineError::SaltLost(key))?;
            let CommittedValue::Bid(b) = record.value else {
                return Err(EngineError::SaltLost(key));
            };
            with_retry(&self.config.retry, &self.cancel, "auction reveal", || {
                self.ledger.auction_reveal(game_id, b, record.salt.clone())
            })
            .await?;
            self.store.delete(&key)?;
            self.reporter.progress(&ProgressEvent::Revealed {
                kind: GameKind::Auction,
                game_id,
                round: 0,
            });
        }

        let outcome = wait_until(
            &self.config.poll,
            &self.cancel,
            "settlement",
            || self.auction_snapshot(game_id),
            |s: &AuctionSnapshot| s.settled,
            |_| {
                self.reporter
                    .progress(&ProgressEvent::WaitingForSettlement {
                        kind: GameKind::Auction,
                        game_id,
                    })
            },
        )
        .await?;
        let snap = match outcome {
            WaitOutcome::Settled(s) | WaitOutcome::Satisfied(s) => s,
        };
        Ok(AuctionResult::from_snapshot(&snap, seat, &me))
    }

    pub(crate) async fn auction_snapshot(
        &self,
        game_id: u64,
    ) -> Result<AuctionSnapshot, EngineError> {
        with_retry(&self.config.retry, &self.cancel, "auction state", || {
            self.ledger.auction_state(game_id)
        })
        .await
    }
}
