//! Budgeted-poker orchestrator: commit a hand value, drive the two
//! betting phases with the caller's policy, then reveal at showdown.

use super::{Engine, MatchOutcome};
use crate::error::EngineError;
use crate::games::{check_budget, judge_by_scores, validate_hand, BettingPolicy, RoundOutcome};
use crate::poll::{wait_until, WaitOutcome};
use crate::report::{ProgressEvent, Reporter};
use crate::retry::with_retry;
use crate::store::{CommitmentKey, CommitmentStore, CommittedValue};
use arena_ledger::{Commitment, GameKind, LedgerClient, PokerPhase, PokerSnapshot};
use serde::Serialize;
use tracing::warn;

/// One resolved round of a game that is still running
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PokerRoundSummary {
    pub round: u32,
    pub your_hand: u8,
    /// Absent when the round ended on a fold, before any reveal
    pub opponent_hand: Option<u8>,
    pub result: RoundOutcome,
    pub my_score: u32,
    pub opponent_score: u32,
    pub my_budget: u64,
    pub opponent_budget: u64,
    pub next_round: u32,
}

/// Standing of a settled match
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PokerFinal {
    pub my_score: u32,
    pub opponent_score: u32,
    pub my_budget: u64,
    pub opponent_budget: u64,
    pub outcome: MatchOutcome,
}

impl PokerFinal {
    fn from_snapshot(snap: &PokerSnapshot, seat: usize) -> Self {
        Self {
            my_score: snap.scores[seat],
            opponent_score: snap.scores[1 - seat],
            my_budget: snap.budgets[seat],
            opponent_budget: snap.budgets[1 - seat],
            outcome: MatchOutcome::from_scores(snap.scores[seat], snap.scores[1 - seat]),
        }
    }
}

/// What one invocation produced
#[derive(Clone, Copy, Debug, Serialize)]
pub enum PokerOutcome {
    Round(PokerRoundSummary),
    Final(PokerFinal),
}

impl<L, S, R> Engine<L, S, R>
where
    L: LedgerClient,
    S: CommitmentStore,
    R: Reporter,
{
    /// Play one round: commit `hand`, bet per `policy`, reveal at
    /// showdown. The budget pre-flight runs before anything is sent.
    pub async fn play_poker_round(
        &self,
        game_id: u64,
        hand: u8,
        policy: &BettingPolicy,
    ) -> Result<PokerOutcome, EngineError> {
        let result = self.poker_round_inner(game_id, hand, policy).await;
        self.finish(GameKind::Poker, game_id, result, |outcome| match outcome {
            PokerOutcome::Round(r) => format!(
                "round {}: {}, score {}-{}, budget {} remaining, next round {}",
                r.round, r.result, r.my_score, r.opponent_score, r.my_budget, r.next_round
            ),
            PokerOutcome::Final(f) => format!(
                "match settled {:?} at {}-{}",
                f.outcome, f.my_score, f.opponent_score
            ),
        })
    }

    async fn poker_round_inner(
        &self,
        game_id: u64,
        hand: u8,
        policy: &BettingPolicy,
    ) -> Result<PokerOutcome, EngineError> {
        validate_hand(hand)?;
        let me = self.ledger.self_address();
        let snap = self.poker_snapshot(game_id).await?;
        let seat = snap
            .seat_of(&me)
            .ok_or(EngineError::NotParticipant(game_id))?;
        if snap.settled {
            return Ok(PokerOutcome::Final(PokerFinal::from_snapshot(&snap, seat)));
        }
        let round = snap.round;
        // Scores only move when a round resolves, so the entry snapshot
        // is a stable baseline for judging this round later.
        let baseline = snap.scores;
        check_budget(hand, snap.budgets[seat], round, snap.total_rounds)?;
        let key = self.commitment_key(GameKind::Poker, game_id, round);

        let mut bound_hand = hand;
        if snap.phase == PokerPhase::Commit && !snap.committed[seat] {
            let record = self.load_or_create_record(&key, CommittedValue::Hand(hand))?;
            if let CommittedValue::Hand(h) = record.value {
                bound_hand = h;
            }
            let commitment = Commitment::new(&record.value.to_bytes(), &record.salt);
            with_retry(&self.config.retry, &self.cancel, "poker commit", || {
                self.ledger.poker_commit(game_id, commitment)
            })
            .await?;
            self.reporter.progress(&ProgressEvent::Committed {
                kind: GameKind::Poker,
                game_id,
                round,
            });
        }

        // Drive the pre-showdown phases. A fold ends the round early, so
        // every arm also watches for the round counter moving on.
        let mut snap = self.poker_snapshot(game_id).await?;
        loop {
            if snap.settled {
                return Ok(PokerOutcome::Final(PokerFinal::from_snapshot(&snap, seat)));
            }
            if snap.round > round {
                return self
                    .poker_summary(game_id, round, seat, baseline, bound_hand, &snap)
                    .await;
            }
            match snap.phase {
                PokerPhase::Commit => {
                    let outcome = wait_until(
                        &self.config.poll,
                        &self.cancel,
                        "opponent commit",
                        || self.poker_snapshot(game_id),
                        |s: &PokerSnapshot| s.phase != PokerPhase::Commit || s.round > round,
                        |_| {
                            self.reporter
                                .progress(&ProgressEvent::WaitingForOpponentCommit {
                                    kind: GameKind::Poker,
                                    game_id,
                                    round,
                                })
                        },
                    )
                    .await?;
                    snap = match outcome {
                        WaitOutcome::Settled(s) => {
                            return Ok(PokerOutcome::Final(PokerFinal::from_snapshot(&s, seat)))
                        }
                        WaitOutcome::Satisfied(s) => s,
                    };
                }
                PokerPhase::FirstBetting | PokerPhase::SecondBetting => {
                    let phase_idx = snap.phase.index();
                    if snap.is_turn_of(&me) {
                        // The pending bet is read from the snapshot, so a
                        // call always matches whatever is actually open.
                        let action = policy.action_for(snap.pending_bet)?;
                        with_retry(&self.config.retry, &self.cancel, "poker bet", || {
                            self.ledger.poker_bet(game_id, action)
                        })
                        .await?;
                        self.reporter.progress(&ProgressEvent::ActionSubmitted {
                            game_id,
                            round,
                            action,
                        });
                    }
                    let outcome = wait_until(
                        &self.config.poll,
                        &self.cancel,
                        "betting turn",
                        || self.poker_snapshot(game_id),
                        |s: &PokerSnapshot| {
                            s.phase.index() > phase_idx || s.round > round || s.is_turn_of(&me)
                        },
                        |_| {
                            self.reporter
                                .progress(&ProgressEvent::WaitingForTurn { game_id, round })
                        },
                    )
                    .await?;
                    snap = match outcome {
                        WaitOutcome::Settled(s) => {
                            return Ok(PokerOutcome::Final(PokerFinal::from_snapshot(&s, seat)))
                        }
                        WaitOutcome::Satisfied(s) => s,
                    };
                }
                PokerPhase::Showdown => break,
                PokerPhase::Complete => {
                    let outcome = wait_until(
                        &self.config.poll,
                        &self.cancel,
                        "round end",
                        || self.poker_snapshot(game_id),
                        |s: &PokerSnapshot| s.round > round,
                        |_| {
                            self.reporter.progress(&ProgressEvent::WaitingForRoundEnd {
                                kind: GameKind::Poker,
                                game_id,
                                round,
                            })
                        },
                    )
                    .await?;
                    snap = match outcome {
                        WaitOutcome::Settled(s) => {
                            return Ok(PokerOutcome::Final(PokerFinal::from_snapshot(&s, seat)))
                        }
                        WaitOutcome::Satisfied(s) => s,
                    };
                }
            }
        }

        // Showdown.
        if !snap.revealed[seat] {
            self.poker_reveal_step(game_id, round, key).await?;
        }

        let outcome = wait_until(
            &self.config.poll,
            &self.cancel,
            "opponent reveal",
            || self.poker_snapshot(game_id),
            |s: &PokerSnapshot| s.round > round,
            |s| {
                let event = if s.revealed[1 - seat] {
                    ProgressEvent::WaitingForRoundEnd {
                        kind: GameKind::Poker,
                        game_id,
                        round,
                    }
                } else {
                    ProgressEvent::WaitingForOpponentReveal {
                        kind: GameKind::Poker,
                        game_id,
                        round,
                    }
                };
                self.reporter.progress(&event);
            },
        )
        .await?;
        match outcome {
            WaitOutcome::Settled(s) => Ok(PokerOutcome::Final(PokerFinal::from_snapshot(&s, seat))),
            WaitOutcome::Satisfied(s) => {
                self.poker_summary(game_id, round, seat, baseline, bound_hand, &s)
                    .await
            }
        }
    }

    /// Reveal with bounded recovery: a failure is retried, but first the
    /// state is re-checked, since the ledger may have resolved the round
    /// without our reveal (opponent fold, timeout claim, settlement), in
    /// which case the failure is moot.
    async fn poker_reveal_step(
        &self,
        game_id: u64,
        round: u32,
        key: CommitmentKey,
    ) -> Result<(), EngineError> {
        let record = self.store.load(&key)?.ok_or(EngineError::SaltLost(key))?;
        let CommittedValue::Hand(hand) = record.value else {
            return Err(EngineError::SaltLost(key));
        };
        let mut attempts = 0u32;
        loop {
            let result = with_retry(&self.config.retry, &self.cancel, "poker reveal", || {
                self.ledger.poker_reveal(game_id, hand, record.salt.clone())
            })
            .await;
            match result {
                Ok(()) => {
                    self.store.delete(&key)?;
                    self.reporter.progress(&ProgressEvent::Revealed {
                        kind: GameKind::Poker,
                        game_id,
                        round,
                    });
                    return Ok(());
                }
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(err) => {
                    attempts += 1;
                    let snap = self.poker_snapshot(game_id).await?;
                    if snap.settled || snap.round > round {
                        warn!(game_id, round, error = %err, "reveal failed but the round resolved anyway");
                        return Ok(());
                    }
                    if attempts >= self.config.reveal_attempts {
                        return Err(EngineError::RevealFailed { attempts });
                    }
                    warn!(game_id, round, attempt = attempts, error = %err, "reveal failed, retrying");
                }
            }
        }
    }

    async fn poker_summary(
        &self,
        game_id: u64,
        round: u32,
        seat: usize,
        baseline: [u32; 2],
        bound_hand: u8,
        snap: &PokerSnapshot,
    ) -> Result<PokerOutcome, EngineError> {
        let other = 1 - seat;
        let view = with_retry(
            &self.config.retry,
            &self.cancel,
            "poker round view",
            || self.ledger.poker_round(game_id, round),
        )
        .await?;

        // Judge by score movement rather than hand comparison: a fold
        // ends the round with no reveals at all.
        let result = judge_by_scores(baseline, snap.scores, seat);

        Ok(PokerOutcome::Round(PokerRoundSummary {
            round,
            your_hand: view.hands[seat].unwrap_or(bound_hand),
            opponent_hand: view.hands[other],
            result,
            my_score: snap.scores[seat],
            opponent_score: snap.scores[other],
            my_budget: snap.budgets[seat],
            opponent_budget: snap.budgets[other],
            next_round: snap.round,
        }))
    }

    pub(crate) async fn poker_snapshot(&self, game_id: u64) -> Result<PokerSnapshot, EngineError> {
        with_retry(&self.config.retry, &self.cancel, "poker state", || {
            self.ledger.poker_state(game_id)
        })
        .await
    }
}
