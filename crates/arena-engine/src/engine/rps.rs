//! Rock-Paper-Scissors orchestrator: commit the move, wait for the
//! reveal phase, reveal, wait for the round to resolve, judge.

use super::{Engine, MatchOutcome};
use crate::error::EngineError;
use crate::games::{judge, judge_by_scores, RoundOutcome};
use crate::poll::{wait_until, WaitOutcome};
use crate::report::{ProgressEvent, Reporter};
use crate::retry::with_retry;
use crate::store::{CommitmentStore, CommittedValue};
use arena_ledger::{Commitment, GameKind, LedgerClient, Move, RpsPhase, RpsSnapshot};
use serde::Serialize;

/// One resolved round of a game that is still running
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RpsRoundSummary {
    pub round: u32,
    pub your_move: Move,
    /// Absent when the round was claimed without the opponent's reveal
    pub opponent_move: Option<Move>,
    pub result: RoundOutcome,
    pub my_score: u32,
    pub opponent_score: u32,
    /// Round the ledger has moved on to
    pub next_round: u32,
}

/// Standing of a settled match
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RpsFinal {
    pub my_score: u32,
    pub opponent_score: u32,
    pub outcome: MatchOutcome,
}

impl RpsFinal {
    fn from_snapshot(snap: &RpsSnapshot, seat: usize) -> Self {
        Self {
            my_score: snap.scores[seat],
            opponent_score: snap.scores[1 - seat],
            outcome: MatchOutcome::from_scores(snap.scores[seat], snap.scores[1 - seat]),
        }
    }
}

/// What one invocation produced
#[derive(Clone, Copy, Debug, Serialize)]
pub enum RpsOutcome {
    /// The round resolved and the game continues
    Round(RpsRoundSummary),
    /// The game settled during this invocation
    Final(RpsFinal),
}

impl<L, S, R> Engine<L, S, R>
where
    L: LedgerClient,
    S: CommitmentStore,
    R: Reporter,
{
    /// Play one round with the given move.
    ///
    /// Idempotent per round: re-invoking after a crash or duplicate call
    /// reuses the stored commitment record and skips whichever protocol
    /// steps the ledger already confirmed.
    pub async fn play_rps_round(&self, game_id: u64, mv: Move) -> Result<RpsOutcome, EngineError> {
        let result = self.rps_round_inner(game_id, mv).await;
        self.finish(GameKind::Rps, game_id, result, |outcome| match outcome {
            RpsOutcome::Round(r) => {
                let opponent = r
                    .opponent_move
                    .map_or_else(|| "unrevealed".to_string(), |m| m.to_string());
                format!(
                    "round {}: {} vs {} is a {}, score {}-{}, next round {}",
                    r.round, r.your_move, opponent, r.result, r.my_score, r.opponent_score,
                    r.next_round
                )
            }
            RpsOutcome::Final(f) => format!(
                "match settled {:?} at {}-{}",
                f.outcome, f.my_score, f.opponent_score
            ),
        })
    }

    async fn rps_round_inner(&self, game_id: u64, mv: Move) -> Result<RpsOutcome, EngineError> {
        let me = self.ledger.self_address();
        let snap = self.rps_snapshot(game_id).await?;
        let seat = snap
            .seat_of(&me)
            .ok_or(EngineError::NotParticipant(game_id))?;
        let other = 1 - seat;
        if snap.settled {
            return Ok(RpsOutcome::Final(RpsFinal::from_snapshot(&snap, seat)));
        }
        let round = snap.round;
        // Scores only move when a round resolves, so the entry snapshot
        // is a stable baseline for judging this round later.
        let baseline = snap.scores;
        let key = self.commitment_key(GameKind::Rps, game_id, round);

        // The move we are bound to. A recovered record overrides the
        // argument, since its commitment may already be on the ledger.
        let mut bound_move = mv;

        if snap.phase == RpsPhase::Commit && !snap.committed[seat] {
            let record = self.load_or_create_record(&key, CommittedValue::Move(mv))?;
            if let CommittedValue::Move(m) = record.value {
                bound_move = m;
            }
            let commitment = Commitment::new(&record.value.to_bytes(), &record.salt);
            with_retry(&self.config.retry, &self.cancel, "rps commit", || {
                self.ledger.rps_commit(game_id, commitment)
            })
            .await?;
            self.reporter.progress(&ProgressEvent::Committed {
                kind: GameKind::Rps,
                game_id,
                round,
            });
        }

        let outcome = wait_until(
            &self.config.poll,
            &self.cancel,
            "opponent commit",
            || self.rps_snapshot(game_id),
            |s: &RpsSnapshot| s.phase != RpsPhase::Commit || s.round > round,
            |_| {
                self.reporter
                    .progress(&ProgressEvent::WaitingForOpponentCommit {
                        kind: GameKind::Rps,
                        game_id,
                        round,
                    })
            },
        )
        .await?;
        let snap = match outcome {
            WaitOutcome::Settled(s) => {
                return Ok(RpsOutcome::Final(RpsFinal::from_snapshot(&s, seat)))
            }
            WaitOutcome::Satisfied(s) => s,
        };

        if snap.round == round && !snap.revealed[seat] {
            let record = self
                .store
                .load(&key)?
                .ok_or(EngineError::SaltLost(key))?;
            let CommittedValue::Move(m) = record.value else {
                return Err(EngineError::SaltLost(key));
            };
            bound_move = m;
            with_retry(&self.config.retry, &self.cancel, "rps reveal", || {
                self.ledger.rps_reveal(game_id, m, record.salt.clone())
            })
            .await?;
            // Reveal confirmed; the salt has served its purpose.
            self.store.delete(&key)?;
            self.reporter.progress(&ProgressEvent::Revealed {
                kind: GameKind::Rps,
                game_id,
                round,
            });
        }

        let outcome = wait_until(
            &self.config.poll,
            &self.cancel,
            "opponent reveal",
            || self.rps_snapshot(game_id),
            |s: &RpsSnapshot| s.round > round,
            |s| {
                let event = if s.revealed[other] {
                    ProgressEvent::WaitingForRoundEnd {
                        kind: GameKind::Rps,
                        game_id,
                        round,
                    }
                } else {
                    ProgressEvent::WaitingForOpponentReveal {
                        kind: GameKind::Rps,
                        game_id,
                        round,
                    }
                };
                self.reporter.progress(&event);
            },
        )
        .await?;
        let (snap, settled) = match outcome {
            WaitOutcome::Settled(s) => (s, true),
            WaitOutcome::Satisfied(s) => (s, false),
        };
        if settled {
            return Ok(RpsOutcome::Final(RpsFinal::from_snapshot(&snap, seat)));
        }

        let view = with_retry(&self.config.retry, &self.cancel, "rps round view", || {
            self.ledger.rps_round(game_id, round)
        })
        .await?;
        let mine = view.moves[seat].unwrap_or(bound_move);
        let theirs = view.moves[other];

        // The round can resolve without the opponent's reveal (their
        // timeout was claimed); judge by score movement then.
        let result = match theirs {
            Some(theirs) => judge(mine, theirs),
            None => judge_by_scores(baseline, snap.scores, seat),
        };

        Ok(RpsOutcome::Round(RpsRoundSummary {
            round,
            your_move: mine,
            opponent_move: theirs,
            result,
            my_score: snap.scores[seat],
            opponent_score: snap.scores[other],
            next_round: snap.round,
        }))
    }

    pub(crate) async fn rps_snapshot(&self, game_id: u64) -> Result<RpsSnapshot, EngineError> {
        with_retry(&self.config.retry, &self.cancel, "rps state", || {
            self.ledger.rps_state(game_id)
        })
        .await
    }
}
