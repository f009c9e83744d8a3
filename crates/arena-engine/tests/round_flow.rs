//! End-to-end round flows over the in-memory mock ledger: two engines
//! playing against each other, crash recovery through the file store,
//! and the failure paths (timeouts, rejections, lost salts).

use arena_engine::{
    BettingPolicy, CommitmentKey, Engine, EngineConfig, FileCommitmentStore, MatchOutcome,
    MemoryCommitmentStore, PokerOutcome, PolicyAction, PollConfig, RecordingReporter,
    RetryPolicy, RoundOutcome, RpsOutcome,
};
use arena_ledger::{Address, BetMove, GameKind, LedgerClient, MockLedger, Move, PokerPhase};
use std::sync::Arc;
use std::time::Duration;

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy {
            max_attempts: 8,
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(20),
        },
        poll: PollConfig {
            interval: Duration::from_millis(5),
            max_wait: Duration::from_secs(2),
        },
        reveal_attempts: 3,
    }
}

fn engine_for(
    ledger: &MockLedger,
) -> Engine<MockLedger, MemoryCommitmentStore, Arc<RecordingReporter>> {
    Engine::new(
        Arc::new(ledger.clone()),
        MemoryCommitmentStore::new(),
        Arc::new(RecordingReporter::new()),
    )
    .with_config(fast_config())
}

#[tokio::test]
async fn test_rps_round_end_to_end() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 2);

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);

    let (r1, r2) = tokio::join!(
        e1.play_rps_round(game_id, Move::Rock),
        e2.play_rps_round(game_id, Move::Scissors),
    );

    match r1.unwrap() {
        RpsOutcome::Round(summary) => {
            assert_eq!(summary.round, 0);
            assert_eq!(summary.your_move, Move::Rock);
            assert_eq!(summary.opponent_move, Some(Move::Scissors));
            assert_eq!(summary.result, RoundOutcome::Win);
            assert_eq!(summary.my_score, 1);
            assert_eq!(summary.opponent_score, 0);
            assert_eq!(summary.next_round, 1);
        }
        other => panic!("expected a round summary, got {other:?}"),
    }
    match r2.unwrap() {
        RpsOutcome::Round(summary) => {
            assert_eq!(summary.result, RoundOutcome::Loss);
            assert_eq!(summary.my_score, 0);
        }
        other => panic!("expected a round summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rps_last_round_reports_final_standing() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 1);

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);

    let (r1, r2) = tokio::join!(
        e1.play_rps_round(game_id, Move::Paper),
        e2.play_rps_round(game_id, Move::Rock),
    );

    match r1.unwrap() {
        RpsOutcome::Final(f) => {
            assert_eq!(f.outcome, MatchOutcome::Won);
            assert_eq!(f.my_score, 1);
            assert_eq!(f.opponent_score, 0);
        }
        other => panic!("expected a final standing, got {other:?}"),
    }
    assert!(matches!(
        r2.unwrap(),
        RpsOutcome::Final(f) if f.outcome == MatchOutcome::Lost
    ));
}

#[tokio::test]
async fn test_rps_salt_survives_restart() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 2);
    let dir = tempfile::tempdir().unwrap();

    // First run commits, then gets cancelled while waiting for the
    // opponent, as a crash would leave things.
    {
        let engine = Engine::new(
            Arc::new(p1.clone()),
            FileCommitmentStore::open(dir.path()).unwrap(),
            Arc::new(RecordingReporter::new()),
        )
        .with_config(fast_config());
        let token = engine.cancel_token();
        let (result, _) = tokio::join!(engine.play_rps_round(game_id, Move::Rock), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            token.cancel();
        });
        assert_eq!(result.unwrap_err().code(), "CANCELLED");
    }
    let snap = p1.rps_state(game_id).await.unwrap();
    assert!(snap.committed[0], "commit should have landed before cancel");

    // The opponent now shows up.
    let salt2 = arena_ledger::Salt::random();
    let commitment2 =
        arena_ledger::Commitment::new(&[Move::Scissors.to_byte()], &salt2);
    p2.rps_commit(game_id, commitment2).await.unwrap();

    // A fresh engine over the same store directory finishes the round
    // with the original salt; a regenerated one could never verify.
    let engine = Engine::new(
        Arc::new(p1.clone()),
        FileCommitmentStore::open(dir.path()).unwrap(),
        Arc::new(RecordingReporter::new()),
    )
    .with_config(fast_config());
    let (result, _) = tokio::join!(engine.play_rps_round(game_id, Move::Rock), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        p2.rps_reveal(game_id, Move::Scissors, salt2).await.unwrap();
    });
    match result.unwrap() {
        RpsOutcome::Round(summary) => {
            assert_eq!(summary.your_move, Move::Rock);
            assert_eq!(summary.result, RoundOutcome::Win);
        }
        other => panic!("expected a round summary, got {other:?}"),
    }

    // The record is gone only now that the reveal is confirmed.
    let store = FileCommitmentStore::open(dir.path()).unwrap();
    let key = CommitmentKey {
        kind: GameKind::Rps,
        game_id,
        round: 0,
        participant: addr(1),
    };
    use arena_engine::CommitmentStore;
    assert!(store.load(&key).unwrap().is_none());
}

#[tokio::test]
async fn test_rps_reveal_without_record_is_salt_lost() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 1);

    // The commitment landed on the ledger but the local record was never
    // written (or was wiped).
    let salt = arena_ledger::Salt::random();
    p1.rps_commit(
        game_id,
        arena_ledger::Commitment::new(&[Move::Rock.to_byte()], &salt),
    )
    .await
    .unwrap();
    p2.rps_commit(
        game_id,
        arena_ledger::Commitment::new(&[Move::Paper.to_byte()], &arena_ledger::Salt::random()),
    )
    .await
    .unwrap();

    let engine = engine_for(&p1);
    let err = engine
        .play_rps_round(game_id, Move::Rock)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SALT_LOST");
}

#[tokio::test]
async fn test_rps_round_claimed_without_opponent_reveal() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 2);

    let engine = engine_for(&p1);
    let driver = async {
        // The opponent commits so the reveal phase opens, then goes
        // silent; the round is later claimed over their timeout.
        let salt = arena_ledger::Salt::random();
        p2.rps_commit(
            game_id,
            arena_ledger::Commitment::new(&[Move::Paper.to_byte()], &salt),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        p1.force_round_advance(GameKind::Rps, game_id);
    };
    let (result, _) = tokio::join!(engine.play_rps_round(game_id, Move::Rock), driver);

    // Round-over without the opponent's move is a structured result,
    // not a failure.
    match result.unwrap() {
        RpsOutcome::Round(summary) => {
            assert_eq!(summary.your_move, Move::Rock);
            assert_eq!(summary.opponent_move, None);
            assert_eq!(summary.result, RoundOutcome::Draw);
            assert_eq!(summary.next_round, 1);
        }
        other => panic!("expected a round summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_faults_are_absorbed() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 1);

    p1.fail_submits(2);
    p1.fail_reads(1);

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);
    let (r1, r2) = tokio::join!(
        e1.play_rps_round(game_id, Move::Rock),
        e2.play_rps_round(game_id, Move::Rock),
    );
    assert!(matches!(
        r1.unwrap(),
        RpsOutcome::Final(f) if f.outcome == MatchOutcome::Drawn
    ));
    r2.unwrap();
}

#[tokio::test]
async fn test_authoritative_rejection_fails_fast() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_rps(addr(2), 1);
    p1.reject_submits(1);

    let reporter = Arc::new(RecordingReporter::new());
    let engine = Engine::new(
        Arc::new(p1.clone()),
        MemoryCommitmentStore::new(),
        Arc::clone(&reporter),
    )
    .with_config(fast_config());

    let err = engine
        .play_rps_round(game_id, Move::Rock)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "LEDGER");

    // Exactly one terminal report, carrying the failure code
    let terminals = reporter.terminal_reports();
    assert_eq!(terminals.len(), 1);
    assert!(!terminals[0].success);
    assert_eq!(terminals[0].code, Some("LEDGER"));
}

#[tokio::test]
async fn test_settlement_short_circuits_waiting() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_rps(addr(2), 3);

    let engine = engine_for(&p1);
    let (result, _) = tokio::join!(engine.play_rps_round(game_id, Move::Rock), async {
        tokio::time::sleep(Duration::from_millis(25)).await;
        p1.force_settle(GameKind::Rps, game_id);
    });
    assert!(matches!(result.unwrap(), RpsOutcome::Final(_)));
}

#[tokio::test]
async fn test_opponent_timeout() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_rps(addr(2), 1);

    let mut config = fast_config();
    config.poll.max_wait = Duration::from_millis(40);
    let engine = Engine::new(
        Arc::new(p1.clone()),
        MemoryCommitmentStore::new(),
        Arc::new(RecordingReporter::new()),
    )
    .with_config(config);

    let err = engine
        .play_rps_round(game_id, Move::Rock)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "OPPONENT_TIMEOUT");
}

#[tokio::test]
async fn test_not_participant() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_rps(addr(2), 1);

    let outsider = p1.for_participant(addr(9));
    let engine = engine_for(&outsider);
    let err = engine
        .play_rps_round(game_id, Move::Rock)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_PARTICIPANT");
}

#[tokio::test]
async fn test_poker_full_game() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_poker(addr(2), 2, 20);

    let aggressive = BettingPolicy {
        when_unopposed: PolicyAction::Bet { amount: Some(3) },
        when_facing_bet: PolicyAction::Call,
    };
    let passive = BettingPolicy::passive();

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);

    let player = |engine: Engine<_, _, _>, hand: u8, policy: BettingPolicy| async move {
        loop {
            match engine.play_poker_round(game_id, hand, &policy).await? {
                PokerOutcome::Round(_) => continue,
                PokerOutcome::Final(f) => return Ok::<_, arena_engine::EngineError>(f),
            }
        }
    };

    let (f1, f2) = tokio::join!(player(e1, 10, aggressive), player(e2, 5, passive));
    let f1 = f1.unwrap();
    let f2 = f2.unwrap();

    assert_eq!(f1.outcome, MatchOutcome::Won);
    assert_eq!(f1.my_score, 2);
    assert_eq!(f1.opponent_score, 0);
    // Two revealed hands of 10 and 5 each consumed budget
    assert_eq!(f1.my_budget, 0);
    assert_eq!(f1.opponent_budget, 10);
    assert_eq!(f2.outcome, MatchOutcome::Lost);
}

#[tokio::test]
async fn test_poker_fold_ends_round_without_reveals() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_poker(addr(2), 2, 20);

    let better = BettingPolicy {
        when_unopposed: PolicyAction::Bet { amount: Some(4) },
        when_facing_bet: PolicyAction::Call,
    };
    let folder = BettingPolicy {
        when_unopposed: PolicyAction::Check,
        when_facing_bet: PolicyAction::Fold,
    };

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);
    let (r1, r2) = tokio::join!(
        e1.play_poker_round(game_id, 10, &better),
        e2.play_poker_round(game_id, 8, &folder),
    );

    match r1.unwrap() {
        PokerOutcome::Round(summary) => {
            assert_eq!(summary.result, RoundOutcome::Win);
            assert_eq!(summary.opponent_hand, None);
            assert_eq!(summary.next_round, 1);
            // No reveal happened, so no budget was consumed
            assert_eq!(summary.my_budget, 20);
        }
        other => panic!("expected a round summary, got {other:?}"),
    }
    assert!(matches!(
        r2.unwrap(),
        PokerOutcome::Round(s) if s.result == RoundOutcome::Loss
    ));
}

#[tokio::test]
async fn test_poker_budget_preflight_blocks_before_any_send() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_poker(addr(2), 3, 10);

    let engine = engine_for(&p1);
    // Two rounds remain after this one, so at most 8 may be spent.
    let err = engine
        .play_poker_round(game_id, 9, &BettingPolicy::passive())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EXCEEDS_BUDGET");

    // Nothing reached the ledger.
    let snap = p1.poker_state(game_id).await.unwrap();
    assert_eq!(snap.committed, [false, false]);
}

#[tokio::test]
async fn test_poker_invalid_hand_rejected_locally() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_poker(addr(2), 1, 100);
    let engine = engine_for(&p1);

    let err = engine
        .play_poker_round(game_id, 0, &BettingPolicy::passive())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_HAND");
    let err = engine
        .play_poker_round(game_id, 101, &BettingPolicy::passive())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_HAND");
}

/// Drive the opponent's side of a poker round by hand: commit, then act
/// whenever it is their turn, until the given phase is reached.
async fn drive_poker_opponent(handle: &MockLedger, game_id: u64, hand: u8, until: PokerPhase) {
    let salt = arena_ledger::Salt::random();
    let commitment = arena_ledger::Commitment::new(&[hand], &salt);
    loop {
        let snap = handle.poker_state(game_id).await.unwrap();
        if snap.phase.index() >= until.index() || snap.settled {
            return;
        }
        if snap.phase == PokerPhase::Commit && !snap.committed[1] {
            handle.poker_commit(game_id, commitment).await.unwrap();
        } else if snap.phase.is_betting() && snap.is_turn_of(&handle.self_address()) {
            handle.poker_bet(game_id, BetMove::Check).await.unwrap();
            continue;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn test_poker_reveal_exhaustion_is_reveal_failed() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_poker(addr(2), 1, 100);

    let engine = engine_for(&p1);
    let policy = BettingPolicy::passive();
    let driver = async {
        drive_poker_opponent(&p2, game_id, 5, PokerPhase::Showdown).await;
        // Every reveal from here on is rejected and the round never
        // resolves, so the bounded recovery must give up.
        p1.reject_submits(50);
    };
    let (result, _) = tokio::join!(engine.play_poker_round(game_id, 10, &policy), driver);
    let err = result.unwrap_err();
    assert_eq!(err.code(), "REVEAL_FAILED");
}

#[tokio::test]
async fn test_poker_failed_reveal_is_moot_when_round_resolves() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_poker(addr(2), 2, 100);
    let dir = tempfile::tempdir().unwrap();

    let engine = Engine::new(
        Arc::new(p1.clone()),
        FileCommitmentStore::open(dir.path()).unwrap(),
        Arc::new(RecordingReporter::new()),
    )
    .with_config(fast_config());

    let policy = BettingPolicy::passive();
    let driver = async {
        drive_poker_opponent(&p2, game_id, 5, PokerPhase::Showdown).await;
        // Reveals now fail at the transport layer; while the engine backs
        // off, the counterparty claims the round on timeout.
        p1.fail_submits(500);
        tokio::time::sleep(Duration::from_millis(10)).await;
        p1.force_round_advance(GameKind::Poker, game_id);
    };
    let (result, _) = tokio::join!(engine.play_poker_round(game_id, 10, &policy), driver);

    // The round resolved without our reveal: no error, and the record is
    // left in place since the reveal was never confirmed.
    match result.unwrap() {
        PokerOutcome::Round(summary) => assert_eq!(summary.result, RoundOutcome::Draw),
        other => panic!("expected a round summary, got {other:?}"),
    }
    let store = FileCommitmentStore::open(dir.path()).unwrap();
    let key = CommitmentKey {
        kind: GameKind::Poker,
        game_id,
        round: 0,
        participant: addr(1),
    };
    use arena_engine::CommitmentStore;
    assert!(store.load(&key).unwrap().is_some());
}

#[tokio::test]
async fn test_auction_end_to_end() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_auction(addr(2));

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);
    let (r1, r2) = tokio::join!(e1.play_auction(game_id, 30), e2.play_auction(game_id, 45));
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    assert!(!r1.won);
    assert!(r2.won);
    assert_eq!(r1.winner, Some(addr(2)));
    assert_eq!(r1.winning_bid, Some(45));
    assert_eq!(r1.my_bid, Some(30));
    assert_eq!(r2.my_bid, Some(45));
}

#[tokio::test]
async fn test_auction_tie_has_no_winner() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_auction(addr(2));

    let e1 = engine_for(&p1);
    let e2 = engine_for(&p2);
    let (r1, r2) = tokio::join!(e1.play_auction(game_id, 40), e2.play_auction(game_id, 40));

    let r1 = r1.unwrap();
    assert_eq!(r1.winner, None);
    assert!(!r1.won);
    assert!(!r2.unwrap().won);
}

#[tokio::test]
async fn test_auction_zero_bid_rejected_locally() {
    let p1 = MockLedger::new(addr(1));
    let game_id = p1.create_auction(addr(2));

    let engine = engine_for(&p1);
    let err = engine.play_auction(game_id, 0).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_BID");
}

#[tokio::test]
async fn test_progress_events_are_reported() {
    let p1 = MockLedger::new(addr(1));
    let p2 = p1.for_participant(addr(2));
    let game_id = p1.create_rps(addr(2), 1);

    let reporter = Arc::new(RecordingReporter::new());
    let e1 = Engine::new(
        Arc::new(p1.clone()),
        MemoryCommitmentStore::new(),
        Arc::clone(&reporter),
    )
    .with_config(fast_config());
    let e2 = engine_for(&p2);

    let (r1, r2) = tokio::join!(
        e1.play_rps_round(game_id, Move::Rock),
        async {
            // Give player one a head start so it actually waits
            tokio::time::sleep(Duration::from_millis(15)).await;
            e2.play_rps_round(game_id, Move::Paper).await
        },
    );
    r1.unwrap();
    r2.unwrap();

    let events = reporter.progress_events();
    use arena_engine::ProgressEvent;
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Committed { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Revealed { .. })));
    let terminals = reporter.terminal_reports();
    assert_eq!(terminals.len(), 1);
    assert!(terminals[0].success);
}
