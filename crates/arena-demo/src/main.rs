//! Arena Demo
//!
//! Plays an exhibition match of each game kind between two engine
//! instances sharing one in-memory mock ledger. Point `ARENA_RPC_URL`
//! (plus `ARENA_ADDRESS` and `ARENA_GAME_ID`) at a real ledger node to
//! play a single RPS round against a live game instead.

use arena_engine::{
    parse_move, BettingPolicy, Engine, FileCommitmentStore, LogReporter, PokerOutcome,
    PolicyAction, RpsOutcome,
};
use arena_ledger::{Address, LedgerClient, MockLedger, Move, RpcLedger};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn store_dir(tag: &str) -> String {
    let base =
        std::env::var("ARENA_STORE_DIR").unwrap_or_else(|_| "./arena-state".to_string());
    format!("{base}/{tag}")
}

fn engine_over<L: LedgerClient>(
    ledger: L,
    tag: &str,
) -> Engine<L, FileCommitmentStore, LogReporter> {
    let store = FileCommitmentStore::open(store_dir(tag)).expect("open commitment store");
    Engine::new(Arc::new(ledger), store, LogReporter)
}

async fn play_live_round(rpc_url: String) {
    let address: Address = std::env::var("ARENA_ADDRESS")
        .expect("ARENA_ADDRESS is required with ARENA_RPC_URL")
        .parse()
        .expect("ARENA_ADDRESS must be a 20-byte hex address");
    let game_id: u64 = std::env::var("ARENA_GAME_ID")
        .expect("ARENA_GAME_ID is required with ARENA_RPC_URL")
        .parse()
        .expect("ARENA_GAME_ID must be a number");
    let mv = std::env::var("ARENA_MOVE").unwrap_or_else(|_| "rock".to_string());
    let mv = match parse_move(&mv) {
        Ok(mv) => mv,
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "bad ARENA_MOVE");
            return;
        }
    };

    info!(%rpc_url, %address, game_id, "playing one live RPS round");
    let engine = engine_over(RpcLedger::new(rpc_url, address), "live");
    match engine.play_rps_round(game_id, mv).await {
        Ok(outcome) => info!(?outcome, "round finished"),
        Err(e) => tracing::error!(code = e.code(), error = %e, "round failed"),
    }
}

async fn play_exhibition() {
    let alice = Address::from_bytes([0xa1; 20]);
    let bob = Address::from_bytes([0xb0; 20]);
    let ledger_a = MockLedger::new(alice);
    let ledger_b = ledger_a.for_participant(bob);

    // Best-of-three RPS with fixed scripts.
    let rps_id = ledger_a.create_rps(bob, 3);
    info!(game_id = rps_id, "starting RPS exhibition");
    let script_a = [Move::Rock, Move::Paper, Move::Scissors];
    let script_b = [Move::Scissors, Move::Paper, Move::Rock];

    let task_a = {
        let engine = engine_over(ledger_a.clone(), "alice");
        tokio::spawn(async move {
            for mv in script_a {
                match engine.play_rps_round(rps_id, mv).await {
                    Ok(RpsOutcome::Round(_)) => continue,
                    Ok(RpsOutcome::Final(f)) => {
                        info!(outcome = ?f.outcome, score = f.my_score, "alice: RPS match over");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(code = e.code(), error = %e, "alice: RPS round failed");
                        break;
                    }
                }
            }
        })
    };
    let task_b = {
        let engine = engine_over(ledger_b.clone(), "bob");
        tokio::spawn(async move {
            for mv in script_b {
                match engine.play_rps_round(rps_id, mv).await {
                    Ok(RpsOutcome::Round(_)) => continue,
                    Ok(RpsOutcome::Final(_)) => break,
                    Err(e) => {
                        tracing::error!(code = e.code(), error = %e, "bob: RPS round failed");
                        break;
                    }
                }
            }
        })
    };
    let _ = tokio::join!(task_a, task_b);

    // Two rounds of budgeted poker: Alice bets, Bob calls along.
    let poker_id = ledger_a.create_poker(bob, 2, 30);
    info!(game_id = poker_id, "starting poker exhibition");
    let aggressive = BettingPolicy {
        when_unopposed: PolicyAction::Bet { amount: Some(5) },
        when_facing_bet: PolicyAction::Call,
    };
    let task_a = {
        let engine = engine_over(ledger_a.clone(), "alice");
        tokio::spawn(async move {
            loop {
                match engine.play_poker_round(poker_id, 12, &aggressive).await {
                    Ok(PokerOutcome::Round(_)) => continue,
                    Ok(PokerOutcome::Final(f)) => {
                        info!(outcome = ?f.outcome, budget = f.my_budget, "alice: poker match over");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(code = e.code(), error = %e, "alice: poker round failed");
                        break;
                    }
                }
            }
        })
    };
    let task_b = {
        let engine = engine_over(ledger_b.clone(), "bob");
        tokio::spawn(async move {
            let policy = BettingPolicy::passive();
            loop {
                match engine.play_poker_round(poker_id, 9, &policy).await {
                    Ok(PokerOutcome::Round(_)) => continue,
                    Ok(PokerOutcome::Final(_)) => break,
                    Err(e) => {
                        tracing::error!(code = e.code(), error = %e, "bob: poker round failed");
                        break;
                    }
                }
            }
        })
    };
    let _ = tokio::join!(task_a, task_b);

    // One sealed-bid auction.
    let auction_id = ledger_a.create_auction(bob);
    info!(game_id = auction_id, "starting auction exhibition");
    let task_a = {
        let engine = engine_over(ledger_a.clone(), "alice");
        tokio::spawn(async move { engine.play_auction(auction_id, 70).await })
    };
    let task_b = {
        let engine = engine_over(ledger_b.clone(), "bob");
        tokio::spawn(async move { engine.play_auction(auction_id, 55).await })
    };
    let (a, b) = tokio::join!(task_a, task_b);
    if let (Ok(Ok(a)), Ok(Ok(b))) = (a, b) {
        info!(alice_won = a.won, bob_won = b.won, winning_bid = ?a.winning_bid, "auction done");
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    match std::env::var("ARENA_RPC_URL") {
        Ok(url) => play_live_round(url).await,
        Err(_) => {
            info!("no ARENA_RPC_URL set, running the mock exhibition");
            play_exhibition().await;
        }
    }
}
