//! In-memory mock ledger for tests and demos.
//!
//! Enforces the same phase transitions the authoritative ledger would:
//! commits flip the game to the reveal/betting phase once both sides are
//! in, reveals are checked against the stored commitments, folds end a
//! round early, and the final round settles the game. Handles created via
//! [`MockLedger::for_participant`] share one ledger state, so two engine
//! instances can play against each other in-process.

use crate::crypto::{Commitment, Salt};
use crate::error::LedgerError;
use crate::types::{
    Address, AuctionPhase, AuctionSnapshot, BetMove, GameKind, Move, PokerPhase, PokerRoundView,
    PokerSnapshot, RpsPhase, RpsRoundView, RpsSnapshot,
};
use crate::LedgerClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct RpsGame {
    players: [Address; 2],
    total_rounds: u32,
    round: u32,
    phase: RpsPhase,
    committed: [Option<Commitment>; 2],
    revealed: [bool; 2],
    scores: [u32; 2],
    settled: bool,
    rounds: Vec<RpsRoundView>,
}

#[derive(Debug)]
struct PokerGame {
    players: [Address; 2],
    total_rounds: u32,
    round: u32,
    phase: PokerPhase,
    committed: [Option<Commitment>; 2],
    revealed: [bool; 2],
    budgets: [u64; 2],
    scores: [u32; 2],
    pending_bet: u64,
    turn: Option<usize>,
    actions_this_phase: u8,
    settled: bool,
    rounds: Vec<PokerRoundView>,
}

#[derive(Debug)]
struct AuctionGame {
    players: [Address; 2],
    phase: AuctionPhase,
    committed: [Option<Commitment>; 2],
    revealed: [bool; 2],
    bids: [Option<u64>; 2],
    winner: Option<Address>,
    winning_bid: Option<u64>,
    settled: bool,
}

#[derive(Default)]
struct LedgerState {
    next_game_id: u64,
    rps: HashMap<u64, RpsGame>,
    poker: HashMap<u64, PokerGame>,
    auctions: HashMap<u64, AuctionGame>,
}

/// Per-handle failure injection for transport-resilience tests
#[derive(Default)]
struct FaultPlan {
    transient_submits: u32,
    rejected_submits: u32,
    transient_reads: u32,
}

/// Shared in-memory ledger; cloning shares state, `for_participant`
/// creates a handle submitting as a different address.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
    address: Address,
    faults: Arc<Mutex<FaultPlan>>,
}

impl MockLedger {
    /// Create a fresh ledger with this handle acting as `address`
    pub fn new(address: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            address,
            faults: Arc::new(Mutex::new(FaultPlan::default())),
        }
    }

    /// A handle over the same ledger state acting as another participant
    pub fn for_participant(&self, address: Address) -> Self {
        Self {
            state: Arc::clone(&self.state),
            address,
            faults: Arc::new(Mutex::new(FaultPlan::default())),
        }
    }

    /// Fail this handle's next `n` mutating calls with a transient error
    pub fn fail_submits(&self, n: u32) {
        self.faults.lock().unwrap().transient_submits = n;
    }

    /// Reject this handle's next `n` mutating calls authoritatively
    pub fn reject_submits(&self, n: u32) {
        self.faults.lock().unwrap().rejected_submits = n;
    }

    /// Fail this handle's next `n` snapshot reads with a transient error
    pub fn fail_reads(&self, n: u32) {
        self.faults.lock().unwrap().transient_reads = n;
    }

    /// Mark a game settled regardless of its current phase
    pub fn force_settle(&self, kind: GameKind, game_id: u64) {
        let mut state = self.state.lock().unwrap();
        match kind {
            GameKind::Rps => {
                if let Some(g) = state.rps.get_mut(&game_id) {
                    g.settled = true;
                    g.phase = RpsPhase::Complete;
                }
            }
            GameKind::Poker => {
                if let Some(g) = state.poker.get_mut(&game_id) {
                    g.settled = true;
                    g.phase = PokerPhase::Complete;
                    g.turn = None;
                }
            }
            GameKind::Auction => {
                if let Some(g) = state.auctions.get_mut(&game_id) {
                    g.settled = true;
                    g.phase = AuctionPhase::Complete;
                }
            }
        }
    }

    /// Advance an RPS game to the next round without reveals, as a
    /// counterparty timeout claim would
    pub fn force_round_advance(&self, kind: GameKind, game_id: u64) {
        let mut state = self.state.lock().unwrap();
        match kind {
            GameKind::Rps => {
                if let Some(g) = state.rps.get_mut(&game_id) {
                    advance_rps_round(g);
                }
            }
            GameKind::Poker => {
                if let Some(g) = state.poker.get_mut(&game_id) {
                    advance_poker_round(g);
                }
            }
            GameKind::Auction => {}
        }
    }

    /// Create an RPS game between this handle and `opponent`
    pub fn create_rps(&self, opponent: Address, total_rounds: u32) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_game_id;
        state.next_game_id += 1;
        state.rps.insert(
            id,
            RpsGame {
                players: [self.address, opponent],
                total_rounds,
                round: 0,
                phase: RpsPhase::Commit,
                committed: [None, None],
                revealed: [false, false],
                scores: [0, 0],
                settled: false,
                rounds: vec![RpsRoundView::default()],
            },
        );
        id
    }

    /// Create a poker game with a per-seat hand-value budget
    pub fn create_poker(&self, opponent: Address, total_rounds: u32, budget: u64) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_game_id;
        state.next_game_id += 1;
        state.poker.insert(
            id,
            PokerGame {
                players: [self.address, opponent],
                total_rounds,
                round: 0,
                phase: PokerPhase::Commit,
                committed: [None, None],
                revealed: [false, false],
                budgets: [budget, budget],
                scores: [0, 0],
                pending_bet: 0,
                turn: None,
                actions_this_phase: 0,
                settled: false,
                rounds: vec![PokerRoundView::default()],
            },
        );
        id
    }

    /// Create a sealed-bid auction between this handle and `opponent`
    pub fn create_auction(&self, opponent: Address) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_game_id;
        state.next_game_id += 1;
        state.auctions.insert(
            id,
            AuctionGame {
                players: [self.address, opponent],
                phase: AuctionPhase::Commit,
                committed: [None, None],
                revealed: [false, false],
                bids: [None, None],
                winner: None,
                winning_bid: None,
                settled: false,
            },
        );
        id
    }

    fn gate_submit(&self) -> Result<(), LedgerError> {
        let mut faults = self.faults.lock().unwrap();
        if faults.rejected_submits > 0 {
            faults.rejected_submits -= 1;
            return Err(LedgerError::Rejected("injected rejection".into()));
        }
        if faults.transient_submits > 0 {
            faults.transient_submits -= 1;
            return Err(LedgerError::Transport("injected transport failure".into()));
        }
        Ok(())
    }

    fn gate_read(&self) -> Result<(), LedgerError> {
        let mut faults = self.faults.lock().unwrap();
        if faults.transient_reads > 0 {
            faults.transient_reads -= 1;
            return Err(LedgerError::Transport("injected transport failure".into()));
        }
        Ok(())
    }
}

fn seat_for(players: &[Address; 2], addr: &Address, game_id: u64) -> Result<usize, LedgerError> {
    players
        .iter()
        .position(|p| p == addr)
        .ok_or(LedgerError::NotParticipant(game_id))
}

fn advance_rps_round(g: &mut RpsGame) {
    if g.round + 1 >= g.total_rounds {
        g.settled = true;
        g.phase = RpsPhase::Complete;
    } else {
        g.round += 1;
        g.phase = RpsPhase::Commit;
        g.committed = [None, None];
        g.revealed = [false, false];
        g.rounds.push(RpsRoundView::default());
    }
}

fn advance_poker_round(g: &mut PokerGame) {
    if g.round + 1 >= g.total_rounds {
        g.settled = true;
        g.phase = PokerPhase::Complete;
        g.turn = None;
    } else {
        g.round += 1;
        g.phase = PokerPhase::Commit;
        g.committed = [None, None];
        g.revealed = [false, false];
        g.pending_bet = 0;
        g.turn = None;
        g.actions_this_phase = 0;
        g.rounds.push(PokerRoundView::default());
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn self_address(&self) -> Address {
        self.address
    }

    async fn rps_state(&self, game_id: u64) -> Result<RpsSnapshot, LedgerError> {
        self.gate_read()?;
        let state = self.state.lock().unwrap();
        let g = state
            .rps
            .get(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        Ok(RpsSnapshot {
            game_id,
            players: g.players,
            total_rounds: g.total_rounds,
            round: g.round,
            phase: g.phase,
            committed: [g.committed[0].is_some(), g.committed[1].is_some()],
            revealed: g.revealed,
            scores: g.scores,
            settled: g.settled,
        })
    }

    async fn rps_round(&self, game_id: u64, round: u32) -> Result<RpsRoundView, LedgerError> {
        self.gate_read()?;
        let state = self.state.lock().unwrap();
        let g = state
            .rps
            .get(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        g.rounds
            .get(round as usize)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("round {round} not started")))
    }

    async fn rps_commit(&self, game_id: u64, commitment: Commitment) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .rps
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || g.phase != RpsPhase::Commit {
            return Err(LedgerError::Rejected("commit phase is over".into()));
        }
        match g.committed[seat] {
            // Duplicate submission of the same commitment is a no-op
            Some(existing) if existing == commitment => return Ok(()),
            Some(_) => return Err(LedgerError::Rejected("already committed".into())),
            None => g.committed[seat] = Some(commitment),
        }
        if g.committed.iter().all(|c| c.is_some()) {
            g.phase = RpsPhase::Reveal;
        }
        Ok(())
    }

    async fn rps_reveal(&self, game_id: u64, mv: Move, salt: Salt) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .rps
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || g.phase != RpsPhase::Reveal {
            return Err(LedgerError::Rejected("not in reveal phase".into()));
        }
        if g.revealed[seat] {
            return Ok(());
        }
        let commitment = g.committed[seat]
            .ok_or_else(|| LedgerError::Rejected("no commitment on record".into()))?;
        if !commitment.verify(&[mv.to_byte()], &salt) {
            return Err(LedgerError::Rejected("commitment mismatch".into()));
        }

        let round = g.round as usize;
        g.rounds[round].moves[seat] = Some(mv);
        g.rounds[round].revealed[seat] = true;
        g.revealed[seat] = true;

        if g.revealed.iter().all(|r| *r) {
            let a = g.rounds[round].moves[0].expect("both revealed");
            let b = g.rounds[round].moves[1].expect("both revealed");
            if a.beats(&b) {
                g.scores[0] += 1;
            } else if b.beats(&a) {
                g.scores[1] += 1;
            }
            advance_rps_round(g);
        }
        Ok(())
    }

    async fn poker_state(&self, game_id: u64) -> Result<PokerSnapshot, LedgerError> {
        self.gate_read()?;
        let state = self.state.lock().unwrap();
        let g = state
            .poker
            .get(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        Ok(PokerSnapshot {
            game_id,
            players: g.players,
            total_rounds: g.total_rounds,
            round: g.round,
            phase: g.phase,
            committed: [g.committed[0].is_some(), g.committed[1].is_some()],
            revealed: g.revealed,
            budgets: g.budgets,
            scores: g.scores,
            pending_bet: g.pending_bet,
            turn: g.turn.map(|s| g.players[s]),
            settled: g.settled,
        })
    }

    async fn poker_round(&self, game_id: u64, round: u32) -> Result<PokerRoundView, LedgerError> {
        self.gate_read()?;
        let state = self.state.lock().unwrap();
        let g = state
            .poker
            .get(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        g.rounds
            .get(round as usize)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected(format!("round {round} not started")))
    }

    async fn poker_commit(&self, game_id: u64, commitment: Commitment) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .poker
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || g.phase != PokerPhase::Commit {
            return Err(LedgerError::Rejected("commit phase is over".into()));
        }
        match g.committed[seat] {
            Some(existing) if existing == commitment => return Ok(()),
            Some(_) => return Err(LedgerError::Rejected("already committed".into())),
            None => g.committed[seat] = Some(commitment),
        }
        if g.committed.iter().all(|c| c.is_some()) {
            g.phase = PokerPhase::FirstBetting;
            g.turn = Some(0);
            g.pending_bet = 0;
            g.actions_this_phase = 0;
        }
        Ok(())
    }

    async fn poker_bet(&self, game_id: u64, action: BetMove) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .poker
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || !g.phase.is_betting() {
            return Err(LedgerError::Rejected("not a betting phase".into()));
        }
        if g.turn != Some(seat) {
            return Err(LedgerError::Rejected("not your turn".into()));
        }

        let other = 1 - seat;
        match action {
            BetMove::Check => {
                if g.pending_bet > 0 {
                    return Err(LedgerError::Rejected("a bet is pending".into()));
                }
                g.actions_this_phase += 1;
                if g.actions_this_phase >= 2 {
                    advance_poker_phase(g);
                } else {
                    g.turn = Some(other);
                }
            }
            BetMove::Bet(amount) => {
                if g.pending_bet > 0 {
                    return Err(LedgerError::Rejected("a bet is already pending".into()));
                }
                if amount == 0 {
                    return Err(LedgerError::Rejected("bet amount must be positive".into()));
                }
                g.pending_bet = amount;
                g.actions_this_phase += 1;
                g.turn = Some(other);
            }
            BetMove::Call => {
                if g.pending_bet == 0 {
                    return Err(LedgerError::Rejected("nothing to call".into()));
                }
                g.pending_bet = 0;
                advance_poker_phase(g);
            }
            BetMove::Raise(amount) => {
                if g.pending_bet == 0 {
                    return Err(LedgerError::Rejected("nothing to raise".into()));
                }
                if amount <= g.pending_bet {
                    return Err(LedgerError::Rejected(
                        "raise must exceed the pending bet".into(),
                    ));
                }
                g.pending_bet = amount;
                g.turn = Some(other);
            }
            BetMove::Fold => {
                g.scores[other] += 1;
                advance_poker_round(g);
            }
        }
        Ok(())
    }

    async fn poker_reveal(&self, game_id: u64, hand: u8, salt: Salt) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .poker
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || g.phase != PokerPhase::Showdown {
            return Err(LedgerError::Rejected("not in showdown".into()));
        }
        if g.revealed[seat] {
            return Ok(());
        }
        let commitment = g.committed[seat]
            .ok_or_else(|| LedgerError::Rejected("no commitment on record".into()))?;
        if !commitment.verify(&[hand], &salt) {
            return Err(LedgerError::Rejected("commitment mismatch".into()));
        }
        // The ledger is the final budget arbiter
        if u64::from(hand) > g.budgets[seat] {
            return Err(LedgerError::Rejected(
                "hand exceeds remaining budget".into(),
            ));
        }

        let round = g.round as usize;
        g.rounds[round].hands[seat] = Some(hand);
        g.rounds[round].revealed[seat] = true;
        g.revealed[seat] = true;

        if g.revealed.iter().all(|r| *r) {
            let a = g.rounds[round].hands[0].expect("both revealed");
            let b = g.rounds[round].hands[1].expect("both revealed");
            // Budget is consumed only once revealed
            g.budgets[0] -= u64::from(a);
            g.budgets[1] -= u64::from(b);
            if a > b {
                g.scores[0] += 1;
            } else if b > a {
                g.scores[1] += 1;
            }
            advance_poker_round(g);
        }
        Ok(())
    }

    async fn auction_state(&self, game_id: u64) -> Result<AuctionSnapshot, LedgerError> {
        self.gate_read()?;
        let state = self.state.lock().unwrap();
        let g = state
            .auctions
            .get(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        Ok(AuctionSnapshot {
            game_id,
            players: g.players,
            phase: g.phase,
            committed: [g.committed[0].is_some(), g.committed[1].is_some()],
            revealed: g.revealed,
            bids: g.bids,
            winner: g.winner,
            winning_bid: g.winning_bid,
            settled: g.settled,
        })
    }

    async fn auction_commit(
        &self,
        game_id: u64,
        commitment: Commitment,
    ) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .auctions
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || g.phase != AuctionPhase::Commit {
            return Err(LedgerError::Rejected("bidding is closed".into()));
        }
        match g.committed[seat] {
            Some(existing) if existing == commitment => return Ok(()),
            Some(_) => return Err(LedgerError::Rejected("already committed".into())),
            None => g.committed[seat] = Some(commitment),
        }
        if g.committed.iter().all(|c| c.is_some()) {
            g.phase = AuctionPhase::Reveal;
        }
        Ok(())
    }

    async fn auction_reveal(&self, game_id: u64, bid: u64, salt: Salt) -> Result<(), LedgerError> {
        self.gate_submit()?;
        let mut state = self.state.lock().unwrap();
        let g = state
            .auctions
            .get_mut(&game_id)
            .ok_or(LedgerError::GameNotFound(game_id))?;
        let seat = seat_for(&g.players, &self.address, game_id)?;

        if g.settled || g.phase != AuctionPhase::Reveal {
            return Err(LedgerError::Rejected("not in reveal phase".into()));
        }
        if g.revealed[seat] {
            return Ok(());
        }
        let commitment = g.committed[seat]
            .ok_or_else(|| LedgerError::Rejected("no commitment on record".into()))?;
        if !commitment.verify(&bid.to_be_bytes(), &salt) {
            return Err(LedgerError::Rejected("commitment mismatch".into()));
        }

        g.bids[seat] = Some(bid);
        g.revealed[seat] = true;

        if g.revealed.iter().all(|r| *r) {
            let a = g.bids[0].expect("both revealed");
            let b = g.bids[1].expect("both revealed");
            g.winning_bid = Some(a.max(b));
            g.winner = if a > b {
                Some(g.players[0])
            } else if b > a {
                Some(g.players[1])
            } else {
                None
            };
            g.settled = true;
            g.phase = AuctionPhase::Complete;
        }
        Ok(())
    }
}

fn advance_poker_phase(g: &mut PokerGame) {
    match g.phase {
        PokerPhase::FirstBetting => {
            g.phase = PokerPhase::SecondBetting;
            g.pending_bet = 0;
            g.actions_this_phase = 0;
            g.turn = Some(0);
        }
        PokerPhase::SecondBetting => {
            g.phase = PokerPhase::Showdown;
            g.pending_bet = 0;
            g.turn = None;
        }
        _ => {}
    }
}
