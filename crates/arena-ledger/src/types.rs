//! Domain types shared between the engine and the ledger clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Participant address on the remote ledger
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(#[serde(with = "addr_serde")] [u8; 20]);

impl Address {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Short display form: 0xABCD1234...
    pub fn short(&self) -> String {
        format!("0x{}...", hex::encode(&self.0[..4]))
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

mod addr_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 20], s: S) -> Result<S::Ok, S::Error> {
        format!("0x{}", hex::encode(bytes)).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 20], D::Error> {
        let hex_str = String::deserialize(d)?;
        let raw = hex_str.strip_prefix("0x").unwrap_or(&hex_str);
        let bytes = hex::decode(raw).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("address must be 20 bytes"))
    }
}

/// Kind of game tracked on the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKind {
    Rps,
    Poker,
    Auction,
}

impl GameKind {
    /// Stable name, used for commitment-store keys and wire calls
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Rps => "rps",
            GameKind::Poker => "poker",
            GameKind::Auction => "auction",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rock-Paper-Scissors move. Byte values match the on-ledger enum
/// (Rock = 1, Paper = 2, Scissors = 3; 0 is reserved for "none").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    /// Wire/commitment byte for this move
    pub fn to_byte(&self) -> u8 {
        match self {
            Move::Rock => 1,
            Move::Paper => 2,
            Move::Scissors => 3,
        }
    }

    /// Decode a wire byte
    pub fn from_byte(b: u8) -> Option<Move> {
        match b {
            1 => Some(Move::Rock),
            2 => Some(Move::Paper),
            3 => Some(Move::Scissors),
            _ => None,
        }
    }

    /// Parse a move name, case-insensitive
    pub fn parse(s: &str) -> Option<Move> {
        match s.to_ascii_lowercase().as_str() {
            "rock" => Some(Move::Rock),
            "paper" => Some(Move::Paper),
            "scissors" => Some(Move::Scissors),
            _ => None,
        }
    }

    /// Check if this move beats the other (fixed 3-cycle)
    pub fn beats(&self, other: &Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
        };
        f.write_str(name)
    }
}

/// A betting action as submitted to the ledger. `Call` carries no amount;
/// the ledger matches the pending bet itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetMove {
    Check,
    Bet(u64),
    Call,
    Raise(u64),
    Fold,
}

impl fmt::Display for BetMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetMove::Check => write!(f, "check"),
            BetMove::Bet(n) => write!(f, "bet {n}"),
            BetMove::Call => write!(f, "call"),
            BetMove::Raise(n) => write!(f, "raise {n}"),
            BetMove::Fold => write!(f, "fold"),
        }
    }
}

/// Phase of an RPS round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpsPhase {
    Commit,
    Reveal,
    Complete,
}

/// Phase of a poker round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PokerPhase {
    Commit,
    FirstBetting,
    SecondBetting,
    Showdown,
    Complete,
}

impl PokerPhase {
    /// Ordinal used for "phase advanced" detection between polls
    pub fn index(&self) -> u8 {
        match self {
            PokerPhase::Commit => 0,
            PokerPhase::FirstBetting => 1,
            PokerPhase::SecondBetting => 2,
            PokerPhase::Showdown => 3,
            PokerPhase::Complete => 4,
        }
    }

    /// Is this one of the two betting phases?
    pub fn is_betting(&self) -> bool {
        matches!(self, PokerPhase::FirstBetting | PokerPhase::SecondBetting)
    }
}

/// Phase of a sealed-bid auction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionPhase {
    Commit,
    Reveal,
    Complete,
}

/// Read-only projection of an RPS game's ledger state.
/// Fetched fresh on every poll tick; never cached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpsSnapshot {
    pub game_id: u64,
    pub players: [Address; 2],
    pub total_rounds: u32,
    pub round: u32,
    pub phase: RpsPhase,
    pub committed: [bool; 2],
    pub revealed: [bool; 2],
    pub scores: [u32; 2],
    pub settled: bool,
}

impl RpsSnapshot {
    /// Seat index for the given participant, if they are in this game
    pub fn seat_of(&self, addr: &Address) -> Option<usize> {
        self.players.iter().position(|p| p == addr)
    }
}

/// Revealed moves for one finished or in-progress RPS round
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RpsRoundView {
    pub moves: [Option<Move>; 2],
    pub revealed: [bool; 2],
}

/// Read-only projection of a poker game's ledger state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PokerSnapshot {
    pub game_id: u64,
    pub players: [Address; 2],
    pub total_rounds: u32,
    pub round: u32,
    pub phase: PokerPhase,
    pub committed: [bool; 2],
    pub revealed: [bool; 2],
    /// Remaining hand-value budget per seat
    pub budgets: [u64; 2],
    pub scores: [u32; 2],
    /// Outstanding bet waiting to be called or raised (0 when none)
    pub pending_bet: u64,
    /// Whose turn it is to act during a betting phase
    pub turn: Option<Address>,
    pub settled: bool,
}

impl PokerSnapshot {
    /// Seat index for the given participant, if they are in this game
    pub fn seat_of(&self, addr: &Address) -> Option<usize> {
        self.players.iter().position(|p| p == addr)
    }

    /// Is it this participant's turn to act?
    pub fn is_turn_of(&self, addr: &Address) -> bool {
        self.turn.as_ref() == Some(addr)
    }
}

/// Revealed hand values for one poker round
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PokerRoundView {
    pub hands: [Option<u8>; 2],
    pub revealed: [bool; 2],
}

/// Read-only projection of a sealed-bid auction's ledger state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    pub game_id: u64,
    pub players: [Address; 2],
    pub phase: AuctionPhase,
    pub committed: [bool; 2],
    pub revealed: [bool; 2],
    pub bids: [Option<u64>; 2],
    pub winner: Option<Address>,
    pub winning_bid: Option<u64>,
    pub settled: bool,
}

impl AuctionSnapshot {
    /// Seat index for the given participant, if they are in this game
    pub fn seat_of(&self, addr: &Address) -> Option<usize> {
        self.players.iter().position(|p| p == addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_byte_roundtrip() {
        for mv in [Move::Rock, Move::Paper, Move::Scissors] {
            assert_eq!(Move::from_byte(mv.to_byte()), Some(mv));
        }
        assert_eq!(Move::from_byte(0), None);
        assert_eq!(Move::from_byte(4), None);
    }

    #[test]
    fn test_move_parse() {
        assert_eq!(Move::parse("rock"), Some(Move::Rock));
        assert_eq!(Move::parse("Paper"), Some(Move::Paper));
        assert_eq!(Move::parse("SCISSORS"), Some(Move::Scissors));
        assert_eq!(Move::parse("lizard"), None);
    }

    #[test]
    fn test_address_display_and_parse() {
        let addr = Address::from_bytes([0xab; 20]);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_address_rejects_short_input() {
        assert!("0xabcd".parse::<Address>().is_err());
    }

    #[test]
    fn test_seat_of() {
        let a = Address::from_bytes([1; 20]);
        let b = Address::from_bytes([2; 20]);
        let snap = RpsSnapshot {
            game_id: 0,
            players: [a, b],
            total_rounds: 3,
            round: 0,
            phase: RpsPhase::Commit,
            committed: [false; 2],
            revealed: [false; 2],
            scores: [0; 2],
            settled: false,
        };
        assert_eq!(snap.seat_of(&a), Some(0));
        assert_eq!(snap.seat_of(&b), Some(1));
        assert_eq!(snap.seat_of(&Address::from_bytes([3; 20])), None);
    }

    #[test]
    fn test_poker_phase_ordering() {
        assert!(PokerPhase::FirstBetting.index() > PokerPhase::Commit.index());
        assert!(PokerPhase::Showdown.index() > PokerPhase::SecondBetting.index());
        assert!(PokerPhase::FirstBetting.is_betting());
        assert!(!PokerPhase::Showdown.is_betting());
    }
}
