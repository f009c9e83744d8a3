//! Durable commitment store.
//!
//! Holds the salt and committed plaintext between commit and reveal. The
//! record is the single source of truth for a reveal: it is written on
//! the first commit attempt for its key and deleted only after the reveal
//! call has been confirmed. The file-backed store survives process
//! restarts so a crashed client can still reveal.

use arena_ledger::{GameKind, Move, Salt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

/// Canonical key schema: one record per (kind, game, round, participant).
/// No duplicate fallback keys exist; this key is authoritative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentKey {
    pub kind: GameKind,
    pub game_id: u64,
    pub round: u32,
    pub participant: arena_ledger::Address,
}

impl fmt::Display for CommitmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.kind, self.game_id, self.round, self.participant
        )
    }
}

/// The value a commitment binds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommittedValue {
    Move(Move),
    Hand(u8),
    Bid(u64),
}

impl CommittedValue {
    /// Bytes hashed into the commitment
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            CommittedValue::Move(mv) => vec![mv.to_byte()],
            CommittedValue::Hand(h) => vec![*h],
            CommittedValue::Bid(b) => b.to_be_bytes().to_vec(),
        }
    }
}

/// Persisted salt + plaintext for one pending commitment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub salt: Salt,
    pub value: CommittedValue,
    pub created_at: SystemTime,
}

impl CommitmentRecord {
    /// Create a record with a fresh random salt
    pub fn new(value: CommittedValue) -> Self {
        Self {
            salt: Salt::random(),
            value,
            created_at: SystemTime::now(),
        }
    }
}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt commitment record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable key→record mapping for pending commitments
pub trait CommitmentStore: Send + Sync {
    /// Write-or-overwrite; idempotent for identical records
    fn save(&self, key: &CommitmentKey, record: &CommitmentRecord) -> Result<(), StoreError>;

    fn load(&self, key: &CommitmentKey) -> Result<Option<CommitmentRecord>, StoreError>;

    /// Called only after a reveal call has been confirmed
    fn delete(&self, key: &CommitmentKey) -> Result<(), StoreError>;
}

/// File-backed store: one JSON file per key, written atomically via a
/// temp file and rename so a crash mid-write cannot corrupt a record.
pub struct FileCommitmentStore {
    dir: PathBuf,
}

impl FileCommitmentStore {
    /// Open (creating if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &CommitmentKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CommitmentStore for FileCommitmentStore {
    fn save(&self, key: &CommitmentKey, record: &CommitmentRecord) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, key: &CommitmentKey) -> Result<Option<CommitmentRecord>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &CommitmentKey) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryCommitmentStore {
    records: std::sync::Mutex<std::collections::HashMap<CommitmentKey, CommitmentRecord>>,
}

impl MemoryCommitmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommitmentStore for MemoryCommitmentStore {
    fn save(&self, key: &CommitmentKey, record: &CommitmentRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().insert(*key, record.clone());
        Ok(())
    }

    fn load(&self, key: &CommitmentKey) -> Result<Option<CommitmentRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &CommitmentKey) -> Result<(), StoreError> {
        self.records.lock().unwrap().remove(key);
        Ok(())
    }
}
