//! Persisted daemon state, one JSON file per collection.
//!
//! The contract is whole-collection overwrite: every `save_*` replaces
//! the entire collection, there is no merge and no storage-level locking.
//! Callers must re-read a collection immediately before mutating it within
//! the same logical operation; the scheduler's single-flight guard is what
//! keeps that safe.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use relwatch_core::ledger::SeenLedger;
use relwatch_core::types::{Credentials, CycleState, TrackedItem};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state io error: {0}")]
    Io(#[from] io::Error),

    #[error("state decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// Whole-collection get/set for the daemon's persisted state.
///
/// A failed save must be surfaced, never swallowed: the scheduler treats
/// it as fatal for the tick rather than proceeding with an inconsistent
/// in-memory/persisted split.
pub trait StateStore: Send {
    fn load_items(&self) -> Result<Vec<TrackedItem>, StoreError>;
    fn save_items(&mut self, items: &[TrackedItem]) -> Result<(), StoreError>;

    fn load_ledger(&self) -> Result<SeenLedger, StoreError>;
    fn save_ledger(&mut self, ledger: &SeenLedger) -> Result<(), StoreError>;

    fn load_cycle(&self) -> Result<CycleState, StoreError>;
    fn save_cycle(&mut self, cycle: &CycleState) -> Result<(), StoreError>;

    fn load_last_check(&self) -> Result<Option<DateTime<Utc>>, StoreError>;
    fn save_last_check(&mut self, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn load_credentials(&self) -> Result<Option<Credentials>, StoreError>;
    fn save_credentials(&mut self, creds: &Credentials) -> Result<(), StoreError>;
}

// ─── JSON file store ──────────────────────────────────────────────

const ITEMS_FILE: &str = "watchlist.json";
const LEDGER_FILE: &str = "ledger.json";
const CYCLE_FILE: &str = "cycle.json";
const LAST_CHECK_FILE: &str = "last_check.json";
const CREDENTIALS_FILE: &str = "credentials.json";

/// File-per-collection store under a state directory.
///
/// A missing file reads as the collection's default; the directory is
/// created on first write.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.dir.join(file), json)?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    fn load_items(&self) -> Result<Vec<TrackedItem>, StoreError> {
        Ok(self.read(ITEMS_FILE)?.unwrap_or_default())
    }

    fn save_items(&mut self, items: &[TrackedItem]) -> Result<(), StoreError> {
        self.write(ITEMS_FILE, &items)
    }

    fn load_ledger(&self) -> Result<SeenLedger, StoreError> {
        Ok(self.read(LEDGER_FILE)?.unwrap_or_default())
    }

    fn save_ledger(&mut self, ledger: &SeenLedger) -> Result<(), StoreError> {
        self.write(LEDGER_FILE, ledger)
    }

    fn load_cycle(&self) -> Result<CycleState, StoreError> {
        Ok(self.read(CYCLE_FILE)?.unwrap_or_default())
    }

    fn save_cycle(&mut self, cycle: &CycleState) -> Result<(), StoreError> {
        self.write(CYCLE_FILE, cycle)
    }

    fn load_last_check(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.read(LAST_CHECK_FILE)
    }

    fn save_last_check(&mut self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.write(LAST_CHECK_FILE, &at)
    }

    fn load_credentials(&self) -> Result<Option<Credentials>, StoreError> {
        self.read(CREDENTIALS_FILE)
    }

    fn save_credentials(&mut self, creds: &Credentials) -> Result<(), StoreError> {
        self.write(CREDENTIALS_FILE, creds)
    }
}

// ─── In-memory store ──────────────────────────────────────────────

/// In-memory store for tests and dry runs.
///
/// `fail_writes` turns every save into an error, for exercising the
/// persistence-failure path; `ledger_writes` counts ledger saves so tests
/// can assert the unchanged-ledger skip.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub items: Vec<TrackedItem>,
    pub ledger: SeenLedger,
    pub cycle: CycleState,
    pub last_check: Option<DateTime<Utc>>,
    pub credentials: Option<Credentials>,
    pub fail_writes: bool,
    pub ledger_writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("write failure injected".to_owned()));
        }
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn load_items(&self) -> Result<Vec<TrackedItem>, StoreError> {
        Ok(self.items.clone())
    }

    fn save_items(&mut self, items: &[TrackedItem]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.items = items.to_vec();
        Ok(())
    }

    fn load_ledger(&self) -> Result<SeenLedger, StoreError> {
        Ok(self.ledger.clone())
    }

    fn save_ledger(&mut self, ledger: &SeenLedger) -> Result<(), StoreError> {
        self.check_writable()?;
        self.ledger = ledger.clone();
        self.ledger_writes += 1;
        Ok(())
    }

    fn load_cycle(&self) -> Result<CycleState, StoreError> {
        Ok(self.cycle.clone())
    }

    fn save_cycle(&mut self, cycle: &CycleState) -> Result<(), StoreError> {
        self.check_writable()?;
        self.cycle = cycle.clone();
        Ok(())
    }

    fn load_last_check(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.last_check)
    }

    fn save_last_check(&mut self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_writable()?;
        self.last_check = Some(at);
        Ok(())
    }

    fn load_credentials(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self.credentials.clone())
    }

    fn save_credentials(&mut self, creds: &Credentials) -> Result<(), StoreError> {
        self.check_writable()?;
        self.credentials = Some(creds.clone());
        Ok(())
    }
}
