//! Persisted reward ledger on top of a string key-value store.
//!
//! Every component reads and writes classification, score, balance and
//! unlocks through [`RewardLedger`]. Reads never fail: missing or malformed
//! values fall back to zero / empty / absent. Writes report failures to the
//! caller and are logged here.
//!
//! There is no cross-component lock. Each read-modify-write runs as one step
//! of its caller's control flow; two hosts sharing one store can still race.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use thiserror::Error;

use crate::classification::Classification;
use crate::constants::{
    KEY_CLASSIFICATION, KEY_LAST_SCORE, KEY_MAX_BALLS, KEY_UNLOCKED, MAX_BALLS_ALIASES,
};

/// Errors raised by key-value store implementations.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for abstracting device key-value persistence.
/// Platform-specific implementations should provide this.
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read a value, `None` when the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write a single value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Write several values as one unit. Stores that can persist a batch
    /// atomically should override this.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), Self::Error> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store, shared between clones. Used by tests and previews.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    read_only: Rc<RefCell<bool>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from raw key/value pairs.
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::default();
        store.values.borrow_mut().extend(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        store
    }

    /// Make subsequent writes fail, simulating a full or revoked store.
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.borrow_mut() = read_only;
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = KvError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.set_many(&[(key, value.to_string())])
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), Self::Error> {
        if *self.read_only.borrow() {
            return Err(KvError::Unavailable("store is read-only".to_string()));
        }
        let mut values = self.values.borrow_mut();
        for (key, value) in entries {
            values.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

/// Point-in-time view of every ledger field, defaults applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub classification: Option<Classification>,
    pub last_score: u32,
    pub max_balls: u32,
    pub unlocked: BTreeSet<String>,
}

impl LedgerSnapshot {
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }
}

/// Partial ledger write. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerPatch {
    pub classification: Option<Classification>,
    pub last_score: Option<u32>,
    pub max_balls: Option<u32>,
    pub unlocked: Option<BTreeSet<String>>,
}

impl LedgerPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn classification(mut self, value: Classification) -> Self {
        self.classification = Some(value);
        self
    }

    #[must_use]
    pub const fn last_score(mut self, value: u32) -> Self {
        self.last_score = Some(value);
        self
    }

    #[must_use]
    pub const fn max_balls(mut self, value: u32) -> Self {
        self.max_balls = Some(value);
        self
    }

    #[must_use]
    pub fn unlocked(mut self, value: BTreeSet<String>) -> Self {
        self.unlocked = Some(value);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classification.is_none()
            && self.last_score.is_none()
            && self.max_balls.is_none()
            && self.unlocked.is_none()
    }

    fn entries(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let mut entries = Vec::with_capacity(4);
        if let Some(class) = self.classification {
            entries.push((KEY_CLASSIFICATION, class.as_str().to_string()));
        }
        if let Some(score) = self.last_score {
            entries.push((KEY_LAST_SCORE, score.to_string()));
        }
        if let Some(balls) = self.max_balls {
            entries.push((KEY_MAX_BALLS, balls.to_string()));
        }
        if let Some(unlocked) = &self.unlocked {
            let list: Vec<&String> = unlocked.iter().collect();
            entries.push((KEY_UNLOCKED, serde_json::to_string(&list)?));
        }
        Ok(entries)
    }
}

/// Stored balance as found in the store, before defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredBalls {
    Absent,
    Valid(u32),
    Invalid,
}

impl StoredBalls {
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Valid(n) => n,
            Self::Absent | Self::Invalid => 0,
        }
    }
}

/// Errors surfaced by ledger writes.
#[derive(Debug, Error)]
pub enum LedgerError<E: std::error::Error + 'static> {
    #[error("ledger write failed: {0}")]
    Store(#[source] E),
    #[error("ledger value could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Typed access to the persisted ledger.
#[derive(Debug, Clone)]
pub struct RewardLedger<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> RewardLedger<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Read every field, substituting defaults for missing or invalid values.
    pub fn read(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            classification: self.read_classification(),
            last_score: self.read_last_score(),
            max_balls: self.read_max_balls(),
            unlocked: self.read_unlocked(),
        }
    }

    pub fn read_classification(&self) -> Option<Classification> {
        let raw = self.get_or_none(KEY_CLASSIFICATION)?;
        let parsed = Classification::parse_stored(&raw);
        if parsed.is_none() {
            warn!("ignoring unrecognized classification {raw:?}");
        }
        parsed
    }

    pub fn read_last_score(&self) -> u32 {
        match self.get_or_none(KEY_LAST_SCORE) {
            Some(raw) => parse_count(&raw).unwrap_or_else(|| {
                warn!("ignoring invalid last score {raw:?}");
                0
            }),
            None => 0,
        }
    }

    /// Balance after alias probing, zero when missing or invalid.
    pub fn read_max_balls(&self) -> u32 {
        self.stored_max_balls().value()
    }

    /// Probe the balance aliases in order; the first key present decides.
    pub fn stored_max_balls(&self) -> StoredBalls {
        for key in MAX_BALLS_ALIASES {
            if let Some(raw) = self.get_or_none(key) {
                return match parse_count(&raw) {
                    Some(n) => {
                        if key != KEY_MAX_BALLS {
                            debug!("balance read from legacy key {key}");
                        }
                        StoredBalls::Valid(n)
                    }
                    None => {
                        warn!("ignoring invalid balance {raw:?} under {key}");
                        StoredBalls::Invalid
                    }
                };
            }
        }
        StoredBalls::Absent
    }

    pub fn read_unlocked(&self) -> BTreeSet<String> {
        let Some(raw) = self.get_or_none(KEY_UNLOCKED) else {
            return BTreeSet::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                warn!("ignoring unreadable unlocked set: {err}");
                BTreeSet::new()
            }
        }
    }

    /// Write the fields present in `patch` as one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the store rejects it.
    /// Failures are logged before they are returned.
    pub fn write(&self, patch: &LedgerPatch) -> Result<(), LedgerError<S::Error>> {
        if patch.is_empty() {
            return Ok(());
        }
        let entries = patch.entries()?;
        debug!(
            "ledger write: {}",
            entries
                .iter()
                .map(|(k, _)| *k)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.store.set_many(&entries).map_err(|err| {
            warn!("ledger write failed: {err}");
            LedgerError::Store(err)
        })
    }

    /// Read-modify-write increment of the balance. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated balance cannot be written.
    pub fn add_balls(&self, amount: u32) -> Result<u32, LedgerError<S::Error>> {
        let next = self.read_max_balls().saturating_add(amount);
        self.write(&LedgerPatch::new().max_balls(next))?;
        Ok(next)
    }

    fn get_or_none(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("reading {key} failed, using default: {err}");
                None
            }
        }
    }
}

/// Parse a non-negative whole count. Integral floats such as `"4.0"` are
/// accepted since older builds stored numbers through a float conversion.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}
