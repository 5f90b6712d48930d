//! Wallpaper catalog and ball-spending unlock rules
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::data::CatalogError;
use crate::ledger::{KeyValueStore, LedgerError, LedgerPatch, LedgerSnapshot, RewardLedger};

const WALLPAPERS_JSON: &str = include_str!("../assets/data/wallpapers.json");

/// A single wallpaper that can be unlocked with balls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperItem {
    pub id: String,
    pub title: String,
    /// Bundled image file name
    pub asset: String,
    pub cost: u32,
}

/// Ordered wallpaper catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperCatalog {
    items: Vec<WallpaperItem>,
}

/// Reasons a purchase is rejected. Nothing is written when these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not enough balls: need {needed}, have {available}")]
    InsufficientFunds { needed: u32, available: u32 },
    #[error("unknown wallpaper '{0}'")]
    UnknownItem(String),
}

/// Result of a successful purchase decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Balance and unlocked set to persist together.
    Unlocked {
        balance: u32,
        unlocked: BTreeSet<String>,
    },
    /// The item was already owned; nothing changes.
    AlreadyUnlocked,
}

/// Catalog item annotated for the current ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfEntry<'a> {
    pub item: &'a WallpaperItem,
    pub unlocked: bool,
    pub affordable: bool,
}

/// What the wallpaper screen shows: balance plus every item's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperShelf<'a> {
    pub balance: u32,
    pub entries: Vec<ShelfEntry<'a>>,
}

impl WallpaperShelf<'_> {
    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.unlocked).count()
    }
}

/// A purchase that was rejected or could not be saved.
#[derive(Debug, Error)]
pub enum PurchaseError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Rejected(#[from] StoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError<E>),
}

impl WallpaperCatalog {
    /// Build a catalog, rejecting duplicate ids and free items.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is empty, has a duplicate id, or an item costs nothing.
    pub fn new(items: Vec<WallpaperItem>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty("wallpaper"));
        }
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
            if item.cost == 0 {
                return Err(CatalogError::ZeroCost(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// Load the catalog from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.items)
    }

    /// # Errors
    ///
    /// Returns an error if the embedded asset is malformed.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(WALLPAPERS_JSON)
    }

    #[must_use]
    pub fn find_item(&self, id: &str) -> Option<&WallpaperItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WallpaperItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every item with its unlocked/affordable flags for `snapshot`.
    #[must_use]
    pub fn shelf<'a>(&'a self, snapshot: &LedgerSnapshot) -> WallpaperShelf<'a> {
        let entries = self
            .items
            .iter()
            .map(|item| ShelfEntry {
                item,
                unlocked: snapshot.is_unlocked(&item.id),
                affordable: can_afford(item, snapshot.max_balls),
            })
            .collect();
        WallpaperShelf {
            balance: snapshot.max_balls,
            entries,
        }
    }
}

impl<'a> IntoIterator for &'a WallpaperCatalog {
    type Item = &'a WallpaperItem;
    type IntoIter = std::slice::Iter<'a, WallpaperItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[must_use]
pub const fn can_afford(item: &WallpaperItem, balance: u32) -> bool {
    balance >= item.cost
}

/// Decide a purchase against a ledger snapshot without touching storage.
///
/// # Errors
///
/// Returns [`StoreError::InsufficientFunds`] when the balance is below the cost.
pub fn purchase(
    item: &WallpaperItem,
    snapshot: &LedgerSnapshot,
) -> Result<PurchaseOutcome, StoreError> {
    if snapshot.is_unlocked(&item.id) {
        return Ok(PurchaseOutcome::AlreadyUnlocked);
    }
    if !can_afford(item, snapshot.max_balls) {
        return Err(StoreError::InsufficientFunds {
            needed: item.cost,
            available: snapshot.max_balls,
        });
    }
    let mut unlocked = snapshot.unlocked.clone();
    unlocked.insert(item.id.clone());
    Ok(PurchaseOutcome::Unlocked {
        balance: snapshot.max_balls - item.cost,
        unlocked,
    })
}

impl<S: KeyValueStore> RewardLedger<S> {
    /// Persist a purchase. Balance and unlocked set go out in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn apply_purchase(&self, outcome: &PurchaseOutcome) -> Result<(), LedgerError<S::Error>> {
        match outcome {
            PurchaseOutcome::Unlocked { balance, unlocked } => {
                self.write(
                    &LedgerPatch::new()
                        .max_balls(*balance)
                        .unlocked(unlocked.clone()),
                )?;
                info!("purchase committed, balance now {balance}");
                Ok(())
            }
            PurchaseOutcome::AlreadyUnlocked => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{KEY_MAX_BALLS, KEY_UNLOCKED};
    use crate::ledger::MemoryStore;

    fn item(id: &str, cost: u32) -> WallpaperItem {
        WallpaperItem {
            id: id.to_string(),
            title: id.to_string(),
            asset: format!("wall_{id}.png"),
            cost,
        }
    }

    fn snapshot(balls: u32, unlocked: &[&str]) -> LedgerSnapshot {
        LedgerSnapshot {
            max_balls: balls,
            unlocked: unlocked.iter().map(|s| (*s).to_string()).collect(),
            ..LedgerSnapshot::default()
        }
    }

    #[test]
    fn insufficient_funds_leaves_ledger_unchanged() {
        let snap = snapshot(2, &[]);
        let err = purchase(&item("calm", 3), &snap).unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientFunds {
                needed: 3,
                available: 2
            }
        );
        assert_eq!(snap, snapshot(2, &[]));
    }

    #[test]
    fn affordable_purchase_spends_and_unlocks() {
        let outcome = purchase(&item("calm", 3), &snapshot(5, &["flow"])).unwrap();
        let PurchaseOutcome::Unlocked { balance, unlocked } = outcome else {
            panic!("expected unlock");
        };
        assert_eq!(balance, 2);
        assert!(unlocked.contains("calm"));
        assert!(unlocked.contains("flow"));
    }

    #[test]
    fn exact_balance_is_enough() {
        let outcome = purchase(&item("calm", 3), &snapshot(3, &[])).unwrap();
        assert!(matches!(outcome, PurchaseOutcome::Unlocked { balance: 0, .. }));
    }

    #[test]
    fn repeat_purchase_is_idempotent() {
        let snap = snapshot(1, &["calm"]);
        let outcome = purchase(&item("calm", 3), &snap).unwrap();
        assert_eq!(outcome, PurchaseOutcome::AlreadyUnlocked);

        let ledger = RewardLedger::new(MemoryStore::with_entries([(KEY_MAX_BALLS, "1")]));
        ledger.apply_purchase(&outcome).unwrap();
        assert_eq!(ledger.store().raw(KEY_MAX_BALLS).as_deref(), Some("1"));
        assert_eq!(ledger.store().raw(KEY_UNLOCKED), None);
    }

    #[test]
    fn apply_purchase_writes_both_fields() {
        let ledger = RewardLedger::new(MemoryStore::with_entries([(KEY_MAX_BALLS, "7")]));
        let outcome = purchase(&item("quick", 3), &ledger.read()).unwrap();
        ledger.apply_purchase(&outcome).unwrap();
        let after = ledger.read();
        assert_eq!(after.max_balls, 4);
        assert!(after.is_unlocked("quick"));
    }

    #[test]
    fn static_catalog_has_six_wallpapers() {
        let catalog = WallpaperCatalog::load_from_static().unwrap();
        assert_eq!(catalog.len(), 6);
        assert!(catalog.iter().all(|w| w.cost == 3));
        assert_eq!(catalog.find_item("moment").unwrap().title, "The Moment");
        assert!(catalog.find_item("missing").is_none());
    }

    #[test]
    fn catalog_rejects_duplicates_and_free_items() {
        let err = WallpaperCatalog::new(vec![item("a", 1), item("a", 2)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "a"));
        let err = WallpaperCatalog::new(vec![item("free", 0)]).unwrap_err();
        assert!(matches!(err, CatalogError::ZeroCost(id) if id == "free"));
    }

    #[test]
    fn shelf_flags_follow_snapshot() {
        let catalog = WallpaperCatalog::new(vec![item("a", 2), item("b", 5)]).unwrap();
        let shelf = catalog.shelf(&snapshot(3, &["b"]));
        assert_eq!(shelf.balance, 3);
        assert!(!shelf.entries[0].unlocked && shelf.entries[0].affordable);
        assert!(shelf.entries[1].unlocked && !shelf.entries[1].affordable);
        assert_eq!(shelf.unlocked_count(), 1);
    }
}
