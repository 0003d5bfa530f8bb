//! Watchlist mutations: add, remove, rename, strict toggle.
//!
//! Each operation is a read-modify-write against the whole-collection
//! store and must run under the daemon's single-flight guard; there is
//! no storage-level locking to save it from a concurrent writer. Remove
//! and rename also purge the item's ledger bucket so a re-added name
//! starts with a clean history.

use chrono::{DateTime, Utc};
use tracing::info;

use relwatch_core::types::{TrackedItem, item_key};

use crate::store::{StateStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// An item with the same case-insensitive key already exists.
    Duplicate,
    /// Empty (after trimming) names are rejected.
    InvalidName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    NotFound,
    /// The new name collides with a different existing item.
    Duplicate,
    InvalidName,
}

/// Add a new item. Rejects case-insensitive duplicates.
pub fn add<S: StateStore>(
    store: &mut S,
    name: &str,
    strict: bool,
    now: DateTime<Utc>,
) -> Result<AddOutcome, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(AddOutcome::InvalidName);
    }

    let key = item_key(name);
    let mut items = store.load_items()?;
    if items.iter().any(|item| item.key() == key) {
        return Ok(AddOutcome::Duplicate);
    }

    items.push(TrackedItem::new(name, now, strict));
    store.save_items(&items)?;
    info!(item = name, strict, "watchlist item added");
    Ok(AddOutcome::Added)
}

/// Remove an item and purge its ledger bucket. Returns `true` if found.
pub fn remove<S: StateStore>(store: &mut S, name: &str) -> Result<bool, StoreError> {
    let key = item_key(name.trim());
    let mut items = store.load_items()?;
    let before = items.len();
    items.retain(|item| item.key() != key);
    if items.len() == before {
        return Ok(false);
    }
    store.save_items(&items)?;

    let mut ledger = store.load_ledger()?;
    if ledger.remove_bucket(&key) {
        store.save_ledger(&ledger)?;
    }
    info!(item = name, "watchlist item removed");
    Ok(true)
}

/// Rename an item. The old ledger bucket is purged: the renamed item is
/// a fresh identity and re-notifies from scratch.
pub fn rename<S: StateStore>(
    store: &mut S,
    old_name: &str,
    new_name: &str,
) -> Result<RenameOutcome, StoreError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Ok(RenameOutcome::InvalidName);
    }

    let old_key = item_key(old_name.trim());
    let new_key = item_key(new_name);
    let mut items = store.load_items()?;

    if !items.iter().any(|item| item.key() == old_key) {
        return Ok(RenameOutcome::NotFound);
    }
    if new_key != old_key && items.iter().any(|item| item.key() == new_key) {
        return Ok(RenameOutcome::Duplicate);
    }

    for item in &mut items {
        if item.key() == old_key {
            item.name = new_name.to_owned();
        }
    }
    store.save_items(&items)?;

    let mut ledger = store.load_ledger()?;
    if ledger.remove_bucket(&old_key) {
        store.save_ledger(&ledger)?;
    }
    info!(from = old_name, to = new_name, "watchlist item renamed");
    Ok(RenameOutcome::Renamed)
}

/// Set an item's strict flag. Returns `true` if found.
pub fn set_strict<S: StateStore>(
    store: &mut S,
    name: &str,
    strict: bool,
) -> Result<bool, StoreError> {
    let key = item_key(name.trim());
    let mut items = store.load_items()?;
    let mut found = false;
    for item in &mut items {
        if item.key() == key {
            item.strict = strict;
            found = true;
        }
    }
    if found {
        store.save_items(&items)?;
        info!(item = name, strict, "strict flag updated");
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use relwatch_core::ledger::SeenLedger;

    fn store_with(names: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.items = names
            .iter()
            .map(|n| TrackedItem::new(*n, Utc::now(), false))
            .collect();
        store
    }

    #[test]
    fn add_then_listed() {
        let mut store = MemoryStore::new();
        let outcome = add(&mut store, "The Wire", false, Utc::now()).expect("add");
        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(store.items.len(), 1);
        assert_eq!(store.items[0].name, "The Wire");
    }

    #[test]
    fn add_trims_whitespace() {
        let mut store = MemoryStore::new();
        add(&mut store, "  Dark  ", true, Utc::now()).expect("add");
        assert_eq!(store.items[0].name, "Dark");
        assert!(store.items[0].strict);
    }

    #[test]
    fn add_rejects_case_insensitive_duplicate() {
        let mut store = store_with(&["The Wire"]);
        let outcome = add(&mut store, "THE WIRE", false, Utc::now()).expect("add");
        assert_eq!(outcome, AddOutcome::Duplicate);
        assert_eq!(store.items.len(), 1);
    }

    #[test]
    fn add_rejects_empty_name() {
        let mut store = MemoryStore::new();
        assert_eq!(
            add(&mut store, "   ", false, Utc::now()).expect("add"),
            AddOutcome::InvalidName
        );
        assert!(store.items.is_empty());
    }

    #[test]
    fn remove_purges_ledger_bucket() {
        let mut store = store_with(&["The Wire", "Dark"]);
        let mut ledger = SeenLedger::new();
        ledger.merge("the wire", ["42"], Utc::now());
        store.ledger = ledger;

        assert!(remove(&mut store, "the WIRE").expect("remove"));
        assert_eq!(store.items.len(), 1);
        assert!(!store.ledger.has_matches("the wire"));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut store = store_with(&["Dark"]);
        assert!(!remove(&mut store, "Lost").expect("remove"));
        assert_eq!(store.items.len(), 1);
    }

    #[test]
    fn rename_purges_old_bucket() {
        let mut store = store_with(&["The Wire"]);
        let mut ledger = SeenLedger::new();
        ledger.merge("the wire", ["42"], Utc::now());
        store.ledger = ledger;

        let outcome = rename(&mut store, "The Wire", "The Wire UK").expect("rename");
        assert_eq!(outcome, RenameOutcome::Renamed);
        assert_eq!(store.items[0].name, "The Wire UK");
        assert!(!store.ledger.has_matches("the wire"));
    }

    #[test]
    fn rename_unknown_is_not_found() {
        let mut store = store_with(&["Dark"]);
        assert_eq!(
            rename(&mut store, "Lost", "Found").expect("rename"),
            RenameOutcome::NotFound
        );
    }

    #[test]
    fn rename_to_existing_item_is_duplicate() {
        let mut store = store_with(&["Dark", "Lost"]);
        assert_eq!(
            rename(&mut store, "Dark", "LOST").expect("rename"),
            RenameOutcome::Duplicate
        );
        assert_eq!(store.items[0].name, "Dark");
    }

    #[test]
    fn rename_case_only_keeps_identity_but_purges_history() {
        let mut store = store_with(&["the wire"]);
        let mut ledger = SeenLedger::new();
        ledger.merge("the wire", ["42"], Utc::now());
        store.ledger = ledger;

        let outcome = rename(&mut store, "the wire", "The Wire").expect("rename");
        assert_eq!(outcome, RenameOutcome::Renamed);
        assert_eq!(store.items[0].name, "The Wire");
        assert!(!store.ledger.has_matches("the wire"));
    }

    #[test]
    fn set_strict_toggles() {
        let mut store = store_with(&["Dark"]);
        assert!(set_strict(&mut store, "dark", true).expect("set"));
        assert!(store.items[0].strict);
        assert!(set_strict(&mut store, "DARK", false).expect("set"));
        assert!(!store.items[0].strict);
    }

    #[test]
    fn set_strict_unknown_is_false() {
        let mut store = store_with(&["Dark"]);
        assert!(!set_strict(&mut store, "Lost", true).expect("set"));
    }
}
