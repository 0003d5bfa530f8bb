//! Seen-release ledger: per-item record of already-observed release ids.
//!
//! Pure, testable state with no IO. Entries are append-only: an id's
//! first-seen timestamp is never rewritten, and an id stays recorded even
//! if the tracker stops returning it. That is what makes notifications
//! at-most-once per release, permanently.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mapping from item key to `release id → first-seen timestamp`.
///
/// BTreeMap keeps the persisted JSON stable across runs. Buckets are
/// removed wholesale when their owning item is removed, renamed, or
/// expired; individual entries are never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenLedger {
    buckets: BTreeMap<String, BTreeMap<String, DateTime<Utc>>>,
}

impl SeenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the given release ids under `item_key`, returning the ids
    /// that were not already present (the notification trigger set).
    ///
    /// Already-seen ids are ignored and keep their original first-seen
    /// timestamp.
    pub fn merge<'a, I>(&mut self, item_key: &str, ids: I, now: DateTime<Utc>) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let bucket = self.buckets.entry(item_key.to_owned()).or_default();
        let mut fresh = BTreeSet::new();
        for id in ids {
            if !bucket.contains_key(id) {
                bucket.insert(id.to_owned(), now);
                fresh.insert(id.to_owned());
            }
        }
        fresh
    }

    /// True when the item has at least one recorded release.
    pub fn has_matches(&self, item_key: &str) -> bool {
        self.buckets.get(item_key).is_some_and(|b| !b.is_empty())
    }

    /// Number of recorded releases for the item.
    pub fn seen_count(&self, item_key: &str) -> usize {
        self.buckets.get(item_key).map_or(0, BTreeMap::len)
    }

    /// Most recent first-seen timestamp in the item's bucket, if any.
    pub fn latest_seen(&self, item_key: &str) -> Option<DateTime<Utc>> {
        self.buckets
            .get(item_key)?
            .values()
            .max()
            .copied()
    }

    /// Drop the item's bucket. Returns `true` if a bucket existed.
    pub fn remove_bucket(&mut self, item_key: &str) -> bool {
        self.buckets.remove(item_key).is_some()
    }

    /// Drop buckets whose key is not in `live_keys`.
    ///
    /// Orphaned buckets can appear when a watchlist write lands but the
    /// paired ledger write fails; the next sweep removes them. Returns
    /// the number of buckets dropped.
    pub fn retain_buckets<'a, I>(&mut self, live_keys: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: BTreeSet<&str> = live_keys.into_iter().collect();
        let before = self.buckets.len();
        self.buckets.retain(|key, _| live.contains(key.as_str()));
        before - self.buckets.len()
    }

    /// Number of buckets (items with at least one recorded release, plus
    /// any empty buckets created by merges that added nothing).
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    #[test]
    fn merge_returns_only_new_ids() {
        let mut ledger = SeenLedger::new();
        let fresh = ledger.merge("the wire", ["100", "101"], ts(1000));
        assert_eq!(fresh.len(), 2);

        let fresh = ledger.merge("the wire", ["101", "102"], ts(2000));
        assert_eq!(fresh.len(), 1);
        assert!(fresh.contains("102"));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut ledger = SeenLedger::new();
        ledger.merge("dark", ["7"], ts(1000));
        let fresh = ledger.merge("dark", ["7"], ts(5000));
        assert!(fresh.is_empty(), "re-merging the same id adds nothing");
    }

    #[test]
    fn first_seen_timestamp_is_never_rewritten() {
        let mut ledger = SeenLedger::new();
        ledger.merge("dark", ["7"], ts(1000));
        ledger.merge("dark", ["7"], ts(9000));
        assert_eq!(ledger.latest_seen("dark"), Some(ts(1000)));
    }

    #[test]
    fn id_reappearing_after_removal_from_source_stays_seen() {
        // The source dropping and re-listing an id must not re-notify:
        // the ledger never forgets within a bucket's lifetime.
        let mut ledger = SeenLedger::new();
        ledger.merge("dark", ["7"], ts(1000));
        ledger.merge("dark", ["8"], ts(2000));
        let fresh = ledger.merge("dark", ["7"], ts(3000));
        assert!(fresh.is_empty());
    }

    #[test]
    fn latest_seen_is_bucket_maximum() {
        let mut ledger = SeenLedger::new();
        ledger.merge("dark", ["1"], ts(1000));
        ledger.merge("dark", ["2"], ts(3000));
        ledger.merge("dark", ["3"], ts(2000));
        assert_eq!(ledger.latest_seen("dark"), Some(ts(3000)));
    }

    #[test]
    fn latest_seen_none_without_bucket() {
        let ledger = SeenLedger::new();
        assert_eq!(ledger.latest_seen("ghost"), None);
        assert!(!ledger.has_matches("ghost"));
        assert_eq!(ledger.seen_count("ghost"), 0);
    }

    #[test]
    fn remove_bucket_drops_all_entries() {
        let mut ledger = SeenLedger::new();
        ledger.merge("dark", ["1", "2"], ts(1000));
        assert!(ledger.remove_bucket("dark"));
        assert!(!ledger.has_matches("dark"));
        assert!(!ledger.remove_bucket("dark"), "second removal is a no-op");
    }

    #[test]
    fn retain_buckets_sweeps_orphans() {
        let mut ledger = SeenLedger::new();
        ledger.merge("kept", ["1"], ts(1000));
        ledger.merge("orphan-a", ["2"], ts(1000));
        ledger.merge("orphan-b", ["3"], ts(1000));

        let dropped = ledger.retain_buckets(["kept"]);
        assert_eq!(dropped, 2);
        assert!(ledger.has_matches("kept"));
        assert!(!ledger.has_matches("orphan-a"));
    }

    #[test]
    fn serde_shape_is_nested_maps() {
        let mut ledger = SeenLedger::new();
        ledger.merge("dark", ["7"], ts(1000));
        let json = serde_json::to_value(&ledger).expect("serialize");
        assert!(json["dark"]["7"].is_string(), "got: {json}");

        let restored: SeenLedger = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, ledger);
    }
}
