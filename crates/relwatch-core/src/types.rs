use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Identity ─────────────────────────────────────────────────────

/// Canonical identity key for a tracked item.
///
/// Item identity is the lowercased name: `"The Wire"` and `"the wire"`
/// are the same entry. Ledger buckets are keyed by this value, and the
/// watchlist rejects case-insensitive duplicates.
pub fn item_key(name: &str) -> String {
    name.to_lowercase()
}

// ─── Tracked Item ─────────────────────────────────────────────────

/// A watched series name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Display name, also the search query sent to the tracker.
    pub name: String,
    /// When the user added this item.
    pub added_at: DateTime<Utc>,
    /// Season packs only: drop episode-level releases before dedup.
    #[serde(default)]
    pub strict: bool,
}

impl TrackedItem {
    pub fn new(name: impl Into<String>, added_at: DateTime<Utc>, strict: bool) -> Self {
        Self {
            name: name.into(),
            added_at,
            strict,
        }
    }

    /// Canonical identity key for this item.
    pub fn key(&self) -> String {
        item_key(&self.name)
    }
}

// ─── Release ──────────────────────────────────────────────────────

/// A single search result from the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Tracker-assigned release id; the dedup key within an item's bucket.
    pub id: String,
    /// Release title as listed on the tracker.
    pub title: String,
    pub download_link: String,
    /// Upload date as reported by the API. Informational; kept verbatim.
    pub published_at: String,
}

// ─── Credentials ──────────────────────────────────────────────────

/// API credentials for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub passkey: String,
}

// ─── Cycle State ──────────────────────────────────────────────────

/// Poll-cycle position, owned exclusively by the scheduler.
///
/// `cursor == 0` with `now < next_cycle_at` means the scheduler is idle
/// between cycles. Any other cursor value points at the next watchlist
/// index to poll; a cursor at or past the list length (the list shrank)
/// is clamped to 0 before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    pub cursor: usize,
    pub next_cycle_at: DateTime<Utc>,
}

impl Default for CycleState {
    /// Epoch `next_cycle_at` so a fresh install starts polling immediately.
    fn default() -> Self {
        Self {
            cursor: 0,
            next_cycle_at: DateTime::UNIX_EPOCH,
        }
    }
}

// ─── Tick Outcome ─────────────────────────────────────────────────

/// What a scheduler tick actually did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// No stored credentials and discovery failed; nothing was queried.
    NoCredentials,
    /// Between cycles; nothing was queried, no state mutated.
    Idle,
    /// The watchlist is empty (possibly after expiry ran).
    EmptyWatchlist,
    /// A batch (or a full poll) was processed.
    Completed {
        /// Items queried this round.
        polled: usize,
        /// Newly observed releases merged into the ledger.
        fresh: usize,
        /// The cursor wrapped: the cycle is complete and re-anchored.
        cycle_completed: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_key_lowercases() {
        assert_eq!(item_key("The Wire"), "the wire");
        assert_eq!(item_key("the wire"), "the wire");
        assert_eq!(item_key("BREAKING BAD"), "breaking bad");
    }

    #[test]
    fn tracked_item_key_matches_free_fn() {
        let item = TrackedItem::new("Dark Matter", Utc::now(), false);
        assert_eq!(item.key(), item_key("dark matter"));
    }

    #[test]
    fn cycle_state_default_is_due_immediately() {
        let cycle = CycleState::default();
        assert_eq!(cycle.cursor, 0);
        assert!(cycle.next_cycle_at <= Utc::now());
    }

    #[test]
    fn tracked_item_serde_round_trip() {
        let item = TrackedItem::new("Severance", Utc::now(), true);
        let json = serde_json::to_string(&item).expect("serialize");
        let restored: TrackedItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, item);
    }

    #[test]
    fn tracked_item_strict_defaults_false() {
        // Entries persisted before the strict flag existed must still load.
        let restored: TrackedItem =
            serde_json::from_str(r#"{"name":"Lost","added_at":"2026-01-01T00:00:00Z"}"#)
                .expect("deserialize");
        assert!(!restored.strict);
    }

    #[test]
    fn tick_outcome_serde_tags() {
        let json = serde_json::to_value(TickOutcome::Completed {
            polled: 3,
            fresh: 1,
            cycle_completed: false,
        })
        .expect("serialize");
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["polled"], 3);
    }
}
