//! TTL expiry: retire items whose newest recorded release is too old.

use chrono::{DateTime, Duration, Utc};

use crate::ledger::SeenLedger;
use crate::types::TrackedItem;

/// Retires watchlist items that have produced no fresh release within the
/// retention window.
///
/// An item with no ledger entries is never expired by this rule: a series
/// that simply never matched anything is not penalized for it.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    ttl: Duration,
}

impl ExpiryPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Names of items due for removal: their bucket's newest first-seen
    /// timestamp is strictly older than `ttl` relative to `now`.
    pub fn run(&self, items: &[TrackedItem], ledger: &SeenLedger, now: DateTime<Utc>) -> Vec<String> {
        items
            .iter()
            .filter(|item| {
                ledger
                    .latest_seen(&item.key())
                    .is_some_and(|latest| now - latest > self.ttl)
            })
            .map(|item| item.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    fn item(name: &str) -> TrackedItem {
        TrackedItem::new(name, ts(0), false)
    }

    const DAY: i64 = 86_400;

    #[test]
    fn item_past_ttl_is_expired_with_its_bucket_key() {
        // One entry 31 days old against a 30-day window.
        let now = ts(100 * DAY);
        let mut ledger = SeenLedger::new();
        ledger.merge("foo", ["1"], now - Duration::days(31));

        let policy = ExpiryPolicy::new(Duration::days(30));
        let expired = policy.run(&[item("Foo")], &ledger, now);
        assert_eq!(expired, vec!["Foo".to_owned()]);
    }

    #[test]
    fn item_within_ttl_survives() {
        let now = ts(100 * DAY);
        let mut ledger = SeenLedger::new();
        ledger.merge("foo", ["1"], now - Duration::days(29));

        let policy = ExpiryPolicy::new(Duration::days(30));
        assert!(policy.run(&[item("Foo")], &ledger, now).is_empty());
    }

    #[test]
    fn ttl_boundary_is_strict() {
        let now = ts(100 * DAY);
        let mut ledger = SeenLedger::new();
        ledger.merge("foo", ["1"], now - Duration::days(30));

        let policy = ExpiryPolicy::new(Duration::days(30));
        assert!(
            policy.run(&[item("Foo")], &ledger, now).is_empty(),
            "exactly-ttl-old is not expired; only strictly older"
        );
    }

    #[test]
    fn item_with_no_entries_never_expires() {
        let now = ts(1000 * DAY);
        let ledger = SeenLedger::new();
        let policy = ExpiryPolicy::new(Duration::days(30));
        assert!(policy.run(&[item("Never Matched")], &ledger, now).is_empty());
    }

    #[test]
    fn newest_entry_decides_not_oldest() {
        let now = ts(100 * DAY);
        let mut ledger = SeenLedger::new();
        ledger.merge("foo", ["old"], now - Duration::days(90));
        ledger.merge("foo", ["recent"], now - Duration::days(5));

        let policy = ExpiryPolicy::new(Duration::days(30));
        assert!(
            policy.run(&[item("Foo")], &ledger, now).is_empty(),
            "one recent release keeps the item alive"
        );
    }

    #[test]
    fn mixed_watchlist_expires_only_stale_items() {
        let now = ts(100 * DAY);
        let mut ledger = SeenLedger::new();
        ledger.merge("stale", ["1"], now - Duration::days(40));
        ledger.merge("active", ["2"], now - Duration::days(1));

        let policy = ExpiryPolicy::new(Duration::days(30));
        let expired = policy.run(
            &[item("Stale"), item("Active"), item("Unmatched")],
            &ledger,
            now,
        );
        assert_eq!(expired, vec!["Stale".to_owned()]);
    }
}
