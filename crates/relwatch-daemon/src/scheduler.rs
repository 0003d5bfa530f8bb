//! Poll scheduler: spreads watchlist lookups across a wall-clock cycle.
//!
//! Two logical states, encoded in the persisted `CycleState` rather than
//! an enum: idle (`cursor == 0`, waiting for `next_cycle_at`) and
//! mid-cycle (`cursor > 0`, a batch due every tick). The scheduler owns
//! its collaborators and must sit behind a single-flight guard: one tick
//! or full poll logically in flight at a time, never interleaved.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use relwatch_core::expiry::ExpiryPolicy;
use relwatch_core::ledger::SeenLedger;
use relwatch_core::source::{CredentialProvider, SearchClient};
use relwatch_core::types::{Credentials, CycleState, TickOutcome, TrackedItem};
use relwatch_core::{filter, planner};

use crate::notify::NotificationSink;
use crate::store::{StateStore, StoreError};

/// Scheduler timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Ticks that cover one full pass over the watchlist.
    pub cycle_ticks: usize,
    /// Wall-clock span one full cycle must take, independent of tick
    /// cadence. The cycle anchor advances by this much on every wrap.
    pub cycle_duration: Duration,
    /// Retention window for items with no fresh release.
    pub ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_ticks: 60,
            cycle_duration: Duration::minutes(60),
            ttl: Duration::days(30),
        }
    }
}

/// The tick state machine. Generic over the four collaborator seams.
pub struct PollScheduler<S, C, N, P> {
    search: S,
    credentials: C,
    sink: N,
    store: P,
    cfg: SchedulerConfig,
}

impl<S, C, N, P> PollScheduler<S, C, N, P>
where
    S: SearchClient,
    C: CredentialProvider,
    N: NotificationSink,
    P: StateStore,
{
    pub fn new(search: S, credentials: C, sink: N, store: P, cfg: SchedulerConfig) -> Self {
        Self {
            search,
            credentials,
            sink,
            store,
            cfg,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    /// The underlying store, for read-only control-plane queries.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Mutable store access for watchlist operations. Callers hold the
    /// same guard that serializes ticks, so the read-modify-write
    /// contract is preserved.
    pub fn store_mut(&mut self) -> &mut P {
        &mut self.store
    }

    /// One timer tick.
    ///
    /// Persistence failures abort the tick with an error; the next timer
    /// fire retries from the last persisted state.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, StoreError> {
        // 1. Idle gate: between cycles nothing is queried, nothing mutated.
        let mut cycle = self.store.load_cycle()?;
        if cycle.cursor == 0 && now < cycle.next_cycle_at {
            return Ok(TickOutcome::Idle);
        }

        // 2. Credentials: none means skip the whole tick, retry next fire.
        let Some(creds) = self.resolve_credentials().await? else {
            debug!("no credentials available, skipping tick");
            return Ok(TickOutcome::NoCredentials);
        };

        // 3. Cycle start: retire stale items before planning coverage.
        if cycle.cursor == 0 {
            self.run_expiry(now)?;
        }

        // 4. Re-read the watchlist; expiry may have shrunk it.
        let items = self.store.load_items()?;
        if items.is_empty() {
            return Ok(TickOutcome::EmptyWatchlist);
        }

        // 5. Plan this tick's slice (plan clamps an out-of-range cursor).
        let plan = planner::plan(items.len(), cycle.cursor, self.cfg.cycle_ticks);
        let slice = &items[plan.start..plan.end];

        // 6. Query, filter, merge, notify.
        let mut ledger = self.store.load_ledger()?;
        let (changed, fresh) = self.poll_slice(&creds, slice, &mut ledger, now).await;

        // 7. Persist ledger (only when changed) and cursor; re-anchor the
        //    cycle on wrap.
        if changed {
            self.store.save_ledger(&ledger)?;
        }
        let wrapped = plan.end >= items.len();
        cycle.cursor = if wrapped { 0 } else { plan.end };
        if wrapped {
            cycle.next_cycle_at = now + self.cfg.cycle_duration;
        }
        self.store.save_cycle(&cycle)?;
        if wrapped {
            self.store.save_last_check(now)?;
            info!(
                next_cycle_at = %cycle.next_cycle_at,
                "cycle complete"
            );
        }

        Ok(TickOutcome::Completed {
            polled: slice.len(),
            fresh,
            cycle_completed: wrapped,
        })
    }

    /// Manual refresh: poll every item in one pass and restart the cycle.
    ///
    /// Always allowed, mid-cycle or idle; the cycle anchor and cursor are
    /// reset regardless of where the batched walk had gotten to.
    pub async fn full_poll(&mut self, now: DateTime<Utc>) -> Result<TickOutcome, StoreError> {
        let Some(creds) = self.resolve_credentials().await? else {
            debug!("no credentials available, skipping full poll");
            return Ok(TickOutcome::NoCredentials);
        };

        self.run_expiry(now)?;

        let cycle = CycleState {
            cursor: 0,
            next_cycle_at: now + self.cfg.cycle_duration,
        };

        let items = self.store.load_items()?;
        if items.is_empty() {
            self.store.save_cycle(&cycle)?;
            return Ok(TickOutcome::EmptyWatchlist);
        }

        let mut ledger = self.store.load_ledger()?;
        let (changed, fresh) = self.poll_slice(&creds, &items, &mut ledger, now).await;
        if changed {
            self.store.save_ledger(&ledger)?;
        }
        self.store.save_cycle(&cycle)?;
        self.store.save_last_check(now)?;
        info!(polled = items.len(), fresh, "full poll complete");

        Ok(TickOutcome::Completed {
            polled: items.len(),
            fresh,
            cycle_completed: true,
        })
    }

    /// Stored credentials win; otherwise ask the provider and persist a
    /// successful discovery so later ticks skip the scrape.
    async fn resolve_credentials(&mut self) -> Result<Option<Credentials>, StoreError> {
        if let Some(creds) = self.store.load_credentials()? {
            return Ok(Some(creds));
        }
        match self.credentials.resolve().await {
            Some(creds) => {
                info!(username = %creds.username, "credentials discovered");
                self.store.save_credentials(&creds)?;
                Ok(Some(creds))
            }
            None => Ok(None),
        }
    }

    /// Retire items past the TTL and drop their buckets, plus any bucket
    /// orphaned by an earlier partial failure. Items are written before
    /// the ledger: the failure mode is an orphaned bucket (swept next
    /// cycle), never an immortal zero-entry item.
    fn run_expiry(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        let items = self.store.load_items()?;
        let mut ledger = self.store.load_ledger()?;

        let expired = ExpiryPolicy::new(self.cfg.ttl).run(&items, &ledger, now);
        let live: Vec<TrackedItem> = items
            .into_iter()
            .filter(|item| !expired.contains(&item.name))
            .collect();

        let live_keys: Vec<String> = live.iter().map(TrackedItem::key).collect();
        let swept = ledger.retain_buckets(live_keys.iter().map(String::as_str));

        if expired.is_empty() && swept == 0 {
            return Ok(());
        }

        if !expired.is_empty() {
            info!(expired = ?expired, "retiring items past retention window");
            self.store.save_items(&live)?;
        }
        self.store.save_ledger(&ledger)?;
        Ok(())
    }

    /// Query each item in the slice, filter, merge, and notify per fresh
    /// release. Returns whether the ledger changed and the fresh count.
    async fn poll_slice(
        &self,
        creds: &Credentials,
        slice: &[TrackedItem],
        ledger: &mut SeenLedger,
        now: DateTime<Utc>,
    ) -> (bool, usize) {
        let mut changed = false;
        let mut fresh_total = 0;

        for item in slice {
            let results = self.search.search(creds, &item.name).await;
            let kept = filter::apply_strict(item.strict, results);
            let fresh = ledger.merge(&item.key(), kept.iter().map(|r| r.id.as_str()), now);

            debug!(
                item = %item.name,
                results = kept.len(),
                fresh = fresh.len(),
                "item polled"
            );

            if fresh.is_empty() {
                continue;
            }
            changed = true;
            fresh_total += fresh.len();
            for release in kept.iter().filter(|r| fresh.contains(&r.id)) {
                self.sink.notify(&item.name, &release.title);
            }
        }

        (changed, fresh_total)
    }
}
