//! relwatch-core: pure watchlist-polling logic.
//! Batch planning, seen-release dedup, TTL expiry, and the collaborator
//! contracts the daemon is wired against. No IO, no async runtime.

pub mod expiry;
pub mod filter;
pub mod ledger;
pub mod planner;
pub mod source;
pub mod types;

pub use expiry::ExpiryPolicy;
pub use ledger::SeenLedger;
pub use planner::{BatchPlan, plan};
pub use types::{Credentials, CycleState, Release, TickOutcome, TrackedItem, item_key};
