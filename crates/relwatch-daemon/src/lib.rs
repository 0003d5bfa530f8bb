//! relwatch-daemon: the poll scheduler and its local collaborators.
//! State store, notification routing, watchlist operations, and the tick
//! state machine that ties them to the remote-search seams.

pub mod notify;
pub mod scheduler;
pub mod store;
pub mod watchlist;

pub use notify::{DesktopNotifier, LogNotifier, NotificationSink};
pub use scheduler::{PollScheduler, SchedulerConfig};
pub use store::{JsonStateStore, MemoryStore, StateStore, StoreError};
