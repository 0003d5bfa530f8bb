//! Batch planner: which slice of the watchlist a tick polls.
//!
//! Pure cursor math. A cycle of `cycle_ticks` ticks covers the whole list
//! exactly once: contiguous, non-overlapping batches in list order, with
//! the final batch short when the list length does not divide evenly.

/// The slice a single tick should poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Items per full-size batch: `max(1, ceil(item_count / cycle_ticks))`.
    pub batch_size: usize,
    /// First index to poll (cursor after clamping).
    pub start: usize,
    /// One past the last index to poll; `end >= item_count` wraps the cycle.
    pub end: usize,
}

/// Plan the batch for one tick.
///
/// A cursor at or past `item_count` (the list shrank since it was
/// recorded) is clamped to 0, restarting coverage from the top rather
/// than skipping entries.
pub fn plan(item_count: usize, cursor: usize, cycle_ticks: usize) -> BatchPlan {
    let batch_size = item_count.div_ceil(cycle_ticks.max(1)).max(1);
    let start = if cursor >= item_count { 0 } else { cursor };
    let end = (start + batch_size).min(item_count);
    BatchPlan {
        batch_size,
        start,
        end,
    }
}
