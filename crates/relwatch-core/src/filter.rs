//! Strict-mode release filter.
//!
//! Strict items want season packs only: any title carrying an
//! episode-level marker (`S01E04`-style numbering) is dropped before the
//! ledger ever sees it, so a filtered episode can still notify later as
//! part of a season pack.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Release;

/// Season-and-episode numbering, e.g. `S01E04`, `s2024e101`.
static EPISODE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S\d{2,}E\d{2,}").expect("episode marker pattern"));

/// True when the title names an individual episode.
pub fn is_episode_release(title: &str) -> bool {
    EPISODE_MARKER.is_match(title)
}

/// Apply an item's strict flag to raw search results.
///
/// Non-strict items pass everything through unfiltered.
pub fn apply_strict(strict: bool, releases: Vec<Release>) -> Vec<Release> {
    if !strict {
        return releases;
    }
    releases
        .into_iter()
        .filter(|r| !is_episode_release(&r.title))
        .collect()
}
