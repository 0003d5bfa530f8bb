//! Collaborator contracts the scheduler is generic over.
//!
//! The scheduler never talks to the tracker or parses markup itself; it
//! sees these two seams and nothing else. Concrete implementations live
//! in `relwatch-source-filelist`, fakes live next to the scheduler tests.

use std::future::Future;

use crate::types::{Credentials, Release};

/// Remote search collaborator.
pub trait SearchClient: Send + Sync {
    /// Search the tracker for releases matching `item_name`.
    ///
    /// Fail-soft contract: transport, HTTP, and parse failures all come
    /// back as an empty list, so the scheduler cannot distinguish
    /// "nothing new" from "query failed". Implementations log the
    /// failure so the gap is at least observable.
    fn search(
        &self,
        creds: &Credentials,
        item_name: &str,
    ) -> impl Future<Output = Vec<Release>> + Send;
}

/// Credential discovery collaborator.
pub trait CredentialProvider: Send + Sync {
    /// Discover API credentials, or `None` when unavailable.
    ///
    /// `None` makes the scheduler skip the tick entirely with no state
    /// mutated; discovery is retried on the next tick.
    fn resolve(&self) -> impl Future<Output = Option<Credentials>> + Send;
}
