//! Search API client.
//!
//! Thin wrapper over the tracker's `api.php` search endpoint. Every
//! failure mode (transport error, non-2xx status, unparseable body)
//! degrades to an empty result list; the per-request timeout keeps a
//! hung query from stalling the whole tick.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use relwatch_core::source::SearchClient;
use relwatch_core::types::{Credentials, Release};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TV categories searched: HD episodes + season packs.
const SEARCH_CATEGORIES: &str = "21,27";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// HTTP search client for the tracker API.
#[derive(Debug, Clone)]
pub struct FilelistClient {
    http: reqwest::Client,
    base_url: String,
}

/// Wire shape of one search result.
#[derive(Debug, Deserialize)]
struct ApiTorrent {
    id: u64,
    name: String,
    #[serde(default)]
    download_link: String,
    #[serde(default)]
    upload_date: String,
}

impl From<ApiTorrent> for Release {
    fn from(t: ApiTorrent) -> Self {
        Self {
            id: t.id.to_string(),
            title: t.name,
            download_link: t.download_link,
            published_at: t.upload_date,
        }
    }
}

impl FilelistClient {
    /// Build a client for `base_url` (no trailing slash) with the given
    /// request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn try_search(
        &self,
        creds: &Credentials,
        item_name: &str,
    ) -> Result<Vec<Release>, reqwest::Error> {
        let url = format!("{}/api.php", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("username", creds.username.as_str()),
                ("passkey", creds.passkey.as_str()),
                ("action", "search-torrents"),
                ("type", "name"),
                ("query", item_name),
                ("category", SEARCH_CATEGORIES),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            tracing::warn!(
                status = %resp.status(),
                query = item_name,
                "search request rejected, treating as no results"
            );
            return Ok(Vec::new());
        }

        let torrents: Vec<ApiTorrent> = resp.json().await?;
        Ok(torrents.into_iter().map(Release::from).collect())
    }
}

impl SearchClient for FilelistClient {
    async fn search(&self, creds: &Credentials, item_name: &str) -> Vec<Release> {
        match self.try_search(creds, item_name).await {
            Ok(releases) => {
                tracing::debug!(query = item_name, count = releases.len(), "search done");
                releases
            }
            Err(e) => {
                tracing::warn!(query = item_name, "search failed, treating as no results: {e}");
                Vec::new()
            }
        }
    }
}
