//! Credential discovery from the tracker profile page.
//!
//! The profile page embeds the account's API passkey in the passkey-reset
//! form and the username in the greeting header. Scraping both gives a
//! working credential pair without the user copying anything by hand; the
//! two patterns below are the whole contract, anything else on the page
//! is ignored.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use relwatch_core::source::CredentialProvider;
use relwatch_core::types::Credentials;

/// Passkey inside the reset form: `name="resetpasskey" ...> <hex32>`.
static PASSKEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)name=["']resetpasskey["'][^>]*>\s*([a-f0-9]{32})"#)
        .expect("passkey pattern")
});

/// Username inside the greeting: `<h2>Hi, <a ...>NAME</a>`.
static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h2>Hi,\s*<a[^>]*>([^<]+)</a>").expect("username pattern"));

/// Extract a credential pair from profile-page markup.
///
/// Both patterns must match; otherwise the page is not a logged-in
/// profile view and the result is `None`.
pub fn extract_credentials(html: &str) -> Option<Credentials> {
    let passkey = PASSKEY.captures(html)?.get(1)?.as_str().to_owned();
    let username = USERNAME.captures(html)?.get(1)?.as_str().to_owned();
    Some(Credentials { username, passkey })
}

/// Fetches the profile page with a session cookie and scrapes credentials.
#[derive(Debug, Clone)]
pub struct ProfileScraper {
    http: reqwest::Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl ProfileScraper {
    pub fn new(
        base_url: impl Into<String>,
        session_cookie: Option<String>,
        timeout: Duration,
    ) -> Result<Self, super::ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            session_cookie,
        })
    }

    async fn fetch_profile(&self) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/my.php", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie.clone());
        }
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }
}

impl CredentialProvider for ProfileScraper {
    async fn resolve(&self) -> Option<Credentials> {
        match self.fetch_profile().await {
            Ok(Some(html)) => {
                let creds = extract_credentials(&html);
                if creds.is_none() {
                    tracing::debug!("profile page fetched but no credentials found");
                }
                creds
            }
            Ok(None) => {
                tracing::debug!("profile page rejected the session, no credentials");
                None
            }
            Err(e) => {
                tracing::debug!("profile fetch failed: {e}");
                None
            }
        }
    }
}
