use stepnote_core::content::normalize_content_url;

use crate::error::{ClientError, Result};

/// Downloads transcript markdown from the content host.
#[derive(Debug, Clone, Default)]
pub struct ContentFetcher {
    http: reqwest::Client,
}

impl ContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(http: reqwest::Client) -> Self {
        ContentFetcher { http }
    }

    /// Fetch the markdown behind a GitHub page or raw URL.
    ///
    /// Unsupported hosts fail before any request is sent.
    pub async fn fetch_markdown(&self, url: &str) -> Result<String> {
        let raw_url = normalize_content_url(url)?;
        self.fetch_raw(&raw_url).await
    }

    pub(crate) async fn fetch_raw(&self, raw_url: &str) -> Result<String> {
        tracing::debug!(url = raw_url, "fetching transcript");
        let resp = self.http.get(raw_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Content {
                status: status.as_u16(),
                url: raw_url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}
