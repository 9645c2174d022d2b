use std::sync::Arc;

use stepnote_core::error::StepnoteError;

use crate::config::{ProxyConfig, API_KEY_ENV};
use crate::table::TableClient;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    /// Upstream client, or a configuration error when no key is set.
    pub fn table(&self) -> Result<TableClient<'_>, StepnoteError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or(StepnoteError::MissingCredential(API_KEY_ENV))?;
        Ok(TableClient::new(&self.http, &self.config, key))
    }
}
