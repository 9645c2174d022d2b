use std::fmt;

pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_BASE_ID: &str = "appStepnoteReviews";
pub const DEFAULT_TABLE_NAME: &str = "Tasks";
pub const API_KEY_ENV: &str = "AIRTABLE_API_KEY";

/// Where the proxy forwards to and with which credential.
///
/// A missing `api_key` does not stop the server from starting; every request
/// is answered with a configuration error instead.
#[derive(Clone)]
pub struct ProxyConfig {
    pub api_key: Option<String>,
    pub base_id: String,
    pub table_name: String,
    pub api_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            api_key: None,
            base_id: DEFAULT_BASE_ID.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into()).filter(|k: &String| !k.trim().is_empty());
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_id", &self.base_id)
            .field("table_name", &self.table_name)
            .field("api_url", &self.api_url)
            .finish()
    }
}
