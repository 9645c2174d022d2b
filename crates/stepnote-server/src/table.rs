//! Client for the upstream tabular-data service (Airtable REST shape).
//!
//! `GET {api}/{base}/{table}?filterByFormula=...` pages through matching rows
//! with `offset`; `PATCH {api}/{base}/{table}/{id}` updates named fields.

use crate::config::ProxyConfig;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use stepnote_core::error::StepnoteError;
use stepnote_core::record::RawRecord;

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<RawRecord>,
    offset: Option<String>,
}

pub struct TableClient<'a> {
    http: &'a reqwest::Client,
    config: &'a ProxyConfig,
    api_key: &'a str,
}

impl<'a> TableClient<'a> {
    pub fn new(http: &'a reqwest::Client, config: &'a ProxyConfig, api_key: &'a str) -> Self {
        TableClient {
            http,
            config,
            api_key,
        }
    }

    fn url(&self, record_id: Option<&str>) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.config.api_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("api url cannot be a base: {}", self.config.api_url))?;
            segments
                .pop_if_empty()
                .push(&self.config.base_id)
                .push(&self.config.table_name);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// Every row whose `field` equals `value`, across all pages.
    pub async fn find_all(&self, field: &str, value: &str) -> anyhow::Result<Vec<RawRecord>> {
        let formula = equals_formula(field, value);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut req = self
                .http
                .get(self.url(None)?)
                .bearer_auth(self.api_key)
                .query(&[("filterByFormula", formula.as_str())]);
            if let Some(o) = &offset {
                req = req.query(&[("offset", o.as_str())]);
            }
            let page: RecordPage = decode(req.send().await?).await?;
            records.extend(page.records);
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }
        tracing::debug!(field, count = records.len(), "fetched matching rows");
        Ok(records)
    }

    /// The first row whose `field` equals `value`.
    pub async fn find_first(&self, field: &str, value: &str) -> anyhow::Result<Option<RawRecord>> {
        let formula = equals_formula(field, value);
        let req = self
            .http
            .get(self.url(None)?)
            .bearer_auth(self.api_key)
            .query(&[("filterByFormula", formula.as_str()), ("maxRecords", "1")]);
        let page: RecordPage = decode(req.send().await?).await?;
        Ok(page.records.into_iter().next())
    }

    /// Partial update; returns the upstream body unchanged.
    pub async fn update(&self, record_id: &str, fields: Map<String, Value>) -> anyhow::Result<Value> {
        let req = self
            .http
            .patch(self.url(Some(record_id))?)
            .bearer_auth(self.api_key)
            .json(&serde_json::json!({ "fields": fields }));
        decode(req.send().await?).await
    }
}

/// `{Field}='value'` with `\` and `'` escaped.
pub fn equals_formula(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{{{field}}}='{escaped}'")
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        return Err(StepnoteError::Upstream {
            status: status.as_u16(),
            body,
        }
        .into());
    }
    Ok(serde_json::from_slice(&bytes)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
