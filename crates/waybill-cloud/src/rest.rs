use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use url::Url;
use waybill_types::TrackingRecord;

use crate::{DEFAULT_TIMEOUT_SECS, DocumentTransport, RestConfig, USER_AGENT};

/// Row store client (provider A).
///
/// Rows live in `{url}/rest/v1/{table}` with a unique `code` column and a
/// JSON `data` column holding the whole record.
#[derive(Debug, Clone)]
pub struct RestTableClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct Row {
    data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct UpsertRow<'a> {
    code: &'a str,
    data: &'a TrackingRecord,
}

impl RestTableClient {
    /// Create a client for the given project URL and key
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_timeout(base_url, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client from config. Missing fields become empty strings; the
    /// gateway only builds this client for complete configs.
    pub fn from_config(config: &RestConfig, timeout: Duration) -> Self {
        Self::with_timeout(
            config.url.as_deref().unwrap_or_default(),
            config.anon_key.as_deref().unwrap_or_default(),
            timeout,
        )
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            client,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid row store url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("row store url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        url.query_pairs_mut().extend_pairs(params.iter().copied());
        Ok(url)
    }
}

impl DocumentTransport for RestTableClient {
    fn get(&self, table: &str, code: &str) -> Result<Option<TrackingRecord>> {
        let filter = format!("eq.{code}");
        let url = self.table_url(table, &[("select", "data"), ("code", filter.as_str())])?;

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .context("failed to send request to row store")?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                "row store lookup in {table} failed with status {status}: {}",
                response.text().unwrap_or_default()
            );
        }

        let mut rows: Vec<Row> = response
            .json()
            .context("failed to parse row store response")?;

        match rows.len() {
            0 => Ok(None),
            1 => match rows.remove(0).data {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(data) => serde_json::from_value(data)
                    .map(Some)
                    .with_context(|| format!("row {code} in {table} does not hold a tracking record")),
            },
            n => bail!("expected at most one row for {code} in {table}, got {n}"),
        }
    }

    fn upsert(&self, table: &str, code: &str, record: &TrackingRecord) -> Result<()> {
        let url = self.table_url(table, &[("on_conflict", "code")])?;
        let body = [UpsertRow { code, data: record }];

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body)
            .send()
            .context("failed to send upsert to row store")?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                "row store upsert into {table} failed with status {status}: {}",
                response.text().unwrap_or_default()
            );
        }

        Ok(())
    }
}
