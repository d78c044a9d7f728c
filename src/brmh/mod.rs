//! Client for the BRMH CRUD-over-HTTP table store.
//!
//! Every entity lives in a named table of JSON items keyed by `id`. The
//! client speaks the generic `/crud` protocol; field-layout translation
//! between table items and domain records lives in [`model`].
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

pub mod model;

#[derive(Clone)]
pub struct BrmhClient {
    http: Client,
    base_url: Url,
    item_per_page: u32,
}

impl fmt::Debug for BrmhClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrmhClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Generic table CRUD operations, injectable so tests can record calls.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn list(&self, table: &str) -> Result<Vec<Value>>;
    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>>;
    /// Returns the item id assigned by the store.
    async fn create(&self, table: &str, item: Value) -> Result<String>;
    /// Partial update: only the fields present in `updates` are written.
    async fn update(&self, table: &str, id: &str, updates: Value) -> Result<()>;
    async fn delete(&self, table: &str, id: &str) -> Result<()>;
}

#[derive(Deserialize)]
struct ListResponse {
    success: bool,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct GetResponse {
    success: bool,
    item: Option<Value>,
}

#[derive(Deserialize)]
struct CreateResponse {
    success: bool,
    #[serde(rename = "itemId")]
    item_id: Option<String>,
}

#[derive(Deserialize)]
struct AckResponse {
    success: bool,
}

impl BrmhClient {
    pub fn new(base_url: &str, item_per_page: u32) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid BRMH base URL")?;
        Ok(Self::with_base_url(base_url, item_per_page))
    }

    pub fn with_base_url(base_url: Url, item_per_page: u32) -> Self {
        let http = Client::builder()
            .user_agent("influencer-admin/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            item_per_page,
        }
    }

    fn crud_url(&self) -> Result<Url> {
        self.base_url.join("crud").context("invalid BRMH base URL")
    }
}

#[async_trait]
impl TableStore for BrmhClient {
    async fn list(&self, table: &str) -> Result<Vec<Value>> {
        let mut url = self.crud_url()?;
        url.query_pairs_mut()
            .append_pair("tableName", table)
            .append_pair("pagination", "true")
            .append_pair("itemPerPage", &self.item_per_page.to_string());

        debug!(%url, table, "brmh list");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to reach BRMH")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("brmh list error {}: {}", status, body));
        }
        let body: ListResponse = res.json().await.context("invalid BRMH list response")?;
        if !body.success {
            return Err(anyhow!("brmh list for table {} reported failure", table));
        }
        Ok(body.items)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>> {
        let mut url = self.crud_url()?;
        url.query_pairs_mut()
            .append_pair("tableName", table)
            .append_pair("id", id);

        debug!(%url, table, id, "brmh get");
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to reach BRMH")?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("brmh get error {}: {}", status, body));
        }
        let body: GetResponse = res.json().await.context("invalid BRMH get response")?;
        if !body.success {
            return Ok(None);
        }
        Ok(body.item)
    }

    async fn create(&self, table: &str, item: Value) -> Result<String> {
        let mut url = self.crud_url()?;
        url.query_pairs_mut().append_pair("tableName", table);

        let fallback_id = item
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        debug!(%url, table, "brmh create");
        let res = self
            .http
            .post(url)
            .json(&json!({ "item": item }))
            .send()
            .await
            .context("failed to reach BRMH")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("brmh create error {}: {}", status, body));
        }
        let body: CreateResponse = res.json().await.context("invalid BRMH create response")?;
        if !body.success {
            return Err(anyhow!("brmh create for table {} reported failure", table));
        }
        Ok(body.item_id.unwrap_or(fallback_id))
    }

    async fn update(&self, table: &str, id: &str, updates: Value) -> Result<()> {
        let mut url = self.crud_url()?;
        url.query_pairs_mut().append_pair("tableName", table);

        debug!(%url, table, id, "brmh update");
        let res = self
            .http
            .put(url)
            .json(&json!({ "key": { "id": id }, "updates": updates }))
            .send()
            .await
            .context("failed to reach BRMH")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("brmh update error {}: {}", status, body));
        }
        let body: AckResponse = res.json().await.context("invalid BRMH update response")?;
        if !body.success {
            return Err(anyhow!("brmh update for {} in {} reported failure", id, table));
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        let mut url = self.crud_url()?;
        url.query_pairs_mut().append_pair("tableName", table);

        debug!(%url, table, id, "brmh delete");
        let res = self
            .http
            .delete(url)
            .json(&json!({ "id": id }))
            .send()
            .await
            .context("failed to reach BRMH")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("brmh delete error {}: {}", status, body));
        }
        let body: AckResponse = res.json().await.context("invalid BRMH delete response")?;
        if !body.success {
            return Err(anyhow!("brmh delete for {} in {} reported failure", id, table));
        }
        Ok(())
    }
}
