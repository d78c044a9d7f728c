//! Recording fakes and helpers shared by the integration tests.
#![allow(dead_code)]
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use influencer_admin::cache::SearchCache;
use influencer_admin::catalog::Catalog;
use influencer_admin::config::Tables;
use influencer_admin::http::{AppState, SharedState};
use influencer_admin::model::{Product, SelectedItem, ShippingDetails};
use influencer_admin::shopify::{CommerceService, ProductPage, ProductQuery};
use influencer_admin::store::Repository;
use influencer_admin::brmh::TableStore;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Table store fake: keeps items in memory, records every call, and can be
/// switched offline or told to reject creates.
#[derive(Default)]
pub struct RecordingTable {
    pub items: Mutex<HashMap<String, HashMap<String, Value>>>,
    pub calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    fail_creates: AtomicBool,
}

impl RecordingTable {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn seed(&self, table: &str, item: Value) {
        let id = item["id"].as_str().unwrap().to_string();
        self.items
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .insert(id, item);
    }

    pub fn item(&self, table: &str, id: &str) -> Option<Value> {
        self.items
            .lock()
            .unwrap()
            .get(table)
            .and_then(|t| t.get(id))
            .cloned()
    }

    pub fn table_len(&self, table: &str) -> usize {
        self.items
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.len())
            .unwrap_or(0)
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.offline.load(Ordering::SeqCst) {
            Err(anyhow!("table store offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TableStore for RecordingTable {
    async fn list(&self, table: &str) -> Result<Vec<Value>> {
        self.record(format!("list {}", table))?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Value>> {
        self.record(format!("get {} {}", table, id))?;
        Ok(self.item(table, id))
    }

    async fn create(&self, table: &str, item: Value) -> Result<String> {
        self.record(format!("create {}", table))?;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(anyhow!("create rejected"));
        }
        let id = item["id"]
            .as_str()
            .ok_or_else(|| anyhow!("item without id"))?
            .to_string();
        self.items
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .insert(id.clone(), item);
        Ok(id)
    }

    async fn update(&self, table: &str, id: &str, updates: Value) -> Result<()> {
        self.record(format!("update {} {}", table, id))?;
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(table)
            .and_then(|t| t.get_mut(id))
            .ok_or_else(|| anyhow!("no such item"))?;
        let obj = item.as_object_mut().ok_or_else(|| anyhow!("not an object"))?;
        for (k, v) in updates.as_object().cloned().unwrap_or_default() {
            obj.insert(k, v);
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<()> {
        self.record(format!("delete {} {}", table, id))?;
        self.items
            .lock()
            .unwrap()
            .get_mut(table)
            .and_then(|t| t.remove(id));
        Ok(())
    }
}

/// Commerce fake: scripted create_order responses, a fixed product page, and
/// a call log.
#[derive(Default)]
pub struct RecordingCommerce {
    pub create_responses: Mutex<VecDeque<Result<String>>>,
    pub create_calls: Mutex<Vec<(Vec<SelectedItem>, ShippingDetails, bool)>>,
    pub products: Mutex<Vec<Product>>,
    pub list_calls: Mutex<Vec<ProductQuery>>,
}

impl RecordingCommerce {
    pub fn respond_with(self, response: Result<String>) -> Self {
        self.create_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CommerceService for RecordingCommerce {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        self.list_calls.lock().unwrap().push(query.clone());
        Ok(ProductPage {
            products: self.products.lock().unwrap().clone(),
            next_page_info: None,
            prev_page_info: None,
        })
    }

    async fn products_count(&self, _query: &ProductQuery) -> Result<u64> {
        Ok(self.products.lock().unwrap().len() as u64)
    }

    async fn create_order(
        &self,
        lines: &[SelectedItem],
        shipping: &ShippingDetails,
        zero_value: bool,
    ) -> Result<String> {
        self.create_calls
            .lock()
            .unwrap()
            .push((lines.to_vec(), shipping.clone(), zero_value));
        self.create_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted response")))
    }
}

pub fn tables() -> Tables {
    Tables {
        influencers: "influencers".into(),
        orders: "orders".into(),
        content: "content".into(),
        templates: "templates".into(),
    }
}

pub fn repository(table: Arc<RecordingTable>) -> Repository {
    Repository::new(table, tables())
}

pub fn state(
    table: Arc<RecordingTable>,
    commerce: Arc<RecordingCommerce>,
    webhook_secret: &str,
    data_dir: &Path,
) -> SharedState {
    let commerce_dyn: Arc<dyn CommerceService> = commerce;
    Arc::new(AppState {
        repo: repository(table),
        commerce: commerce_dyn.clone(),
        catalog: Catalog::new(commerce_dyn, SearchCache::new(data_dir, 300)),
        webhook_secret: webhook_secret.to_string(),
    })
}

/// Sign a webhook body the way the sender would.
pub fn sign(secret: &str, body: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use hmac::{Hmac, Mac};
    let mut mac = Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Drive one request with a raw byte body through the router.
pub async fn request_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Vec<u8>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Drive one request through the router and decode the JSON response.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
