//! Shopify Admin API client.
//!
//! Catalog pages use Shopify's cursor pagination: the `Link` response header
//! carries opaque `page_info` cursors for the next/previous page, and a
//! cursor request may only pass `page_info` and `limit` (any filter param
//! alongside a cursor is rejected upstream).
use crate::model::{Product, SelectedItem, ShippingDetails};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Value};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub mod model;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Title filter; ignored when a cursor is present.
    pub title: Option<String>,
    /// Vendor filter; ignored when a cursor is present.
    pub vendor: Option<String>,
    /// Opaque cursor from a previous page's `Link` header.
    pub page_info: Option<String>,
    pub limit: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub next_page_info: Option<String>,
    pub prev_page_info: Option<String>,
}

/// Commerce operations the order flow depends on, injectable so tests can
/// record calls.
#[async_trait]
pub trait CommerceService: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage>;
    async fn products_count(&self, query: &ProductQuery) -> Result<u64>;
    /// Returns the commerce order id.
    async fn create_order(
        &self,
        lines: &[SelectedItem],
        shipping: &ShippingDetails,
        zero_value: bool,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct ShopifyClient {
    http: Client,
    base_url: Url,
    admin_token: String,
    page_info_re: Regex,
}

impl fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ShopifyClient {
    pub fn new(cfg: &crate::config::Shopify) -> Result<Self> {
        let base = format!(
            "https://{}/admin/api/{}/",
            cfg.store_domain, cfg.api_version
        );
        let base_url = Url::parse(&base).context("invalid Shopify store domain")?;
        Ok(Self::with_base_url(base_url, &cfg.admin_token))
    }

    pub fn with_base_url(base_url: Url, admin_token: &str) -> Self {
        let http = Client::builder()
            .user_agent("influencer-admin/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            admin_token: admin_token.to_string(),
            page_info_re: Regex::new(r"page_info=([^&>]+)").expect("page_info regex"),
        }
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url).header(ACCESS_TOKEN_HEADER, &self.admin_token)
    }

    /// Shopify throttles at 2 req/s; a 429 gets one retry after a jittered
    /// 700-1200ms pause.
    async fn send_with_retry(&self, req: RequestBuilder) -> Result<Response> {
        let retry = req.try_clone();
        let res = req.send().await.context("failed to reach Shopify")?;
        if res.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(res);
        }
        let Some(retry) = retry else {
            return Ok(res);
        };
        let delay_ms: u64 = 700 + rand::thread_rng().gen_range(0..=500);
        warn!(delay_ms, "shopify rate limited, retrying once");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        retry.send().await.context("failed to reach Shopify")
    }

    /// Extract next/previous `page_info` cursors from a `Link` header.
    fn parse_link_header(&self, link: &str) -> (Option<String>, Option<String>) {
        let mut next = None;
        let mut prev = None;
        for segment in link.split(',') {
            let cursor = self
                .page_info_re
                .captures(segment)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            if segment.contains(r#"rel="next""#) {
                next = cursor;
            } else if segment.contains(r#"rel="previous""#) {
                prev = cursor;
            }
        }
        (next, prev)
    }
}

#[async_trait]
impl CommerceService for ShopifyClient {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let mut url = self
            .base_url
            .join("products.json")
            .context("invalid Shopify base URL")?;
        {
            let mut qp = url.query_pairs_mut();
            if let Some(page_info) = &query.page_info {
                // Shopify rejects cursor requests that carry any other filter.
                qp.append_pair("page_info", page_info);
                qp.append_pair("limit", &query.limit.max(1).to_string());
            } else {
                qp.append_pair("status", "active");
                qp.append_pair("published_status", "published");
                qp.append_pair("limit", &query.limit.max(1).to_string());
                if let Some(title) = query.title.as_deref().filter(|t| !t.trim().is_empty()) {
                    qp.append_pair("title", title.trim());
                }
                if let Some(vendor) = query.vendor.as_deref().filter(|v| !v.trim().is_empty()) {
                    qp.append_pair("vendor", vendor.trim());
                }
            }
        }

        debug!(%url, "shopify list products");
        let res = self.send_with_retry(self.get(url)).await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("shopify products error {}: {}", status, body));
        }
        let link = res
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let (next_page_info, prev_page_info) = self.parse_link_header(&link);

        let body: Value = res.json().await.context("invalid Shopify products response")?;
        let products = body
            .get("products")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(model::normalize_product).collect())
            .unwrap_or_default();

        Ok(ProductPage {
            products,
            next_page_info,
            prev_page_info,
        })
    }

    async fn products_count(&self, query: &ProductQuery) -> Result<u64> {
        let mut url = self
            .base_url
            .join("products/count.json")
            .context("invalid Shopify base URL")?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("status", "active");
            qp.append_pair("published_status", "published");
            if let Some(title) = query.title.as_deref().filter(|t| !t.trim().is_empty()) {
                qp.append_pair("title", title.trim());
            }
            if let Some(vendor) = query.vendor.as_deref().filter(|v| !v.trim().is_empty()) {
                qp.append_pair("vendor", vendor.trim());
            }
        }
        let res = self.send_with_retry(self.get(url)).await?;
        if !res.status().is_success() {
            return Err(anyhow!("shopify product count error {}", res.status()));
        }
        let body: Value = res.json().await.context("invalid Shopify count response")?;
        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("shopify count response missing count"))
    }

    async fn create_order(
        &self,
        lines: &[SelectedItem],
        shipping: &ShippingDetails,
        zero_value: bool,
    ) -> Result<String> {
        let url = self
            .base_url
            .join("orders.json")
            .context("invalid Shopify base URL")?;

        let line_items: Vec<Value> = lines
            .iter()
            .map(|line| {
                // Seeding orders ship free product; the price override keeps
                // Shopify from expecting payment.
                let price = if zero_value {
                    "0.00".to_string()
                } else {
                    format!("{:.2}", line.price)
                };
                json!({
                    "variant_id": line.variant_id,
                    "quantity": line.qty,
                    "price": price,
                })
            })
            .collect();

        let body = json!({
            "order": {
                "email": shipping.email,
                "line_items": line_items,
                "shipping_address": {
                    "first_name": shipping.first_name,
                    "last_name": shipping.last_name,
                    "address1": shipping.address,
                    "city": shipping.city,
                    "province": shipping.state,
                    "country": "India",
                    "zip": shipping.zip_code,
                    "phone": shipping.phone,
                },
                "financial_status": "pending",
            }
        });

        debug!(%url, lines = lines.len(), "shopify create order");
        let req = self
            .http
            .post(url)
            .header(ACCESS_TOKEN_HEADER, &self.admin_token)
            .json(&body);
        let res = self.send_with_retry(req).await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("shopify order create error {}: {}", status, body));
        }
        let body: Value = res.json().await.context("invalid Shopify order response")?;
        let id = body
            .get("order")
            .and_then(|o| o.get("id"))
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("shopify order response missing id"))?;
        Ok(id.to_string())
    }
}

/// Verify a webhook signature: HMAC-SHA256 over the raw request body,
/// base64-encoded, compared in constant time. An empty secret disables
/// verification.
pub fn verify_webhook_hmac(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        warn!("webhook secret not configured, accepting unverified webhook");
        return true;
    }
    let expected = match BASE64.decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
