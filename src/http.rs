//! Admin HTTP surface.
//!
//! All endpoints speak JSON; failures come back as `{error: string}` with the
//! status matching the error class. List responses carry `degraded: true`
//! when they were served from the in-memory fallback instead of the remote
//! table store.
use crate::catalog::Catalog;
use crate::model::{
    Content, ContentPatch, Influencer, InfluencerPatch, MessageTemplate, NewContent,
    NewInfluencer, NewMessageTemplate, NewOrder, Order, OrderPatch, OrderStatus, SelectedItem,
    ShippingDetails,
};
use crate::shopify::{self, CommerceService};
use crate::store::{Repository, StoreError};
use crate::webhook;
use crate::wizard::{OrderWizard, WizardError};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

pub struct AppState {
    pub repo: Repository,
    pub commerce: Arc<dyn CommerceService>,
    pub catalog: Catalog,
    pub webhook_secret: String,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("invalid webhook signature")]
    SignatureInvalid,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::Remote(source) => ApiError::Internal(source),
        }
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Guard(msg) => ApiError::Validation(msg.to_string()),
            WizardError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            ApiError::Internal(source) => {
                error!(error = %source, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/influencers",
            get(list_influencers).post(create_influencer),
        )
        .route(
            "/influencers/:id",
            get(get_influencer)
                .patch(update_influencer)
                .delete(delete_influencer),
        )
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/place", post(place_order))
        .route("/orders/:id", patch(update_order))
        .route("/orders/:id/shipment", get(get_shipment))
        .route("/content", get(list_content).post(create_content))
        .route("/content/:id", patch(update_content))
        .route(
            "/message-templates",
            get(list_templates).post(create_template),
        )
        .route("/stats", get(stats))
        .route("/products", get(products))
        .route("/webhooks/fulfillment", post(webhook_fulfillment))
        .route("/webhooks/order-updated", post(webhook_order_updated))
        .with_state(state)
}

// ---- influencers ----

async fn list_influencers(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (influencers, source) = state.repo.list_influencers().await?;
    Ok(Json(json!({
        "influencers": influencers,
        "degraded": source.is_fallback(),
    })))
}

async fn create_influencer(
    State(state): State<SharedState>,
    Json(new): Json<NewInfluencer>,
) -> Result<(StatusCode, Json<Influencer>), ApiError> {
    let (inf, _) = state.repo.create_influencer(new).await?;
    Ok((StatusCode::CREATED, Json(inf)))
}

async fn get_influencer(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Influencer>, ApiError> {
    let (inf, _) = state.repo.get_influencer(&id).await?;
    Ok(Json(inf))
}

async fn update_influencer(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<InfluencerPatch>,
) -> Result<Json<Influencer>, ApiError> {
    let (inf, _) = state.repo.update_influencer(&id, &patch).await?;
    Ok(Json(inf))
}

async fn delete_influencer(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete_influencer(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- orders ----

async fn list_orders(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (orders, source) = state.repo.list_orders().await?;
    Ok(Json(json!({
        "orders": orders,
        "degraded": source.is_fallback(),
    })))
}

async fn create_order(
    State(state): State<SharedState>,
    Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let (order, _) = state.repo.create_order(new).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceOrderRequest {
    influencer_id: String,
    items: Vec<SelectedItem>,
    shipping: ShippingDetails,
    #[serde(default)]
    zero_value: bool,
}

/// Run the order wizard end to end for an API client: resolve the
/// influencer, validate each step's guard, then submit.
async fn place_order(
    State(state): State<SharedState>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let (influencer, _) = state.repo.get_influencer(&req.influencer_id).await?;

    let mut wizard = OrderWizard::new();
    wizard.select_influencer(influencer);
    wizard.advance()?;
    wizard.set_selection(req.items);
    wizard.advance()?;
    wizard.set_shipping(req.shipping);
    wizard.set_zero_value(req.zero_value);
    wizard.advance()?;

    let order = wizard
        .place_order(&state.repo, state.commerce.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn update_order(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, ApiError> {
    let (order, _) = state.repo.update_order(&id, &patch).await?;
    Ok(Json(order))
}

async fn get_shipment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (order, source) = state.repo.get_order(&id).await?;
    Ok(Json(json!({
        "orderId": order.id,
        "status": order.status,
        "trackingInfo": order.tracking_info,
        "degraded": source.is_fallback(),
    })))
}

// ---- content ----

async fn list_content(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (content, source) = state.repo.list_content().await?;
    Ok(Json(json!({
        "content": content,
        "degraded": source.is_fallback(),
    })))
}

async fn create_content(
    State(state): State<SharedState>,
    Json(new): Json<NewContent>,
) -> Result<(StatusCode, Json<Content>), ApiError> {
    let (content, _) = state.repo.create_content(new).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

async fn update_content(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<ContentPatch>,
) -> Result<Json<Content>, ApiError> {
    let (content, _) = state.repo.update_content(&id, &patch).await?;
    Ok(Json(content))
}

// ---- message templates ----

async fn list_templates(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let (templates, source) = state.repo.list_templates().await?;
    Ok(Json(json!({
        "templates": templates,
        "degraded": source.is_fallback(),
    })))
}

async fn create_template(
    State(state): State<SharedState>,
    Json(new): Json<NewMessageTemplate>,
) -> Result<(StatusCode, Json<MessageTemplate>), ApiError> {
    let (template, _) = state.repo.create_template(new).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

// ---- stats ----

async fn stats(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let ((influencers, s1), (orders, s2), (content, s3), (templates, s4)) = futures::try_join!(
        state.repo.list_influencers(),
        state.repo.list_orders(),
        state.repo.list_content(),
        state.repo.list_templates(),
    )?;

    let mut influencers_by_status: BTreeMap<&str, usize> = BTreeMap::new();
    for inf in &influencers {
        *influencers_by_status.entry(inf.status.as_str()).or_default() += 1;
    }
    let mut orders_by_status: BTreeMap<&str, usize> = BTreeMap::new();
    for order in &orders {
        *orders_by_status.entry(order.status.as_str()).or_default() += 1;
    }

    let active_orders = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Completed)
        .count();
    let pending_content = content
        .iter()
        .filter(|c| c.status == crate::model::ContentStatus::PendingReview)
        .count();

    Ok(Json(json!({
        "totalInfluencers": influencers.len(),
        "activeOrders": active_orders,
        "pendingContent": pending_content,
        "totalTemplates": templates.len(),
        "influencersByStatus": influencers_by_status,
        "ordersByStatus": orders_by_status,
        "degraded": s1.is_fallback() || s2.is_fallback() || s3.is_fallback() || s4.is_fallback(),
    })))
}

// ---- products ----

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProductsQuery {
    q: String,
    page_info: Option<String>,
    limit: Option<u32>,
}

async fn products(
    State(state): State<SharedState>,
    Query(pq): Query<ProductsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = pq.limit.unwrap_or(20).clamp(1, 250);
    let page = match pq.page_info.as_deref().filter(|p| !p.is_empty()) {
        Some(cursor) => state.catalog.continue_from(cursor, limit).await?,
        None => state.catalog.search(&pq.q, limit).await?,
    };
    Ok(Json(json!({
        "products": page.products,
        "totalCount": page.total_count,
        "nextPageInfo": page.next_page_info,
        "prevPageInfo": page.prev_page_info,
        "cached": page.cached,
    })))
}

// ---- webhooks ----

fn verify_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let signature = headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if shopify::verify_webhook_hmac(&state.webhook_secret, body, signature) {
        Ok(())
    } else {
        Err(ApiError::SignatureInvalid)
    }
}

/// Webhooks acknowledge with 200 `{ok:true}` once the signature checks out,
/// even when processing fails, so the sender does not retry a payload we
/// cannot handle.
async fn webhook_fulfillment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    verify_signature(&state, &headers, &body)?;
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            if let Err(err) = webhook::process_fulfillment(&state.repo, &payload).await {
                warn!(error = %err, "fulfillment webhook processing failed");
            }
        }
        Err(err) => warn!(error = %err, "fulfillment webhook body is not JSON"),
    }
    Ok(Json(json!({ "ok": true })))
}

async fn webhook_order_updated(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    verify_signature(&state, &headers, &body)?;
    match serde_json::from_slice::<Value>(&body) {
        Ok(payload) => {
            if let Err(err) = webhook::process_order_updated(&state.repo, &payload).await {
                warn!(error = %err, "order-updated webhook processing failed");
            }
        }
        Err(err) => warn!(error = %err, "order-updated webhook body is not JSON"),
    }
    Ok(Json(json!({ "ok": true })))
}
