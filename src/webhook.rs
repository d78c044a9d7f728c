//! Inbound commerce webhook processing.
//!
//! Signature verification and HTTP status handling live in the HTTP layer;
//! these functions take an already-verified JSON payload and apply it to the
//! order repository. The target order is found by scanning all orders for a
//! matching commerce id.
use crate::model::{DeliveryEvent, OrderPatch, OrderStatus, TrackingInfo};
use crate::store::{Repository, StoreError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

/// Order ids arrive as numbers or strings depending on the topic.
fn id_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(v: &Value, field: &str) -> Option<String> {
    v.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Fulfillment payloads carry the order id either nested under `fulfillment`
/// or top-level.
fn fulfillment_order_id(payload: &Value) -> Option<String> {
    id_text(payload.get("fulfillment").and_then(|f| f.get("order_id")))
        .or_else(|| id_text(payload.get("order_id")))
}

fn updated_order_id(payload: &Value) -> Option<String> {
    id_text(payload.get("id")).or_else(|| id_text(payload.get("order").and_then(|o| o.get("id"))))
}

fn is_cancelled(payload: &Value) -> bool {
    if payload.get("cancelled_at").map_or(false, |v| !v.is_null()) {
        return true;
    }
    if text(payload, "cancel_reason").is_some() {
        return true;
    }
    text(payload, "financial_status").map_or(false, |s| s.eq_ignore_ascii_case("voided"))
}

/// Apply a `fulfillments/create` event: map the tracking fields, prepend an
/// "Order Fulfilled" history entry and move the order to `InTransit`.
///
/// Returns whether a matching order was updated.
pub async fn process_fulfillment(repo: &Repository, payload: &Value) -> Result<bool, StoreError> {
    let Some(shopify_order_id) = fulfillment_order_id(payload) else {
        debug!("fulfillment webhook without an order id, ignoring");
        return Ok(false);
    };
    let Some((order, _)) = repo.find_order_by_shopify_id(&shopify_order_id).await? else {
        info!(shopify_order_id, "fulfillment webhook for unknown order, ignoring");
        return Ok(false);
    };

    let detail = payload
        .get("fulfillment")
        .filter(|v| v.is_object())
        .unwrap_or(payload);
    let carrier = text(detail, "tracking_company");
    let event = DeliveryEvent {
        status: "Order Fulfilled".to_string(),
        timestamp: Utc::now(),
        location: Some(carrier.clone().unwrap_or_else(|| "System".to_string())),
        description: Some(match &carrier {
            Some(c) => format!("Order has been fulfilled via {}", c),
            None => "Order has been fulfilled".to_string(),
        }),
    };
    let mut delivery_history = order
        .tracking_info
        .as_ref()
        .map(|t| t.delivery_history.clone())
        .unwrap_or_default();
    delivery_history.insert(0, event);

    let tracking_info = TrackingInfo {
        status: OrderStatus::InTransit.as_str().to_string(),
        tracking_number: text(detail, "tracking_number"),
        carrier,
        tracking_url: text(detail, "tracking_url"),
        estimated_delivery: text(detail, "estimated_delivery_at")
            .and_then(|s| s.parse::<DateTime<Utc>>().ok()),
        delivery_history,
    };

    let patch = OrderPatch {
        status: Some(OrderStatus::InTransit),
        tracking_info: Some(tracking_info),
        ..Default::default()
    };
    repo.update_order(&order.id, &patch).await?;
    info!(order_id = %order.id, shopify_order_id, "order marked in transit from fulfillment webhook");
    Ok(true)
}

/// Apply an `orders/updated` event: cancellation wins over fulfillment
/// status; anything else is ignored.
///
/// Returns the status the order was moved to, if any.
pub async fn process_order_updated(
    repo: &Repository,
    payload: &Value,
) -> Result<Option<OrderStatus>, StoreError> {
    let Some(shopify_order_id) = updated_order_id(payload) else {
        debug!("order-updated webhook without an order id, ignoring");
        return Ok(None);
    };

    let new_status = if is_cancelled(payload) {
        OrderStatus::Cancelled
    } else if text(payload, "fulfillment_status")
        .map_or(false, |s| s.eq_ignore_ascii_case("fulfilled"))
    {
        OrderStatus::Delivered
    } else {
        return Ok(None);
    };

    let Some((order, _)) = repo.find_order_by_shopify_id(&shopify_order_id).await? else {
        info!(shopify_order_id, "order-updated webhook for unknown order, ignoring");
        return Ok(None);
    };

    let event = DeliveryEvent {
        status: new_status.as_str().to_string(),
        timestamp: Utc::now(),
        location: None,
        description: Some(match new_status {
            OrderStatus::Cancelled => "Order has been cancelled".to_string(),
            _ => "Order has been delivered".to_string(),
        }),
    };
    let mut tracking_info = order.tracking_info.clone().unwrap_or_default();
    tracking_info.status = new_status.as_str().to_string();
    tracking_info.delivery_history.insert(0, event);

    let patch = OrderPatch {
        status: Some(new_status),
        tracking_info: Some(tracking_info),
        ..Default::default()
    };
    repo.update_order(&order.id, &patch).await?;
    info!(order_id = %order.id, shopify_order_id, status = new_status.as_str(), "order status updated from webhook");
    Ok(Some(new_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_id_read_from_either_shape() {
        let nested = json!({ "fulfillment": { "order_id": 4567 } });
        assert_eq!(fulfillment_order_id(&nested).as_deref(), Some("4567"));

        let flat = json!({ "order_id": "SHO-1" });
        assert_eq!(fulfillment_order_id(&flat).as_deref(), Some("SHO-1"));

        assert_eq!(fulfillment_order_id(&json!({})), None);

        let updated = json!({ "id": 99 });
        assert_eq!(updated_order_id(&updated).as_deref(), Some("99"));
        let wrapped = json!({ "order": { "id": "88" } });
        assert_eq!(updated_order_id(&wrapped).as_deref(), Some("88"));
    }

    #[test]
    fn cancellation_signals() {
        assert!(is_cancelled(&json!({ "cancelled_at": "2026-01-01T00:00:00Z" })));
        assert!(is_cancelled(&json!({ "cancel_reason": "customer" })));
        assert!(is_cancelled(&json!({ "financial_status": "VOIDED" })));
        assert!(!is_cancelled(&json!({ "cancelled_at": null })));
        assert!(!is_cancelled(&json!({ "financial_status": "pending" })));
    }
}
