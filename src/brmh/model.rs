//! Translation between BRMH table items and domain records.
//!
//! The influencer table predates this service and reuses columns for other
//! purposes: `role` holds the lifecycle status, `companyId` holds the social
//! media profile as a JSON string, and free-form fields live under a `data`
//! bucket. Orders keep their products/shipping/tracking under `data` as well.
//! Each field is read with an explicit priority order so the duck-typing of
//! the upstream payloads stays in one place.
use crate::model::{
    Content, ContentPatch, Influencer, InfluencerPatch, InfluencerStatus, MessageTemplate, Order,
    OrderPatch, OrderStatus, ShippingDetails, SocialMedia, TrackingInfo,
};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

fn req_str(item: &Value, field: &'static str) -> Result<String> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("table item missing field {}", field))
}

fn opt_str(item: &Value, field: &str) -> Option<String> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn timestamp_or_now(item: &Value, field: &str) -> DateTime<Utc> {
    item.get(field)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .unwrap_or_else(Utc::now)
}

/// The `data` bucket may be stored as an object or a JSON-encoded string.
fn data_bucket(item: &Value) -> Value {
    match item.get("data") {
        Some(Value::Object(m)) => Value::Object(m.clone()),
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_else(|_| json!({})),
        _ => json!({}),
    }
}

pub fn influencer_to_item(inf: &Influencer) -> Value {
    let mut data = Map::new();
    if let Some(address) = &inf.address {
        data.insert("address".into(), json!(address));
    }
    if let Some(age) = inf.age {
        data.insert("age".into(), json!(age));
    }
    if let Some(gender) = &inf.gender {
        data.insert("gender".into(), json!(gender));
    }
    let social = inf
        .social_media
        .as_ref()
        .and_then(|sm| serde_json::to_string(sm).ok())
        .unwrap_or_default();
    json!({
        "id": inf.id,
        "name": inf.name,
        "email": inf.email,
        "phone": inf.phone,
        "role": inf.status.as_str(),
        "companyId": social,
        "data": Value::Object(data),
        "createdAt": inf.created_at,
        "updatedAt": inf.updated_at,
    })
}

pub fn influencer_from_item(item: &Value) -> Result<Influencer> {
    let data = data_bucket(item);
    // Address may be stored top-level (legacy) or under data.address.
    let address = opt_str(item, "address").or_else(|| opt_str(&data, "address"));
    let status = opt_str(item, "role")
        .and_then(|s| InfluencerStatus::parse(&s))
        .unwrap_or(InfluencerStatus::PendingApproval);
    let social_media: Option<SocialMedia> = opt_str(item, "companyId")
        .and_then(|s| serde_json::from_str(&s).ok())
        .filter(|sm: &SocialMedia| sm.instagram.is_some() || sm.youtube.is_some());

    Ok(Influencer {
        id: req_str(item, "id")?,
        name: req_str(item, "name")?,
        email: req_str(item, "email")?,
        phone: opt_str(item, "phone").unwrap_or_default(),
        age: data.get("age").and_then(Value::as_u64).map(|n| n as u32),
        gender: opt_str(&data, "gender"),
        address,
        social_media,
        status,
        created_at: timestamp_or_now(item, "createdAt"),
        updated_at: timestamp_or_now(item, "updatedAt"),
    })
}

/// Build a partial-update payload for the influencer table. Only fields the
/// patch provides are written; `updatedAt` is always stamped. The store
/// replaces `data` wholesale on update, so when the patch touches any field
/// that lives under `data` the full bucket is rebuilt from `merged` (the
/// record with the patch already applied).
pub fn influencer_updates(
    patch: &InfluencerPatch,
    merged: &Influencer,
    now: DateTime<Utc>,
) -> Value {
    let mut updates = Map::new();
    if patch.name.is_some() {
        updates.insert("name".into(), json!(merged.name));
    }
    if patch.email.is_some() {
        updates.insert("email".into(), json!(merged.email));
    }
    if patch.phone.is_some() {
        updates.insert("phone".into(), json!(merged.phone));
    }
    if patch.status.is_some() {
        updates.insert("role".into(), json!(merged.status.as_str()));
    }
    if patch.social_media.is_some() {
        let encoded = merged
            .social_media
            .as_ref()
            .and_then(|sm| serde_json::to_string(sm).ok())
            .unwrap_or_default();
        updates.insert("companyId".into(), json!(encoded));
    }
    if patch.address.is_some() || patch.age.is_some() || patch.gender.is_some() {
        let mut data = Map::new();
        if let Some(address) = &merged.address {
            data.insert("address".into(), json!(address));
        }
        if let Some(age) = merged.age {
            data.insert("age".into(), json!(age));
        }
        if let Some(gender) = &merged.gender {
            data.insert("gender".into(), json!(gender));
        }
        updates.insert("data".into(), Value::Object(data));
    }
    updates.insert("updatedAt".into(), json!(now));
    Value::Object(updates)
}

/// Partial-update payload for the order table. Same wholesale-`data` rule as
/// [`influencer_updates`].
pub fn order_updates(patch: &OrderPatch, merged: &Order, now: DateTime<Utc>) -> Value {
    let mut updates = Map::new();
    if patch.status.is_some() {
        updates.insert("status".into(), json!(merged.status.as_str()));
    }
    if patch.total_amount.is_some() {
        updates.insert("totalAmount".into(), json!(merged.total_amount));
    }
    if patch.products.is_some() || patch.shipping_details.is_some() || patch.tracking_info.is_some()
    {
        updates.insert(
            "data".into(),
            json!({
                "products": merged.products,
                "shippingDetails": merged.shipping_details,
                "trackingInfo": merged.tracking_info,
            }),
        );
    }
    updates.insert("updatedAt".into(), json!(now));
    Value::Object(updates)
}

/// Partial-update payload for the content table (flat layout, no `data`
/// bucket).
pub fn content_updates(patch: &ContentPatch, now: DateTime<Utc>) -> Value {
    let mut updates = Map::new();
    if let Some(status) = patch.status {
        updates.insert("status".into(), json!(status.as_str()));
    }
    if let Some(link) = &patch.s3_link {
        updates.insert("s3Link".into(), json!(link));
    }
    if let Some(editor) = &patch.edited_by {
        updates.insert("editedBy".into(), json!(editor));
    }
    updates.insert("updatedAt".into(), json!(now));
    Value::Object(updates)
}

pub fn order_to_item(order: &Order) -> Value {
    // The table's primary key prefers the external commerce id so webhook
    // lookups and the admin UI agree on one identifier.
    let id = if order.shopify_order_id.is_empty() {
        order.id.clone()
    } else {
        order.shopify_order_id.clone()
    };
    json!({
        "id": id,
        "influencerId": order.influencer_id,
        "companyId": order.company_id,
        "shopifyOrderId": order.shopify_order_id,
        "status": order.status.as_str(),
        "totalAmount": order.total_amount,
        "createdAt": order.created_at,
        "updatedAt": order.updated_at,
        "data": {
            "products": order.products,
            "shippingDetails": order.shipping_details,
            "trackingInfo": order.tracking_info,
        },
    })
}

pub fn order_from_item(item: &Value) -> Result<Order> {
    let data = data_bucket(item);
    let status = opt_str(item, "status")
        .and_then(|s| OrderStatus::parse(&s))
        .unwrap_or(OrderStatus::Created);
    let products = data
        .get("products")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .context("invalid products in order data bucket")?
        .unwrap_or_default();
    let shipping_details: Option<ShippingDetails> = data
        .get("shippingDetails")
        .filter(|v| !v.is_null())
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .context("invalid shippingDetails in order data bucket")?;
    let tracking_info: Option<TrackingInfo> = data
        .get("trackingInfo")
        .filter(|v| !v.is_null())
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .context("invalid trackingInfo in order data bucket")?;

    Ok(Order {
        id: req_str(item, "id")?,
        influencer_id: req_str(item, "influencerId")?,
        company_id: opt_str(item, "companyId").unwrap_or_default(),
        shopify_order_id: req_str(item, "shopifyOrderId")?,
        status,
        products,
        shipping_details,
        tracking_info,
        total_amount: item
            .get("totalAmount")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        created_at: timestamp_or_now(item, "createdAt"),
        updated_at: timestamp_or_now(item, "updatedAt"),
    })
}

pub fn content_to_item(content: &Content) -> Result<Value> {
    serde_json::to_value(content).context("content does not serialize")
}

pub fn content_from_item(item: &Value) -> Result<Content> {
    serde_json::from_value(item.clone()).context("invalid content table item")
}

pub fn template_to_item(template: &MessageTemplate) -> Result<Value> {
    serde_json::to_value(template).context("template does not serialize")
}

pub fn template_from_item(item: &Value) -> Result<MessageTemplate> {
    serde_json::from_value(item.clone()).context("invalid message template table item")
}
