use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InfluencerStatus {
    PendingApproval,
    Approved,
    Rejected,
    OrderCreated,
    PendingVideoUpload,
    Completed,
}

impl InfluencerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfluencerStatus::PendingApproval => "PendingApproval",
            InfluencerStatus::Approved => "Approved",
            InfluencerStatus::Rejected => "Rejected",
            InfluencerStatus::OrderCreated => "OrderCreated",
            InfluencerStatus::PendingVideoUpload => "PendingVideoUpload",
            InfluencerStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PendingApproval" => Some(InfluencerStatus::PendingApproval),
            "Approved" => Some(InfluencerStatus::Approved),
            "Rejected" => Some(InfluencerStatus::Rejected),
            "OrderCreated" => Some(InfluencerStatus::OrderCreated),
            "PendingVideoUpload" => Some(InfluencerStatus::PendingVideoUpload),
            "Completed" => Some(InfluencerStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Created,
    InTransit,
    Delivered,
    Cancelled,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::InTransit => "InTransit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(OrderStatus::Created),
            "InTransit" => Some(OrderStatus::InTransit),
            "Delivered" => Some(OrderStatus::Delivered),
            "Cancelled" => Some(OrderStatus::Cancelled),
            "Completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentStatus {
    PendingUpload,
    PendingEditing,
    PendingReview,
    Approved,
    Reassigned,
    Scheduled,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::PendingUpload => "PendingUpload",
            ContentStatus::PendingEditing => "PendingEditing",
            ContentStatus::PendingReview => "PendingReview",
            ContentStatus::Approved => "Approved",
            ContentStatus::Reassigned => "Reassigned",
            ContentStatus::Scheduled => "Scheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PendingUpload" => Some(ContentStatus::PendingUpload),
            "PendingEditing" => Some(ContentStatus::PendingEditing),
            "PendingReview" => Some(ContentStatus::PendingReview),
            "Approved" => Some(ContentStatus::Approved),
            "Reassigned" => Some(ContentStatus::Reassigned),
            "Scheduled" => Some(ContentStatus::Scheduled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentType {
    Video,
    Image,
    Story,
    Reel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialMedia {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<InstagramProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube: Option<YoutubeProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstagramProfile {
    pub handle: String,
    pub followers: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeProfile {
    pub channel: String,
    pub subscribers: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Influencer {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_media: Option<SocialMedia>,
    pub status: InfluencerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// One tracking update; `delivery_history` keeps these most-recent-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEvent {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_history: Vec<DeliveryEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub influencer_id: String,
    #[serde(default)]
    pub company_id: String,
    pub shopify_order_id: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub products: Vec<OrderProduct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_details: Option<ShippingDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_info: Option<TrackingInfo>,
    #[serde(default)]
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub s3_link: String,
    pub status: ContentStatus,
    pub influencer_id: String,
    pub order_id: String,
    #[serde(default)]
    pub company_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub message: String,
    pub workflow_category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog variant as returned by the product search proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub variant_id: u64,
    pub title: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<f64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub variants: Vec<Variant>,
    pub total_stock: i64,
}

/// Create-request body for an influencer; id and timestamps are assigned
/// server-side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInfluencer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub social_media: Option<SocialMedia>,
    pub status: Option<InfluencerStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub influencer_id: String,
    #[serde(default)]
    pub company_id: String,
    pub shopify_order_id: String,
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub products: Vec<OrderProduct>,
    pub shipping_details: Option<ShippingDetails>,
    pub tracking_info: Option<TrackingInfo>,
    #[serde(default)]
    pub total_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub s3_link: String,
    pub status: Option<ContentStatus>,
    pub influencer_id: String,
    pub order_id: String,
    #[serde(default)]
    pub company_id: String,
    pub edited_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageTemplate {
    #[serde(rename = "type")]
    pub template_type: String,
    pub message: String,
    pub workflow_category: String,
}

/// Partial update for an influencer. Only present fields are written;
/// `updated_at` is always stamped server-side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluencerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub social_media: Option<SocialMedia>,
    pub status: Option<InfluencerStatus>,
}

impl InfluencerPatch {
    pub fn status(status: InfluencerStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(&self, inf: &mut Influencer, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            inf.name = name.clone();
        }
        if let Some(email) = &self.email {
            inf.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            inf.phone = phone.clone();
        }
        if let Some(age) = self.age {
            inf.age = Some(age);
        }
        if let Some(gender) = &self.gender {
            inf.gender = Some(gender.clone());
        }
        if let Some(address) = &self.address {
            inf.address = Some(address.clone());
        }
        if let Some(sm) = &self.social_media {
            inf.social_media = Some(sm.clone());
        }
        if let Some(status) = self.status {
            inf.status = status;
        }
        inf.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub products: Option<Vec<OrderProduct>>,
    pub shipping_details: Option<ShippingDetails>,
    pub tracking_info: Option<TrackingInfo>,
    pub total_amount: Option<f64>,
}

impl OrderPatch {
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(products) = &self.products {
            order.products = products.clone();
        }
        if let Some(shipping) = &self.shipping_details {
            order.shipping_details = Some(shipping.clone());
        }
        if let Some(tracking) = &self.tracking_info {
            order.tracking_info = Some(tracking.clone());
        }
        if let Some(total) = self.total_amount {
            order.total_amount = total;
        }
        order.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPatch {
    pub status: Option<ContentStatus>,
    pub s3_link: Option<String>,
    pub edited_by: Option<String>,
}

impl ContentPatch {
    pub fn apply(&self, content: &mut Content, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            content.status = status;
        }
        if let Some(link) = &self.s3_link {
            content.s3_link = link.clone();
        }
        if let Some(editor) = &self.edited_by {
            content.edited_by = Some(editor.clone());
        }
        content.updated_at = now;
    }
}

/// Wizard-local line selection; flattened into `Order.products` at submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedItem {
    pub product_id: u64,
    pub variant_id: u64,
    pub title: String,
    pub price: f64,
    pub qty: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            InfluencerStatus::PendingApproval,
            InfluencerStatus::Approved,
            InfluencerStatus::Rejected,
            InfluencerStatus::OrderCreated,
            InfluencerStatus::PendingVideoUpload,
            InfluencerStatus::Completed,
        ] {
            assert_eq!(InfluencerStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(InfluencerStatus::parse("bogus"), None);

        for s in [
            OrderStatus::Created,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Completed,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn order_serializes_camel_case() {
        let order = Order {
            id: "o-1".into(),
            influencer_id: "inf-1".into(),
            company_id: "company-1".into(),
            shopify_order_id: "SHO-1".into(),
            status: OrderStatus::Created,
            products: vec![],
            shipping_details: None,
            tracking_info: None,
            total_amount: 0.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let v = serde_json::to_value(&order).unwrap();
        assert!(v.get("influencerId").is_some());
        assert!(v.get("shopifyOrderId").is_some());
        assert_eq!(v["status"], "Created");
    }
}
