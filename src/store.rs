//! Repository over the BRMH table store with an in-memory fallback.
//!
//! Reads and writes go to the remote table store first. The process-local
//! maps hold only records the remote never acknowledged (creates during an
//! outage); they are never warmed from remote reads, so a healthy remote
//! answering "not there" stays NotFound even when the record was seen
//! before. When the remote is unreachable the repository serves those local
//! records instead; they get local UUIDs and are never reconciled back.
//! Every result carries a [`Source`] so callers can surface degraded reads.
use crate::brmh::{model as wire, TableStore};
use crate::config::Tables;
use crate::model::{
    Content, ContentPatch, ContentStatus, Influencer, InfluencerPatch, InfluencerStatus,
    MessageTemplate, NewContent, NewInfluencer, NewMessageTemplate, NewOrder, Order, OrderPatch,
    OrderStatus,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl StoreError {
    fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    fn invalid(msg: &str) -> Self {
        StoreError::Validation(msg.to_string())
    }
}

/// Where a result was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Fallback,
}

impl Source {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Source::Fallback)
    }
}

#[derive(Default)]
struct MemStore {
    influencers: Mutex<HashMap<String, Influencer>>,
    orders: Mutex<HashMap<String, Order>>,
    content: Mutex<HashMap<String, Content>>,
    templates: Mutex<HashMap<String, MessageTemplate>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parse_items<T>(
    items: Vec<Value>,
    entity: &'static str,
    parse: impl Fn(&Value) -> anyhow::Result<T>,
) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match parse(item) {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(entity, error = %err, "skipping malformed table item");
                None
            }
        })
        .collect()
}

pub struct Repository {
    store: Arc<dyn TableStore>,
    tables: Tables,
    mem: MemStore,
}

impl Repository {
    pub fn new(store: Arc<dyn TableStore>, tables: Tables) -> Self {
        Self {
            store,
            tables,
            mem: MemStore::default(),
        }
    }

    // ---- influencers ----

    pub async fn list_influencers(&self) -> Result<(Vec<Influencer>, Source), StoreError> {
        match self.store.list(&self.tables.influencers).await {
            Ok(items) => {
                let mut list = parse_items(items, "influencer", wire::influencer_from_item);
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Remote))
            }
            Err(err) => {
                warn!(error = %err, "influencer list unavailable, serving fallback");
                let mut list: Vec<_> = lock(&self.mem.influencers).values().cloned().collect();
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Fallback))
            }
        }
    }

    pub async fn get_influencer(&self, id: &str) -> Result<(Influencer, Source), StoreError> {
        match self.store.get(&self.tables.influencers, id).await {
            Ok(Some(item)) => Ok((wire::influencer_from_item(&item)?, Source::Remote)),
            // A healthy remote answering "not there" is final unless the
            // record was created here during an outage.
            Ok(None) => lock(&self.mem.influencers)
                .get(id)
                .cloned()
                .map(|inf| (inf, Source::Fallback))
                .ok_or_else(|| StoreError::not_found("influencer", id)),
            Err(err) => lock(&self.mem.influencers)
                .get(id)
                .cloned()
                .map(|inf| (inf, Source::Fallback))
                .ok_or(StoreError::Remote(err)),
        }
    }

    pub async fn create_influencer(
        &self,
        new: NewInfluencer,
    ) -> Result<(Influencer, Source), StoreError> {
        if new.name.trim().is_empty() {
            return Err(StoreError::invalid("name must be non-empty"));
        }
        if new.email.trim().is_empty() {
            return Err(StoreError::invalid("email must be non-empty"));
        }
        let now = Utc::now();
        let mut inf = Influencer {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            age: new.age,
            gender: new.gender,
            address: new.address,
            social_media: new.social_media,
            status: new.status.unwrap_or(InfluencerStatus::PendingApproval),
            created_at: now,
            updated_at: now,
        };
        let source = match self
            .store
            .create(&self.tables.influencers, wire::influencer_to_item(&inf))
            .await
        {
            Ok(item_id) => {
                if !item_id.is_empty() {
                    inf.id = item_id;
                }
                Source::Remote
            }
            Err(err) => {
                warn!(error = %err, "influencer create unavailable, keeping local copy");
                lock(&self.mem.influencers).insert(inf.id.clone(), inf.clone());
                Source::Fallback
            }
        };
        Ok((inf, source))
    }

    pub async fn update_influencer(
        &self,
        id: &str,
        patch: &InfluencerPatch,
    ) -> Result<(Influencer, Source), StoreError> {
        let now = Utc::now();
        let (mut inf, source) = self.get_influencer(id).await?;
        patch.apply(&mut inf, now);
        match source {
            Source::Remote => {
                match self
                    .store
                    .update(
                        &self.tables.influencers,
                        id,
                        wire::influencer_updates(patch, &inf, now),
                    )
                    .await
                {
                    Ok(()) => Ok((inf, Source::Remote)),
                    Err(err) => {
                        warn!(error = %err, id, "influencer update unavailable, returning unsaved copy");
                        Ok((inf, Source::Fallback))
                    }
                }
            }
            Source::Fallback => {
                lock(&self.mem.influencers).insert(inf.id.clone(), inf.clone());
                Ok((inf, Source::Fallback))
            }
        }
    }

    /// The local copy is only dropped once the remote outcome is known, so a
    /// failed remote delete leaves the record resolvable.
    pub async fn delete_influencer(&self, id: &str) -> Result<(), StoreError> {
        match self.store.get(&self.tables.influencers, id).await {
            Ok(Some(_)) => {
                self.store.delete(&self.tables.influencers, id).await?;
                lock(&self.mem.influencers).remove(id);
                Ok(())
            }
            Ok(None) => {
                if lock(&self.mem.influencers).remove(id).is_some() {
                    Ok(())
                } else {
                    Err(StoreError::not_found("influencer", id))
                }
            }
            Err(err) => {
                if lock(&self.mem.influencers).remove(id).is_some() {
                    warn!(error = %err, id, "influencer delete unavailable, removed local copy only");
                    Ok(())
                } else {
                    Err(StoreError::Remote(err))
                }
            }
        }
    }

    // ---- orders ----

    pub async fn list_orders(&self) -> Result<(Vec<Order>, Source), StoreError> {
        match self.store.list(&self.tables.orders).await {
            Ok(items) => {
                let mut list = parse_items(items, "order", wire::order_from_item);
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Remote))
            }
            Err(err) => {
                warn!(error = %err, "order list unavailable, serving fallback");
                let mut list: Vec<_> = lock(&self.mem.orders).values().cloned().collect();
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Fallback))
            }
        }
    }

    pub async fn get_order(&self, id: &str) -> Result<(Order, Source), StoreError> {
        match self.store.get(&self.tables.orders, id).await {
            Ok(Some(item)) => Ok((wire::order_from_item(&item)?, Source::Remote)),
            Ok(None) => lock(&self.mem.orders)
                .get(id)
                .cloned()
                .map(|order| (order, Source::Fallback))
                .ok_or_else(|| StoreError::not_found("order", id)),
            Err(err) => lock(&self.mem.orders)
                .get(id)
                .cloned()
                .map(|order| (order, Source::Fallback))
                .ok_or(StoreError::Remote(err)),
        }
    }

    /// Orders are keyed by their external commerce id when one exists, so a
    /// webhook lookup scans the full list and matches either identifier.
    pub async fn find_order_by_shopify_id(
        &self,
        shopify_order_id: &str,
    ) -> Result<Option<(Order, Source)>, StoreError> {
        let (orders, source) = self.list_orders().await?;
        Ok(orders
            .into_iter()
            .find(|o| o.shopify_order_id == shopify_order_id || o.id == shopify_order_id)
            .map(|o| (o, source)))
    }

    pub async fn create_order(&self, new: NewOrder) -> Result<(Order, Source), StoreError> {
        if new.influencer_id.trim().is_empty() {
            return Err(StoreError::invalid("influencerId must be non-empty"));
        }
        if new.shopify_order_id.trim().is_empty() {
            return Err(StoreError::invalid("shopifyOrderId must be non-empty"));
        }
        let now = Utc::now();
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            influencer_id: new.influencer_id,
            company_id: new.company_id,
            shopify_order_id: new.shopify_order_id,
            status: new.status.unwrap_or(OrderStatus::Created),
            products: new.products,
            shipping_details: new.shipping_details,
            tracking_info: new.tracking_info,
            total_amount: new.total_amount,
            created_at: now,
            updated_at: now,
        };
        let source = match self
            .store
            .create(&self.tables.orders, wire::order_to_item(&order))
            .await
        {
            Ok(item_id) => {
                if !item_id.is_empty() {
                    order.id = item_id;
                }
                Source::Remote
            }
            Err(err) => {
                warn!(error = %err, "order create unavailable, keeping local copy");
                lock(&self.mem.orders).insert(order.id.clone(), order.clone());
                Source::Fallback
            }
        };
        Ok((order, source))
    }

    pub async fn update_order(
        &self,
        id: &str,
        patch: &OrderPatch,
    ) -> Result<(Order, Source), StoreError> {
        let now = Utc::now();
        let (mut order, source) = self.get_order(id).await?;
        patch.apply(&mut order, now);
        match source {
            Source::Remote => {
                match self
                    .store
                    .update(&self.tables.orders, id, wire::order_updates(patch, &order, now))
                    .await
                {
                    Ok(()) => Ok((order, Source::Remote)),
                    Err(err) => {
                        warn!(error = %err, id, "order update unavailable, returning unsaved copy");
                        Ok((order, Source::Fallback))
                    }
                }
            }
            Source::Fallback => {
                lock(&self.mem.orders).insert(order.id.clone(), order.clone());
                Ok((order, Source::Fallback))
            }
        }
    }

    // ---- content ----

    pub async fn list_content(&self) -> Result<(Vec<Content>, Source), StoreError> {
        match self.store.list(&self.tables.content).await {
            Ok(items) => {
                let mut list = parse_items(items, "content", wire::content_from_item);
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Remote))
            }
            Err(err) => {
                warn!(error = %err, "content list unavailable, serving fallback");
                let mut list: Vec<_> = lock(&self.mem.content).values().cloned().collect();
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Fallback))
            }
        }
    }

    pub async fn create_content(&self, new: NewContent) -> Result<(Content, Source), StoreError> {
        if new.influencer_id.trim().is_empty() {
            return Err(StoreError::invalid("influencerId must be non-empty"));
        }
        if new.order_id.trim().is_empty() {
            return Err(StoreError::invalid("orderId must be non-empty"));
        }
        if new.s3_link.trim().is_empty() {
            return Err(StoreError::invalid("s3Link must be non-empty"));
        }
        let now = Utc::now();
        let mut content = Content {
            id: Uuid::new_v4().to_string(),
            content_type: new.content_type,
            s3_link: new.s3_link,
            status: new.status.unwrap_or(ContentStatus::PendingUpload),
            influencer_id: new.influencer_id,
            order_id: new.order_id,
            company_id: new.company_id,
            edited_by: new.edited_by,
            created_at: now,
            updated_at: now,
        };
        let item = wire::content_to_item(&content)?;
        let source = match self.store.create(&self.tables.content, item).await {
            Ok(item_id) => {
                if !item_id.is_empty() {
                    content.id = item_id;
                }
                Source::Remote
            }
            Err(err) => {
                warn!(error = %err, "content create unavailable, keeping local copy");
                lock(&self.mem.content).insert(content.id.clone(), content.clone());
                Source::Fallback
            }
        };
        Ok((content, source))
    }

    pub async fn update_content(
        &self,
        id: &str,
        patch: &ContentPatch,
    ) -> Result<(Content, Source), StoreError> {
        let now = Utc::now();
        let (mut content, source) = match self.store.get(&self.tables.content, id).await {
            Ok(Some(item)) => (wire::content_from_item(&item)?, Source::Remote),
            Ok(None) => lock(&self.mem.content)
                .get(id)
                .cloned()
                .map(|c| (c, Source::Fallback))
                .ok_or_else(|| StoreError::not_found("content", id))?,
            Err(err) => lock(&self.mem.content)
                .get(id)
                .cloned()
                .map(|c| (c, Source::Fallback))
                .ok_or(StoreError::Remote(err))?,
        };
        patch.apply(&mut content, now);
        match source {
            Source::Remote => {
                match self
                    .store
                    .update(&self.tables.content, id, wire::content_updates(patch, now))
                    .await
                {
                    Ok(()) => Ok((content, Source::Remote)),
                    Err(err) => {
                        warn!(error = %err, id, "content update unavailable, returning unsaved copy");
                        Ok((content, Source::Fallback))
                    }
                }
            }
            Source::Fallback => {
                lock(&self.mem.content).insert(content.id.clone(), content.clone());
                Ok((content, Source::Fallback))
            }
        }
    }

    // ---- message templates ----

    pub async fn list_templates(&self) -> Result<(Vec<MessageTemplate>, Source), StoreError> {
        match self.store.list(&self.tables.templates).await {
            Ok(items) => {
                let mut list = parse_items(items, "template", wire::template_from_item);
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Remote))
            }
            Err(err) => {
                warn!(error = %err, "template list unavailable, serving fallback");
                let mut list: Vec<_> = lock(&self.mem.templates).values().cloned().collect();
                list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok((list, Source::Fallback))
            }
        }
    }

    pub async fn create_template(
        &self,
        new: NewMessageTemplate,
    ) -> Result<(MessageTemplate, Source), StoreError> {
        if new.message.trim().is_empty() {
            return Err(StoreError::invalid("message must be non-empty"));
        }
        if new.workflow_category.trim().is_empty() {
            return Err(StoreError::invalid("workflowCategory must be non-empty"));
        }
        let now = Utc::now();
        let mut template = MessageTemplate {
            id: Uuid::new_v4().to_string(),
            template_type: new.template_type,
            message: new.message,
            workflow_category: new.workflow_category,
            created_at: now,
            updated_at: now,
        };
        let item = wire::template_to_item(&template)?;
        let source = match self.store.create(&self.tables.templates, item).await {
            Ok(item_id) => {
                if !item_id.is_empty() {
                    template.id = item_id;
                }
                Source::Remote
            }
            Err(err) => {
                warn!(error = %err, "template create unavailable, keeping local copy");
                lock(&self.mem.templates).insert(template.id.clone(), template.clone());
                Source::Fallback
            }
        };
        Ok((template, source))
    }
}
