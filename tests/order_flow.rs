//! Order placement flow against recording fakes.
mod common;

use anyhow::anyhow;
use common::{repository, RecordingCommerce, RecordingTable};
use influencer_admin::model::{Product, Variant};
use influencer_admin::store::Source;
use influencer_admin::wizard::{OrderWizard, Step, WizardError};
use serde_json::json;
use std::sync::Arc;

fn seed_jane(table: &RecordingTable) {
    table.seed(
        "influencers",
        json!({
            "id": "inf-1",
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": "+91 98765",
            "role": "Approved",
            "companyId": "",
            "data": { "address": "12 Park Lane" },
            "createdAt": "2026-08-01T10:00:00Z",
            "updatedAt": "2026-08-01T10:00:00Z",
        }),
    );
}

fn shirt() -> Product {
    Product {
        id: 100,
        title: "T-Shirt".into(),
        thumbnail: None,
        variants: vec![Variant {
            variant_id: 501,
            title: "Default Title".into(),
            price: 20.0,
            compare_at_price: None,
            stock: 10,
            image: None,
        }],
        total_stock: 10,
    }
}

async fn wizard_at_review(
    repo: &influencer_admin::store::Repository,
    zero_value: bool,
) -> OrderWizard {
    let (inf, _) = repo.get_influencer("inf-1").await.unwrap();
    let mut w = OrderWizard::new();
    w.select_influencer(inf);
    w.advance().unwrap();

    let p = shirt();
    w.add_variant(&p, &p.variants[0]);
    w.add_variant(&p, &p.variants[0]);
    w.advance().unwrap();

    let mut shipping = w.shipping().clone();
    shipping.city = "Mumbai".into();
    shipping.state = "MH".into();
    shipping.zip_code = "400001".into();
    w.set_shipping(shipping);
    w.set_zero_value(zero_value);
    w.advance().unwrap();
    w
}

#[tokio::test]
async fn zero_value_order_happy_path() {
    let table = Arc::new(RecordingTable::default());
    seed_jane(&table);
    let repo = repository(table.clone());
    let commerce = RecordingCommerce::default().respond_with(Ok("555001".into()));

    let mut w = wizard_at_review(&repo, true).await;
    assert_eq!(w.real_total(), 0.0);

    let order = w.place_order(&repo, &commerce).await.unwrap();
    assert_eq!(order.shopify_order_id, "555001");
    assert_eq!(order.id, "555001");
    assert_eq!(order.total_amount, 0.0);
    assert_eq!(order.products.len(), 1);
    assert_eq!(order.products[0].id, "501");
    assert_eq!(order.products[0].name, "T-Shirt");
    assert_eq!(order.products[0].price, 20.0);
    assert_eq!(order.products[0].quantity, 2);

    {
        let calls = commerce.create_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (lines, shipping, zero_value) = &calls[0];
        assert!(zero_value);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].variant_id, 501);
        assert_eq!(lines[0].qty, 2);
        assert_eq!(shipping.first_name, "Jane");
        assert_eq!(shipping.last_name, "Doe");
        assert_eq!(shipping.email, "jane@example.com");
    }

    // Exactly one order stored, keyed by the commerce id.
    assert_eq!(table.table_len("orders"), 1);
    assert!(table.item("orders", "555001").is_some());

    // Influencer moved to OrderCreated, best-effort.
    let inf_item = table.item("influencers", "inf-1").unwrap();
    assert_eq!(inf_item["role"], "OrderCreated");

    // Wizard reset for the next order.
    assert_eq!(w.step(), Step::SelectInfluencer);
    assert!(w.selected().is_empty());
}

#[tokio::test]
async fn commerce_failure_falls_back_to_local_order_id() {
    let table = Arc::new(RecordingTable::default());
    seed_jane(&table);
    let repo = repository(table.clone());
    let commerce = RecordingCommerce::default().respond_with(Err(anyhow!("shopify down")));

    let mut w = wizard_at_review(&repo, true).await;
    let order = w.place_order(&repo, &commerce).await.unwrap();

    assert!(order.shopify_order_id.starts_with("SHO-"));
    assert_eq!(table.table_len("orders"), 1);
    assert_eq!(w.step(), Step::SelectInfluencer);
}

#[tokio::test]
async fn submitting_before_review_keeps_state_for_retry() {
    let table = Arc::new(RecordingTable::default());
    seed_jane(&table);
    let repo = repository(table.clone());
    let commerce = RecordingCommerce::default();

    let (inf, _) = repo.get_influencer("inf-1").await.unwrap();
    let mut w = OrderWizard::new();
    w.select_influencer(inf);
    w.advance().unwrap();
    let p = shirt();
    w.add_variant(&p, &p.variants[0]);

    let err = w.place_order(&repo, &commerce).await.unwrap_err();
    assert!(matches!(err, WizardError::Guard(_)));
    assert_eq!(w.step(), Step::SelectProducts);
    assert_eq!(w.selected().len(), 1);
    assert_eq!(table.table_len("orders"), 0);
}

#[tokio::test]
async fn full_outage_still_places_a_local_order() {
    let table = Arc::new(RecordingTable::default());
    seed_jane(&table);
    let repo = repository(table.clone());
    let commerce = RecordingCommerce::default().respond_with(Err(anyhow!("shopify down")));

    let mut w = wizard_at_review(&repo, false).await;
    table.set_offline(true);

    let order = w.place_order(&repo, &commerce).await.unwrap();
    assert!(order.shopify_order_id.starts_with("SHO-"));
    assert_eq!(order.total_amount, 40.0);

    // Nothing reached the remote store; the order lives in the fallback.
    assert_eq!(table.table_len("orders"), 0);
    let (got, source) = repo.get_order(&order.id).await.unwrap();
    assert_eq!(source, Source::Fallback);
    assert_eq!(got.products[0].quantity, 2);
    assert_eq!(w.step(), Step::SelectInfluencer);
}
