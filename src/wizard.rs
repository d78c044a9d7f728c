//! Order placement workflow.
//!
//! A linear four-step wizard with back-navigation. Placement is best-effort
//! and not atomic: the commerce order is attempted first and its failure is
//! swallowed (a locally generated id stands in), the local order record is
//! the one fatal step, and the influencer status flag afterwards is fire and
//! forget. State is only cleared once the local record exists, so a failed
//! submission can be retried from the review step.
use crate::model::{
    Influencer, InfluencerPatch, InfluencerStatus, NewOrder, Order, OrderProduct, OrderStatus,
    Product, SelectedItem, ShippingDetails, TrackingInfo, Variant,
};
use crate::shopify::CommerceService;
use crate::store::{Repository, StoreError};
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{0}")]
    Guard(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    SelectInfluencer,
    SelectProducts,
    ShippingDetails,
    ReviewAndSubmit,
}

#[derive(Debug, Default)]
pub struct OrderWizard {
    step: Step,
    influencer: Option<Influencer>,
    selected: Vec<SelectedItem>,
    shipping: ShippingDetails,
    zero_value: bool,
}

impl OrderWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn influencer(&self) -> Option<&Influencer> {
        self.influencer.as_ref()
    }

    pub fn selected(&self) -> &[SelectedItem] {
        &self.selected
    }

    pub fn shipping(&self) -> &ShippingDetails {
        &self.shipping
    }

    pub fn set_shipping(&mut self, shipping: ShippingDetails) {
        self.shipping = shipping;
    }

    pub fn zero_value(&self) -> bool {
        self.zero_value
    }

    pub fn set_zero_value(&mut self, zero_value: bool) {
        self.zero_value = zero_value;
    }

    /// Select the influencer and pre-seed the shipping form from their
    /// profile. Explicit form edits afterwards win.
    pub fn select_influencer(&mut self, influencer: Influencer) {
        let (first, last) = split_name(&influencer.name);
        self.shipping.first_name = first;
        self.shipping.last_name = last;
        if let Some(address) = &influencer.address {
            self.shipping.address = address.clone();
        }
        self.shipping.email = influencer.email.clone();
        self.shipping.phone = influencer.phone.clone();
        self.influencer = Some(influencer);
    }

    /// Move to the next step, enforcing the guard for the current one.
    pub fn advance(&mut self) -> Result<Step, WizardError> {
        let next = match self.step() {
            Step::SelectInfluencer => {
                if self.influencer.is_none() {
                    return Err(WizardError::Guard("select an influencer first"));
                }
                Step::SelectProducts
            }
            Step::SelectProducts => {
                if self.selected.is_empty() {
                    return Err(WizardError::Guard("select at least one product"));
                }
                Step::ShippingDetails
            }
            Step::ShippingDetails => {
                let s = &self.shipping;
                let complete = !s.first_name.trim().is_empty()
                    && !s.last_name.trim().is_empty()
                    && !s.address.trim().is_empty()
                    && !s.city.trim().is_empty()
                    && !s.state.trim().is_empty()
                    && !s.zip_code.trim().is_empty();
                if !complete {
                    return Err(WizardError::Guard("fill in all shipping fields"));
                }
                Step::ReviewAndSubmit
            }
            Step::ReviewAndSubmit => {
                return Err(WizardError::Guard("already at the review step"));
            }
        };
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Step {
        let prev = match self.step() {
            Step::SelectInfluencer | Step::SelectProducts => Step::SelectInfluencer,
            Step::ShippingDetails => Step::SelectProducts,
            Step::ReviewAndSubmit => Step::ShippingDetails,
        };
        self.step = prev;
        prev
    }

    /// Add one unit of a variant; an existing line gets its qty bumped, a
    /// variant never appears in the selection twice.
    pub fn add_variant(&mut self, product: &Product, variant: &Variant) {
        if let Some(line) = self
            .selected
            .iter_mut()
            .find(|l| l.variant_id == variant.variant_id)
        {
            line.qty += 1;
            return;
        }
        self.selected.push(SelectedItem {
            product_id: product.id,
            variant_id: variant.variant_id,
            title: line_title(&product.title, &variant.title),
            price: variant.price,
            qty: 1,
        });
    }

    /// Replace the selection wholesale, merging duplicate variant lines so
    /// the one-line-per-variant invariant holds for API-supplied selections
    /// too.
    pub fn set_selection(&mut self, items: Vec<SelectedItem>) {
        self.selected.clear();
        for item in items {
            if item.qty == 0 {
                continue;
            }
            if let Some(line) = self
                .selected
                .iter_mut()
                .find(|l| l.variant_id == item.variant_id)
            {
                line.qty += item.qty;
            } else {
                self.selected.push(item);
            }
        }
    }

    /// Set the qty of a selected variant; zero or negative removes the line.
    pub fn update_selected_qty(&mut self, variant_id: u64, qty: i64) {
        if qty <= 0 {
            self.selected.retain(|l| l.variant_id != variant_id);
            return;
        }
        if let Some(line) = self.selected.iter_mut().find(|l| l.variant_id == variant_id) {
            line.qty = qty as u32;
        }
    }

    pub fn variant_qty(&self, variant_id: u64) -> u32 {
        self.selected
            .iter()
            .find(|l| l.variant_id == variant_id)
            .map(|l| l.qty)
            .unwrap_or(0)
    }

    /// Total units across all selected lines.
    pub fn selected_count(&self) -> u32 {
        self.selected.iter().map(|l| l.qty).sum()
    }

    /// Sticker total of the selection, recomputed fresh on every call.
    pub fn selected_total(&self) -> f64 {
        self.selected
            .iter()
            .map(|l| l.price * f64::from(l.qty))
            .sum()
    }

    pub fn real_subtotal(&self) -> f64 {
        self.selected_total()
    }

    pub fn real_shipping(&self) -> f64 {
        0.0
    }

    pub fn real_tax(&self) -> f64 {
        0.0
    }

    /// When the zero-value toggle is on the discount cancels the whole bill.
    pub fn real_discount(&self) -> f64 {
        if self.zero_value {
            self.real_subtotal() + self.real_shipping() + self.real_tax()
        } else {
            0.0
        }
    }

    pub fn real_total(&self) -> f64 {
        self.real_subtotal() + self.real_shipping() + self.real_tax() - self.real_discount()
    }

    /// Submit the order from the review step.
    pub async fn place_order(
        &mut self,
        repo: &Repository,
        commerce: &dyn CommerceService,
    ) -> Result<Order, WizardError> {
        if self.step() != Step::ReviewAndSubmit {
            return Err(WizardError::Guard("finish the wizard before submitting"));
        }
        let influencer = self
            .influencer
            .clone()
            .ok_or(WizardError::Guard("select an influencer first"))?;

        // The commerce side gets the influencer's own name split into
        // first/last; the local record keeps the form as entered.
        let (first, last) = split_name(&influencer.name);
        let mut commerce_shipping = self.shipping.clone();
        commerce_shipping.first_name = first;
        commerce_shipping.last_name = last;
        if commerce_shipping.email.trim().is_empty() {
            commerce_shipping.email = influencer.email.clone();
        }

        let shopify_order_id = match commerce
            .create_order(&self.selected, &commerce_shipping, self.zero_value)
            .await
        {
            Ok(id) if !id.is_empty() => id,
            Ok(_) => fallback_order_id(),
            Err(err) => {
                warn!(error = %err, "commerce order create failed, continuing with local id");
                fallback_order_id()
            }
        };

        let products: Vec<OrderProduct> = self
            .selected
            .iter()
            .map(|l| OrderProduct {
                id: l.variant_id.to_string(),
                name: l.title.clone(),
                price: l.price,
                quantity: l.qty,
                image: None,
            })
            .collect();

        let (order, _) = repo
            .create_order(NewOrder {
                influencer_id: influencer.id.clone(),
                company_id: "company-1".to_string(),
                shopify_order_id,
                status: Some(OrderStatus::Created),
                products,
                shipping_details: Some(self.shipping.clone()),
                tracking_info: Some(TrackingInfo {
                    status: "Processing".to_string(),
                    estimated_delivery: Some(Utc::now() + Duration::days(14)),
                    ..Default::default()
                }),
                total_amount: self.real_total(),
            })
            .await?;
        info!(order_id = %order.id, influencer_id = %influencer.id, "order placed");

        if let Err(err) = repo
            .update_influencer(
                &influencer.id,
                &InfluencerPatch::status(InfluencerStatus::OrderCreated),
            )
            .await
        {
            warn!(error = %err, influencer_id = %influencer.id, "failed to flag influencer OrderCreated");
        }

        self.reset();
        Ok(order)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn line_title(product_title: &str, variant_title: &str) -> String {
    if variant_title.is_empty()
        || variant_title == "Default Title"
        || variant_title == "Default"
        || variant_title == product_title
    {
        product_title.to_string()
    } else {
        format!("{} - {}", product_title, variant_title)
    }
}

fn fallback_order_id() -> String {
    format!("SHO-{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn influencer() -> Influencer {
        Influencer {
            id: "inf-1".into(),
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone: "+91 98765".into(),
            age: None,
            gender: None,
            address: Some("12 Park Lane".into()),
            social_media: None,
            status: InfluencerStatus::Approved,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shirt() -> Product {
        Product {
            id: 100,
            title: "T-Shirt".into(),
            thumbnail: None,
            variants: vec![
                Variant {
                    variant_id: 501,
                    title: "Default Title".into(),
                    price: 20.0,
                    compare_at_price: None,
                    stock: 10,
                    image: None,
                },
                Variant {
                    variant_id: 502,
                    title: "L".into(),
                    price: 22.0,
                    compare_at_price: None,
                    stock: 4,
                    image: None,
                },
            ],
            total_stock: 14,
        }
    }

    fn fill_shipping(w: &mut OrderWizard) {
        w.set_shipping(ShippingDetails {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            address: "12 Park Lane".into(),
            city: "Mumbai".into(),
            state: "MH".into(),
            zip_code: "400001".into(),
            phone: String::new(),
            email: String::new(),
        });
    }

    #[test]
    fn advance_enforces_guards_in_order() {
        let mut w = OrderWizard::new();
        assert!(matches!(w.advance(), Err(WizardError::Guard(_))));

        w.select_influencer(influencer());
        assert_eq!(w.advance().unwrap(), Step::SelectProducts);
        assert!(matches!(w.advance(), Err(WizardError::Guard(_))));

        let p = shirt();
        w.add_variant(&p, &p.variants[0]);
        assert_eq!(w.advance().unwrap(), Step::ShippingDetails);

        w.set_shipping(ShippingDetails::default());
        assert!(matches!(w.advance(), Err(WizardError::Guard(_))));
        fill_shipping(&mut w);
        assert_eq!(w.advance().unwrap(), Step::ReviewAndSubmit);
        assert!(matches!(w.advance(), Err(WizardError::Guard(_))));
    }

    #[test]
    fn back_navigation_walks_steps() {
        let mut w = OrderWizard::new();
        w.select_influencer(influencer());
        w.advance().unwrap();
        assert_eq!(w.back(), Step::SelectInfluencer);
        assert_eq!(w.back(), Step::SelectInfluencer);
    }

    #[test]
    fn add_variant_never_duplicates_a_line() {
        let mut w = OrderWizard::new();
        let p = shirt();
        w.add_variant(&p, &p.variants[0]);
        w.add_variant(&p, &p.variants[0]);
        w.add_variant(&p, &p.variants[1]);

        assert_eq!(w.selected().len(), 2);
        assert_eq!(w.variant_qty(501), 2);
        assert_eq!(w.variant_qty(502), 1);
        assert_eq!(w.selected_count(), 3);
        // Default variant titles collapse to the product title.
        assert_eq!(w.selected()[0].title, "T-Shirt");
        assert_eq!(w.selected()[1].title, "T-Shirt - L");
    }

    #[test]
    fn qty_update_to_zero_removes_the_line() {
        let mut w = OrderWizard::new();
        let p = shirt();
        w.add_variant(&p, &p.variants[0]);
        w.update_selected_qty(501, 5);
        assert_eq!(w.variant_qty(501), 5);

        w.update_selected_qty(501, 0);
        assert!(w.selected().is_empty());
        assert_eq!(w.variant_qty(501), 0);
    }

    #[test]
    fn zero_value_toggle_zeroes_the_total() {
        let mut w = OrderWizard::new();
        let p = shirt();
        w.add_variant(&p, &p.variants[0]);
        w.add_variant(&p, &p.variants[0]);
        assert_eq!(w.selected_total(), 40.0);
        assert_eq!(w.real_total(), 40.0);

        w.set_zero_value(true);
        assert_eq!(w.real_discount(), 40.0);
        assert_eq!(w.real_total(), 0.0);

        w.set_zero_value(false);
        assert_eq!(w.real_total(), 40.0);
    }

    #[test]
    fn selecting_influencer_preseeds_shipping() {
        let mut w = OrderWizard::new();
        w.select_influencer(influencer());
        assert_eq!(w.shipping().first_name, "Jane");
        assert_eq!(w.shipping().last_name, "Doe");
        assert_eq!(w.shipping().address, "12 Park Lane");
        assert_eq!(w.shipping().email, "jane@example.com");
    }

    #[test]
    fn single_word_name_has_empty_last_name() {
        let (first, last) = split_name("Cher");
        assert_eq!(first, "Cher");
        assert_eq!(last, "");

        let (first, last) = split_name("Mary Jane  Watson");
        assert_eq!(first, "Mary");
        assert_eq!(last, "Jane Watson");
    }
}
