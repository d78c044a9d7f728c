//! Normalization of Shopify Admin API product payloads.
//!
//! Upstream payloads vary between the raw Admin API shape (`variants[].id`,
//! decimal-string prices, `inventory_quantity`) and already-normalized items,
//! so every field is read with an explicit priority order.
use crate::model::{Product, Variant};
use serde_json::Value;

fn text(item: &Value, field: &str) -> Option<String> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Prices arrive either as numbers or as decimal strings like `"19.99"`.
fn price(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn stock_of(item: &Value) -> Option<i64> {
    item.get("stock")
        .and_then(Value::as_i64)
        .or_else(|| item.get("inventory_quantity").and_then(Value::as_i64))
        .or_else(|| item.get("inventory").and_then(Value::as_i64))
}

fn image_of(item: &Value) -> Option<String> {
    item.get("image")
        .and_then(|img| text(img, "src"))
        .or_else(|| text(item, "image"))
        .or_else(|| item.get("thumbnail").and_then(|t| text(t, "src")))
        .or_else(|| text(item, "thumbnail"))
}

fn normalize_variant(v: &Value, fallback_image: Option<&str>) -> Option<Variant> {
    let variant_id = v
        .get("id")
        .and_then(Value::as_u64)
        .or_else(|| v.get("variantId").and_then(Value::as_u64))?;
    Some(Variant {
        variant_id,
        title: text(v, "title").unwrap_or_else(|| "Default".to_string()),
        price: v.get("price").and_then(price).unwrap_or(0.0),
        compare_at_price: v
            .get("compare_at_price")
            .or_else(|| v.get("compareAtPrice"))
            .and_then(price),
        stock: stock_of(v).unwrap_or(50),
        image: image_of(v).or_else(|| fallback_image.map(str::to_string)),
    })
}

/// Normalize one product payload.
///
/// Field priority:
/// - title: `title`, then `name`
/// - thumbnail: `image.src`, then `thumbnail.src`, then `thumbnail`
/// - variants: `variants` array, else a single variant synthesized from the
///   product itself
/// - per-variant stock: `stock`, then `inventory_quantity`, then `inventory`,
///   else 50
pub fn normalize_product(item: &Value) -> Option<Product> {
    let id = item.get("id").and_then(Value::as_u64)?;
    let title = text(item, "title").or_else(|| text(item, "name"))?;
    let thumbnail = image_of(item);

    let variants: Vec<Variant> = match item.get("variants").and_then(Value::as_array) {
        Some(raw) if !raw.is_empty() => raw
            .iter()
            .filter_map(|v| normalize_variant(v, thumbnail.as_deref()))
            .collect(),
        _ => vec![Variant {
            variant_id: id,
            title: title.clone(),
            price: item.get("price").and_then(price).unwrap_or(0.0),
            compare_at_price: item
                .get("compare_at_price")
                .or_else(|| item.get("compareAtPrice"))
                .and_then(price),
            stock: stock_of(item).unwrap_or(50),
            image: thumbnail.clone(),
        }],
    };
    if variants.is_empty() {
        return None;
    }
    let total_stock = variants.iter().map(|v| v.stock).sum();

    Some(Product {
        id,
        title,
        thumbnail,
        variants,
        total_stock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_admin_api_shape_is_normalized() {
        let item = json!({
            "id": 100,
            "title": "T-Shirt",
            "image": { "src": "https://cdn/shirt.png" },
            "variants": [
                { "id": 501, "title": "M", "price": "20.00", "inventory_quantity": 4 },
                { "id": 502, "title": "L", "price": "22.00", "compare_at_price": "30.00" },
            ],
        });
        let p = normalize_product(&item).unwrap();
        assert_eq!(p.id, 100);
        assert_eq!(p.thumbnail.as_deref(), Some("https://cdn/shirt.png"));
        assert_eq!(p.variants.len(), 2);
        assert_eq!(p.variants[0].variant_id, 501);
        assert_eq!(p.variants[0].price, 20.0);
        assert_eq!(p.variants[0].stock, 4);
        assert_eq!(p.variants[1].compare_at_price, Some(30.0));
        assert_eq!(p.variants[1].stock, 50);
        assert_eq!(p.total_stock, 54);
        // Variants without their own image inherit the product thumbnail.
        assert_eq!(p.variants[0].image.as_deref(), Some("https://cdn/shirt.png"));
    }

    #[test]
    fn title_falls_back_to_name() {
        let item = json!({ "id": 7, "name": "Mug", "price": "12.50", "inventory": 3 });
        let p = normalize_product(&item).unwrap();
        assert_eq!(p.title, "Mug");
        assert_eq!(p.variants.len(), 1);
        assert_eq!(p.variants[0].variant_id, 7);
        assert_eq!(p.variants[0].price, 12.5);
        assert_eq!(p.total_stock, 3);
    }

    #[test]
    fn thumbnail_priority_is_image_src_first() {
        let item = json!({
            "id": 8,
            "title": "Cap",
            "image": { "src": "https://cdn/img.png" },
            "thumbnail": "https://cdn/thumb.png",
        });
        let p = normalize_product(&item).unwrap();
        assert_eq!(p.thumbnail.as_deref(), Some("https://cdn/img.png"));

        let item = json!({
            "id": 9,
            "title": "Cap",
            "thumbnail": { "src": "https://cdn/t2.png" },
        });
        let p = normalize_product(&item).unwrap();
        assert_eq!(p.thumbnail.as_deref(), Some("https://cdn/t2.png"));
    }

    #[test]
    fn missing_stock_defaults_to_fifty() {
        let item = json!({ "id": 10, "title": "Sticker", "price": 1.0 });
        let p = normalize_product(&item).unwrap();
        assert_eq!(p.total_stock, 50);
    }

    #[test]
    fn product_without_title_is_dropped() {
        assert!(normalize_product(&json!({ "id": 11 })).is_none());
        assert!(normalize_product(&json!({ "title": "No Id" })).is_none());
    }
}
