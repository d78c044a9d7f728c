//! Catalog search: the commerce client with the search cache in front.
use crate::cache::{CachedPage, SearchCache};
use crate::model::Product;
use crate::shopify::{CommerceService, ProductQuery};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    /// Matching-product total; only known for first-page searches.
    pub total_count: Option<u64>,
    pub next_page_info: Option<String>,
    pub prev_page_info: Option<String>,
    pub cached: bool,
}

pub struct Catalog {
    commerce: Arc<dyn CommerceService>,
    cache: SearchCache,
}

impl Catalog {
    pub fn new(commerce: Arc<dyn CommerceService>, cache: SearchCache) -> Self {
        Self { commerce, cache }
    }

    /// First-page search. Served from the cache when a fresh entry exists for
    /// the trimmed query; a miss fetches from the commerce API and fills the
    /// cache.
    pub async fn search(&self, query: &str, limit: u32) -> Result<CatalogPage> {
        if let Some(page) = self.cache.get(query) {
            debug!(query, "product search served from cache");
            return Ok(CatalogPage {
                products: page.products,
                total_count: Some(page.total_count),
                next_page_info: page.next_page_info,
                prev_page_info: None,
                cached: true,
            });
        }

        let pq = ProductQuery {
            title: Some(query.trim().to_string()).filter(|q| !q.is_empty()),
            vendor: None,
            page_info: None,
            limit,
        };
        let page = self.commerce.list_products(&pq).await?;
        let total_count = match self.commerce.products_count(&pq).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "product count unavailable, using page size");
                page.products.len() as u64
            }
        };

        self.cache.put(
            query,
            CachedPage {
                products: page.products.clone(),
                total_count,
                next_page_info: page.next_page_info.clone(),
            },
        );

        Ok(CatalogPage {
            products: page.products,
            total_count: Some(total_count),
            next_page_info: page.next_page_info,
            prev_page_info: page.prev_page_info,
            cached: false,
        })
    }

    /// Cursor continuation. Never consults or fills the cache and reports no
    /// total; callers keep the one from the first page and append,
    /// deduplicating by product id.
    pub async fn continue_from(&self, page_info: &str, limit: u32) -> Result<CatalogPage> {
        let pq = ProductQuery {
            title: None,
            vendor: None,
            page_info: Some(page_info.to_string()),
            limit,
        };
        let page = self.commerce.list_products(&pq).await?;
        Ok(CatalogPage {
            products: page.products,
            total_count: None,
            next_page_info: page.next_page_info,
            prev_page_info: page.prev_page_info,
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SelectedItem, ShippingDetails, Variant};
    use crate::shopify::ProductPage;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingCommerce {
        list_calls: AtomicUsize,
        next_page_info: Option<String>,
    }

    impl CountingCommerce {
        fn new(next_page_info: Option<&str>) -> Self {
            Self {
                list_calls: AtomicUsize::new(0),
                next_page_info: next_page_info.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl CommerceService for CountingCommerce {
        async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let id = if query.page_info.is_some() { 2 } else { 1 };
            Ok(ProductPage {
                products: vec![Product {
                    id,
                    title: format!("Product {}", id),
                    thumbnail: None,
                    variants: vec![Variant {
                        variant_id: id * 100,
                        title: "Default".into(),
                        price: 10.0,
                        compare_at_price: None,
                        stock: 1,
                        image: None,
                    }],
                    total_stock: 1,
                }],
                next_page_info: self.next_page_info.clone(),
                prev_page_info: None,
            })
        }

        async fn products_count(&self, _query: &ProductQuery) -> Result<u64> {
            Ok(10)
        }

        async fn create_order(
            &self,
            _lines: &[SelectedItem],
            _shipping: &ShippingDetails,
            _zero_value: bool,
        ) -> Result<String> {
            Err(anyhow!("not a storefront"))
        }
    }

    #[tokio::test]
    async fn repeated_search_within_ttl_hits_cache() {
        let td = tempdir().unwrap();
        let commerce = Arc::new(CountingCommerce::new(Some("cursor-1")));
        let catalog = Catalog::new(commerce.clone(), SearchCache::new(td.path(), 300));

        let first = catalog.search("shirt", 20).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.total_count, Some(10));

        let second = catalog.search("shirt", 20).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.next_page_info.as_deref(), Some("cursor-1"));
        assert_eq!(commerce.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cursor_continuation_bypasses_cache() {
        let td = tempdir().unwrap();
        let commerce = Arc::new(CountingCommerce::new(None));
        let catalog = Catalog::new(commerce.clone(), SearchCache::new(td.path(), 300));

        catalog.search("", 20).await.unwrap();
        let cont = catalog.continue_from("cursor-1", 20).await.unwrap();
        assert_eq!(cont.total_count, None);
        catalog.continue_from("cursor-1", 20).await.unwrap();
        assert_eq!(commerce.list_calls.load(Ordering::SeqCst), 3);
    }
}
