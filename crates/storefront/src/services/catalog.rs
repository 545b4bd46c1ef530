//! Product catalog.
//!
//! Products change rarely, so listings and single products are cached with
//! `moka` for the configured TTL. Admin writes call [`CatalogService::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use indian_flavour_core::{Product, ProductId};
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::backend::{BackendClient, BackendError, Direction};

const PRODUCTS_TABLE: &str = "products";

/// Errors from loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to load products")]
    Backend(#[from] BackendError),

    #[error("Product not found")]
    NotFound(ProductId),
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    All,
    Product(ProductId),
}

#[derive(Debug, Clone)]
enum CacheValue {
    All(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// Read access to the product catalog.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    client: BackendClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("cached_entries", &self.inner.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    /// Create a catalog reading through `client` (the anonymous client is
    /// enough: products are public).
    #[must_use]
    pub fn new(client: BackendClient, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(500).time_to_live(ttl).build();
        Self {
            inner: Arc::new(CatalogServiceInner { client, cache }),
        }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Backend` if the products cannot be loaded.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(CacheValue::All(products)) = self.inner.cache.get(&CacheKey::All).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .inner
            .client
            .from(PRODUCTS_TABLE)
            .select("*")
            .order("created_at", Direction::Descending)
            .fetch()
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching products"))?;

        let products = Arc::new(products);
        self.inner
            .cache
            .insert(CacheKey::All, CacheValue::All(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// One product by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .inner
            .client
            .from(PRODUCTS_TABLE)
            .select("*")
            .eq("id", id)
            .fetch_optional()
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching product"))?
            .ok_or(CatalogError::NotFound(id))?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Drop every cached entry.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
        debug!("Catalog cache invalidated");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;

    fn product_row(id: ProductId, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "description": "Fresh from the tandoor",
            "price": "250.00",
            "image_url": null,
            "created_at": "2024-04-01T10:00:00Z",
            "updated_at": "2024-04-01T10:00:00Z"
        })
    }

    fn catalog_for(server: &MockServer) -> CatalogService {
        let config =
            BackendConfig::new(&server.uri(), SecretString::from("anon-test-key")).unwrap();
        CatalogService::new(
            BackendClient::new(&config).unwrap(),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_list_products_is_cached_until_invalidated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                product_row(ProductId::random(), "Paneer Tikka"),
                product_row(ProductId::random(), "Veg Biryani"),
            ])))
            .expect(2)
            .mount(&server)
            .await;

        let catalog = catalog_for(&server);
        let first = catalog.list_products().await.unwrap();
        let second = catalog.list_products().await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "Paneer Tikka");
        assert!(Arc::ptr_eq(&first, &second));

        catalog.invalidate().await;
        catalog.list_products().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_product_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server);
        let id = ProductId::random();
        let err = catalog.get_product(id).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_backend_failure_has_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "code": "XX000", "message": "internal error", "details": null, "hint": null
            })))
            .mount(&server)
            .await;

        let catalog = catalog_for(&server);
        let err = catalog.list_products().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to load products");
    }
}
