//! Product Service - read-through caching, invalidation and event emission
//!
//! The store is authoritative and its failures propagate. The cache and the
//! event publisher are reached only through [`CacheHandle`] and [`Notifier`],
//! whose operations cannot fail from the caller's point of view.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use validator::Validate;

use crate::cache::ProductCache;
use crate::error::{CacheError, ProductError, ProductResult, PublishError};
use crate::events::{
    EventPublisher, PRODUCT_CREATED, PRODUCT_DELETED, PRODUCT_UPDATED, ProductEvent,
};
use crate::models::{Product, ProductFilter, ProductInput};
use crate::repository::{ProductRepository, canonical_id};

/// How long a product stays cached after a store read.
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on a single publish when no service deadline is set.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

pub fn cache_key(id: &str) -> String {
    format!("product:{id}")
}

/// Best-effort cache access. Errors and timeouts are logged and absorbed.
#[derive(Clone)]
pub struct CacheHandle {
    inner: Arc<dyn ProductCache>,
    deadline: Option<Duration>,
}

impl CacheHandle {
    fn new(inner: Arc<dyn ProductCache>) -> Self {
        Self {
            inner,
            deadline: None,
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .map_err(|_| CacheError::Timeout)?,
            None => fut.await,
        }
    }

    /// Cached value for `key`; any failure reads as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.bounded(self.inner.get(key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: String) {
        if let Err(e) = self.bounded(self.inner.set(key, value, CACHE_TTL)).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.bounded(self.inner.delete(key)).await {
            tracing::warn!(key, error = %e, "Cache invalidation failed");
        }
    }
}

/// Best-effort event emission. Failures and stalls are logged and absorbed.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<dyn EventPublisher>,
    timeout: Duration,
}

impl Notifier {
    fn new(inner: Arc<dyn EventPublisher>) -> Self {
        Self {
            inner,
            timeout: PUBLISH_TIMEOUT,
        }
    }

    /// Publish `event`, giving up after the notifier's timeout.
    pub async fn notify(&self, topic: &str, event: &ProductEvent) {
        let result = match event.to_bytes() {
            Ok(payload) => tokio::time::timeout(self.timeout, self.inner.publish(topic, payload))
                .await
                .unwrap_or(Err(PublishError::Timeout)),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => tracing::debug!(topic, product_id = %event.id, "Published product event"),
            Err(e) => {
                tracing::error!(topic, product_id = %event.id, error = %e, "Failed to publish product event")
            }
        }
    }
}

/// Product service orchestrating store, cache and events.
#[derive(Clone)]
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
    cache: CacheHandle,
    notifier: Notifier,
    deadline: Option<Duration>,
}

impl ProductService {
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        cache: Arc<dyn ProductCache>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            cache: CacheHandle::new(cache),
            notifier: Notifier::new(publisher),
            deadline: None,
        }
    }

    /// Bound every store, cache and publish call by `deadline`.
    ///
    /// A store call past the deadline fails with
    /// [`ProductError::DeadlineExceeded`]; a cache or publish call past it
    /// is logged and dropped.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self.cache.deadline = Some(deadline);
        self.notifier.timeout = deadline;
        self
    }

    async fn store<T>(&self, fut: impl Future<Output = ProductResult<T>>) -> ProductResult<T> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .map_err(|_| ProductError::DeadlineExceeded)?,
            None => fut.await,
        }
    }

    /// List products; results are never cached.
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>> {
        self.store(self.repository.find_all(filter)).await
    }

    /// Get a product, reading through the cache.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> ProductResult<Product> {
        let id = canonical_id(id)?;
        let key = cache_key(&id);

        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str::<Product>(&raw) {
                Ok(product) => {
                    tracing::debug!(product_id = %id, "Cache hit");
                    return Ok(product);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry")
                }
            }
        }

        let product = self
            .store(self.repository.find_by_id(&id))
            .await?
            .ok_or_else(|| ProductError::NotFound(id.clone()))?;

        match serde_json::to_string(&product) {
            Ok(json) => self.cache.set(&key, json).await,
            Err(e) => tracing::warn!(product_id = %id, error = %e, "Failed to encode product for cache"),
        }

        Ok(product)
    }

    /// Create a product and announce it.
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create_product(&self, input: ProductInput) -> ProductResult<Product> {
        validate(&input)?;
        let product = self.store(self.repository.insert(input)).await?;

        self.notifier
            .notify(PRODUCT_CREATED, &ProductEvent::with_product(&product))
            .await;

        Ok(product)
    }

    /// Replace a product's fields, invalidate its cache entry, announce it.
    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: &str, input: ProductInput) -> ProductResult<Product> {
        let id = canonical_id(id)?;
        validate(&input)?;

        let product = self
            .store(self.repository.update(&id, input))
            .await?
            .ok_or_else(|| ProductError::NotFound(id.clone()))?;

        self.cache.invalidate(&cache_key(&id)).await;
        self.notifier
            .notify(PRODUCT_UPDATED, &ProductEvent::with_product(&product))
            .await;

        Ok(product)
    }

    /// Delete a product, invalidate its cache entry, announce it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> ProductResult<()> {
        let id = canonical_id(id)?;

        if !self.store(self.repository.delete(&id)).await? {
            return Err(ProductError::NotFound(id));
        }

        self.cache.invalidate(&cache_key(&id)).await;
        self.notifier
            .notify(PRODUCT_DELETED, &ProductEvent::deleted(&id))
            .await;

        Ok(())
    }
}

fn validate(input: &ProductInput) -> ProductResult<()> {
    input
        .validate()
        .map_err(|e| ProductError::Validation(e.to_string()))
}
