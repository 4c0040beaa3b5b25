//! In-process adapters for tests and local runs.
//!
//! [`InMemoryProductRepository`] applies the same filter semantics as the
//! MongoDB repository; [`InMemoryCache`] expires entries lazily on read.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mongodb::bson::oid::ObjectId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cache::ProductCache;
use crate::error::{CacheError, ProductResult};
use crate::models::{Product, ProductFilter, ProductInput, SortOrder};
use crate::repository::{ProductRepository, canonical_id};

/// Current time at the store's millisecond precision.
fn now_millis() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap_or_default()
}

fn matches(product: &Product, filter: &ProductFilter) -> bool {
    if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
        if !product.name.to_lowercase().contains(&name.to_lowercase()) {
            return false;
        }
    }

    if !filter.categories.is_empty()
        && !product
            .categories
            .iter()
            .any(|c| filter.categories.contains(c))
    {
        return false;
    }

    if let Some(min) = filter.effective_min_price() {
        if product.price < min {
            return false;
        }
    }

    if let Some(max) = filter.effective_max_price() {
        if product.price > max {
            return false;
        }
    }

    true
}

fn compare_by(field: &str, a: &Product, b: &Product) -> Ordering {
    match field {
        "id" | "_id" => a.id.cmp(&b.id),
        "name" => a.name.cmp(&b.name),
        "description" => a.description.cmp(&b.description),
        "price" => a.price.total_cmp(&b.price),
        "sku" => a.sku.cmp(&b.sku),
        "inventory" => a.inventory.cmp(&b.inventory),
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => Ordering::Equal,
    }
}

/// Product store held in process memory.
#[derive(Default)]
pub struct InMemoryProductRepository {
    // Insertion order doubles as the natural order.
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_all(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;

        let mut found: Vec<Product> = products
            .iter()
            .filter(|p| matches(p, filter))
            .cloned()
            .collect();

        if let Some(field) = filter.sort_by.as_deref().filter(|f| !f.is_empty()) {
            found.sort_by(|a, b| {
                let ordering = compare_by(field, a, b);
                match filter.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let page = found.into_iter().skip(offset);
        let page = if filter.limit > 0 {
            page.take(filter.limit as usize).collect()
        } else {
            page.collect()
        };

        Ok(page)
    }

    async fn find_by_id(&self, id: &str) -> ProductResult<Option<Product>> {
        let id = canonical_id(id)?;
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, input: ProductInput) -> ProductResult<Product> {
        let now = now_millis();
        let product = Product {
            id: ObjectId::new().to_hex(),
            name: input.name,
            description: input.description,
            price: input.price,
            sku: input.sku,
            inventory: input.inventory,
            categories: input.categories,
            created_at: now,
            updated_at: now,
        };

        self.products.write().await.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: &str, input: ProductInput) -> ProductResult<Option<Product>> {
        let id = canonical_id(id)?;
        let mut products = self.products.write().await;

        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        product.name = input.name;
        product.description = input.description;
        product.price = input.price;
        product.sku = input.sku;
        product.inventory = input.inventory;
        product.categories = input.categories;
        // Strictly later than the previous write, even within one millisecond.
        product.updated_at = now_millis().max(product.updated_at + TimeDelta::milliseconds(1));

        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: &str) -> ProductResult<bool> {
        let id = canonical_id(id)?;
        let mut products = self.products.write().await;

        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() < before)
    }
}

/// Cache held in process memory with per-entry expiry.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProductCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.write().await;

        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProductError;

    fn input(name: &str, price: f64, categories: &[&str]) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: String::new(),
            price,
            sku: format!("SKU-{name}"),
            inventory: 1,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    async fn seeded() -> InMemoryProductRepository {
        let repo = InMemoryProductRepository::new();
        repo.insert(input("Red Lamp", 15.0, &["lighting", "home"]))
            .await
            .unwrap();
        repo.insert(input("Blue Lamp", 25.0, &["lighting"])).await.unwrap();
        repo.insert(input("Garden Hose", 12.0, &["garden"])).await.unwrap();
        repo.insert(input("lamp.oil", 5.0, &["home"])).await.unwrap();
        repo
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_equal_timestamps() {
        let repo = InMemoryProductRepository::new();
        let product = repo.insert(input("Widget", 9.99, &[])).await.unwrap();

        assert_eq!(product.id.len(), 24);
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(product.price, 9.99);
    }

    #[tokio::test]
    async fn test_name_filter_is_case_insensitive_literal() {
        let repo = seeded().await;

        let filter = ProductFilter {
            name: Some("LAMP".to_string()),
            ..Default::default()
        };
        let found = repo.find_all(&filter).await.unwrap();
        assert_eq!(names(&found), vec!["Red Lamp", "Blue Lamp", "lamp.oil"]);

        let filter = ProductFilter {
            name: Some("p.o".to_string()),
            ..Default::default()
        };
        let found = repo.find_all(&filter).await.unwrap();
        assert_eq!(names(&found), vec!["lamp.oil"]);
    }

    #[tokio::test]
    async fn test_category_filter_matches_any() {
        let repo = seeded().await;
        let filter = ProductFilter {
            categories: vec!["garden".to_string(), "home".to_string()],
            ..Default::default()
        };
        let found = repo.find_all(&filter).await.unwrap();
        assert_eq!(names(&found), vec!["Red Lamp", "Garden Hose", "lamp.oil"]);
    }

    #[tokio::test]
    async fn test_price_range_is_inclusive() {
        let repo = seeded().await;
        let filter = ProductFilter {
            min_price: Some(12.0),
            max_price: Some(15.0),
            ..Default::default()
        };
        let found = repo.find_all(&filter).await.unwrap();
        assert_eq!(names(&found), vec!["Red Lamp", "Garden Hose"]);
    }

    #[tokio::test]
    async fn test_sort_and_paginate() {
        let repo = seeded().await;
        let filter = ProductFilter {
            sort_by: Some("price".to_string()),
            sort_order: SortOrder::Desc,
            limit: 2,
            offset: 1,
            ..Default::default()
        };
        let found = repo.find_all(&filter).await.unwrap();
        assert_eq!(names(&found), vec!["Red Lamp", "Garden Hose"]);
    }

    #[tokio::test]
    async fn test_zero_limit_returns_everything() {
        let repo = seeded().await;
        let filter = ProductFilter {
            limit: 0,
            ..Default::default()
        };
        assert_eq!(repo.find_all(&filter).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_keeps_identity_and_advances_updated_at() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(input("Widget", 9.99, &[])).await.unwrap();

        let updated = repo
            .update(&created.id, input("Widget v2", 12.5, &[]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.name, "Widget v2");
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids() {
        let repo = InMemoryProductRepository::new();
        let absent = ObjectId::new().to_hex();

        assert!(repo.find_by_id(&absent).await.unwrap().is_none());
        assert!(repo.update(&absent, input("x", 1.0, &[])).await.unwrap().is_none());
        assert!(!repo.delete(&absent).await.unwrap());

        assert!(matches!(
            repo.find_by_id("nope").await,
            Err(ProductError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            repo.delete("nope").await,
            Err(ProductError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_product() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(input("Widget", 9.99, &[])).await.unwrap();

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_match_regardless_of_hex_case() {
        let repo = InMemoryProductRepository::new();
        let created = repo.insert(input("Widget", 9.99, &[])).await.unwrap();
        let upper = created.id.to_uppercase();

        let found = repo.find_by_id(&upper).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let updated = repo
            .update(&upper, input("Widget v2", 12.5, &[]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);

        assert!(repo.delete(&upper).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .set("product:1", "cached".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("product:1").await.unwrap().as_deref(), Some("cached"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get("product:1").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_delete_missing_key_is_ok() {
        let cache = InMemoryCache::new();
        assert!(cache.delete("product:missing").await.is_ok());
    }
}
