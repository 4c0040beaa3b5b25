use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductFilter, ProductInput};

/// Persistence capability for products.
///
/// Identifier-taking methods fail with
/// [`ProductError::InvalidIdentifier`](crate::error::ProductError::InvalidIdentifier)
/// before touching the store when `id` is not a well-formed identifier.
/// "No such product" is `Ok(None)` / `Ok(false)`, never an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products matching every present filter dimension, paginated.
    async fn find_all(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>>;

    async fn find_by_id(&self, id: &str) -> ProductResult<Option<Product>>;

    /// Insert a new product; the store assigns the id and both timestamps.
    async fn insert(&self, input: ProductInput) -> ProductResult<Product>;

    /// Overwrite every mutable field and bump `updated_at`.
    async fn update(&self, id: &str, input: ProductInput) -> ProductResult<Option<Product>>;

    /// `true` if a product was removed.
    async fn delete(&self, id: &str) -> ProductResult<bool>;
}

/// Canonical spelling of a product identifier (lowercase 24-char hex).
///
/// Every spelling the store accepts for one product maps to the same string,
/// so it is safe to use as a cache key.
pub fn canonical_id(id: &str) -> ProductResult<String> {
    ObjectId::parse_str(id)
        .map(|oid| oid.to_hex())
        .map_err(|_| ProductError::InvalidIdentifier(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_folds_case() {
        let lower = "65f1c0c2a1b2c3d4e5f60718";
        assert_eq!(canonical_id(lower).unwrap(), lower);
        assert_eq!(canonical_id(&lower.to_uppercase()).unwrap(), lower);
    }

    #[test]
    fn test_canonical_id_rejects_malformed() {
        for id in ["", "not-an-id", "65f1c0c2a1b2c3d4e5f6071", "zzf1c0c2a1b2c3d4e5f60718"] {
            assert!(matches!(
                canonical_id(id),
                Err(ProductError::InvalidIdentifier(_))
            ));
        }
    }
}
