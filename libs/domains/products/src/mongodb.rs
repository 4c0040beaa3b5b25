//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc, oid::ObjectId},
    options::{FindOptions, IndexOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductFilter, ProductInput, SortOrder};
use crate::repository::ProductRepository;

/// Stored shape of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub sku: String,
    #[serde(default)]
    pub inventory: i64,
    #[serde(default)]
    pub categories: Vec<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

impl ProductDocument {
    fn new(input: ProductInput, now: bson::DateTime) -> Self {
        Self {
            id: ObjectId::new(),
            name: input.name,
            description: input.description,
            price: input.price,
            sku: input.sku,
            inventory: input.inventory,
            categories: input.categories,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<ProductDocument> for Product {
    fn from(doc: ProductDocument) -> Self {
        Self {
            id: doc.id.to_hex(),
            name: doc.name,
            description: doc.description,
            price: doc.price,
            sku: doc.sku,
            inventory: doc.inventory,
            categories: doc.categories,
            created_at: to_chrono(doc.created_at),
            updated_at: to_chrono(doc.updated_at),
        }
    }
}

fn to_chrono(dt: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

fn parse_id(id: &str) -> ProductResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| ProductError::InvalidIdentifier(id.to_string()))
}

/// MongoDB implementation of the ProductRepository
pub struct MongoProductRepository {
    collection: Collection<ProductDocument>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, "products")
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<ProductDocument>(collection_name);
        Self { collection }
    }

    /// Initialize indexes backing the list filters
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let index = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };

        let indexes = vec![
            index(doc! { "sku": 1 }, "idx_sku"),
            index(doc! { "price": 1 }, "idx_price"),
            index(doc! { "categories": 1 }, "idx_categories"),
            index(doc! { "name": 1 }, "idx_name"),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Build a MongoDB filter document from ProductFilter
    pub(crate) fn build_filter(filter: &ProductFilter) -> Document {
        let mut query = doc! {};

        if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
            // Literal substring, not a user-supplied pattern.
            query.insert(
                "name",
                doc! { "$regex": regex::escape(name), "$options": "i" },
            );
        }

        if !filter.categories.is_empty() {
            query.insert("categories", doc! { "$in": filter.categories.clone() });
        }

        let mut price = doc! {};
        if let Some(min) = filter.effective_min_price() {
            price.insert("$gte", min);
        }
        if let Some(max) = filter.effective_max_price() {
            price.insert("$lte", max);
        }
        if !price.is_empty() {
            query.insert("price", price);
        }

        query
    }

    pub(crate) fn build_find_options(filter: &ProductFilter) -> FindOptions {
        let mut options = FindOptions::default();
        options.skip = Some(filter.offset);
        if filter.limit > 0 {
            options.limit = Some(i64::from(filter.limit));
        }

        if let Some(field) = filter.sort_by.as_deref().filter(|f| !f.is_empty()) {
            let field = if field == "id" { "_id" } else { field };
            let direction = match filter.sort_order {
                SortOrder::Asc => 1,
                SortOrder::Desc => -1,
            };
            let mut sort = Document::new();
            sort.insert(field, direction);
            options.sort = Some(sort);
        }

        options
    }

    /// Update pipeline replacing the mutable fields.
    ///
    /// `updated_at` becomes the later of `now` and the stored value plus one
    /// millisecond, so successive updates are strictly ordered even when the
    /// clock stalls or steps back. Strings are wrapped in `$literal` so a
    /// leading `$` is never read as a field path.
    pub(crate) fn build_update(input: &ProductInput, now: bson::DateTime) -> Vec<Document> {
        vec![doc! {
            "$set": {
                "name": { "$literal": input.name.as_str() },
                "description": { "$literal": input.description.as_str() },
                "price": input.price,
                "sku": { "$literal": input.sku.as_str() },
                "inventory": input.inventory,
                "categories": { "$literal": input.categories.clone() },
                "updated_at": { "$max": [now, { "$add": ["$updated_at", 1_i64] }] },
            },
        }]
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self))]
    async fn find_all(&self, filter: &ProductFilter) -> ProductResult<Vec<Product>> {
        let query = Self::build_filter(filter);
        let options = Self::build_find_options(filter);

        let cursor = self.collection.find(query).with_options(options).await?;
        let documents: Vec<ProductDocument> = cursor.try_collect().await?;

        Ok(documents.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> ProductResult<Option<Product>> {
        let oid = parse_id(id)?;
        let document = self.collection.find_one(doc! { "_id": oid }).await?;
        Ok(document.map(Product::from))
    }

    #[instrument(skip(self, input), fields(product_name = %input.name))]
    async fn insert(&self, input: ProductInput) -> ProductResult<Product> {
        let document = ProductDocument::new(input, bson::DateTime::now());

        self.collection.insert_one(&document).await?;

        tracing::info!(product_id = %document.id, "Product created successfully");
        Ok(document.into())
    }

    #[instrument(skip(self, input))]
    async fn update(&self, id: &str, input: ProductInput) -> ProductResult<Option<Product>> {
        let oid = parse_id(id)?;
        let update = Self::build_update(&input, bson::DateTime::now());

        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": oid }, update)
            .return_document(ReturnDocument::After)
            .await?;

        if updated.is_some() {
            tracing::info!(product_id = %id, "Product updated successfully");
        }
        Ok(updated.map(Product::from))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> ProductResult<bool> {
        let oid = parse_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": oid }).await?;

        let deleted = result.deleted_count > 0;
        if deleted {
            tracing::info!(product_id = %id, "Product deleted successfully");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: "Widget".to_string(),
            description: "A widget".to_string(),
            price: 9.99,
            sku: "W-1".to_string(),
            inventory: 5,
            categories: vec!["tools".to_string()],
        }
    }

    #[test]
    fn test_build_filter_empty() {
        let filter = ProductFilter::default();
        let doc = MongoProductRepository::build_filter(&filter);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_build_filter_escapes_name() {
        let filter = ProductFilter {
            name: Some("a.b(c".to_string()),
            ..Default::default()
        };
        let doc = MongoProductRepository::build_filter(&filter);
        let name = doc.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"a\.b\(c");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_build_filter_with_categories() {
        let filter = ProductFilter {
            categories: vec!["tools".to_string(), "garden".to_string()],
            ..Default::default()
        };
        let doc = MongoProductRepository::build_filter(&filter);
        let categories = doc.get_document("categories").unwrap();
        assert_eq!(categories.get_array("$in").unwrap().len(), 2);
    }

    #[test]
    fn test_build_filter_with_price_range() {
        let filter = ProductFilter {
            min_price: Some(10.0),
            max_price: Some(20.0),
            ..Default::default()
        };
        let doc = MongoProductRepository::build_filter(&filter);
        let price = doc.get_document("price").unwrap();
        assert_eq!(price.get_f64("$gte").unwrap(), 10.0);
        assert_eq!(price.get_f64("$lte").unwrap(), 20.0);
    }

    #[test]
    fn test_build_filter_ignores_zero_price_bounds() {
        let filter = ProductFilter {
            min_price: Some(0.0),
            max_price: Some(15.0),
            ..Default::default()
        };
        let doc = MongoProductRepository::build_filter(&filter);
        let price = doc.get_document("price").unwrap();
        assert!(price.get("$gte").is_none());
        assert_eq!(price.get_f64("$lte").unwrap(), 15.0);
    }

    #[test]
    fn test_find_options_pagination_always_applies() {
        let filter = ProductFilter {
            limit: 5,
            offset: 20,
            ..Default::default()
        };
        let options = MongoProductRepository::build_find_options(&filter);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, Some(20));
        assert!(options.sort.is_none());
    }

    #[test]
    fn test_find_options_zero_limit_is_uncapped() {
        let filter = ProductFilter {
            limit: 0,
            ..Default::default()
        };
        let options = MongoProductRepository::build_find_options(&filter);
        assert!(options.limit.is_none());
    }

    #[test]
    fn test_find_options_sort() {
        let filter = ProductFilter {
            sort_by: Some("price".to_string()),
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        let options = MongoProductRepository::build_find_options(&filter);
        assert_eq!(options.sort, Some(doc! { "price": -1 }));

        let filter = ProductFilter {
            sort_by: Some("id".to_string()),
            ..Default::default()
        };
        let options = MongoProductRepository::build_find_options(&filter);
        assert_eq!(options.sort, Some(doc! { "_id": 1 }));
    }

    #[test]
    fn test_update_never_touches_identity_or_creation_time() {
        let now = bson::DateTime::from_millis(1_700_000_000_000);
        let update = MongoProductRepository::build_update(&input(), now);

        assert_eq!(update.len(), 1);
        let set = update[0].get_document("$set").unwrap();
        assert!(set.get("_id").is_none());
        assert!(set.get("created_at").is_none());
        assert_eq!(
            set.get_document("name").unwrap().get_str("$literal").unwrap(),
            "Widget"
        );
    }

    #[test]
    fn test_update_timestamp_strictly_advances() {
        let now = bson::DateTime::from_millis(1_700_000_000_000);
        let update = MongoProductRepository::build_update(&input(), now);

        let set = update[0].get_document("$set").unwrap();
        let candidates = set
            .get_document("updated_at")
            .unwrap()
            .get_array("$max")
            .unwrap();
        assert_eq!(candidates[0].as_datetime(), Some(&now));

        let bumped = candidates[1].as_document().unwrap().get_array("$add").unwrap();
        assert_eq!(bumped[0].as_str(), Some("$updated_at"));
        assert_eq!(bumped[1].as_i64(), Some(1));
    }

    #[test]
    fn test_update_treats_dollar_strings_as_literals() {
        let hostile = ProductInput {
            name: "$name".to_string(),
            sku: "$sku".to_string(),
            categories: vec!["$categories".to_string()],
            ..input()
        };
        let update = MongoProductRepository::build_update(&hostile, bson::DateTime::now());
        let set = update[0].get_document("$set").unwrap();

        for field in ["name", "description", "sku", "categories"] {
            assert!(set.get_document(field).unwrap().contains_key("$literal"));
        }
        assert_eq!(
            set.get_document("sku").unwrap().get_str("$literal").unwrap(),
            "$sku"
        );
    }

    #[test]
    fn test_invalid_identifier() {
        assert!(matches!(
            parse_id("not-an-object-id"),
            Err(ProductError::InvalidIdentifier(_))
        ));
        assert!(parse_id("65f1c0c2a1b2c3d4e5f60718").is_ok());
    }

    #[test]
    fn test_document_to_product() {
        let now = bson::DateTime::from_millis(1_700_000_000_123);
        let document = ProductDocument::new(input(), now);
        let hex = document.id.to_hex();

        let product = Product::from(document);
        assert_eq!(product.id, hex);
        assert_eq!(product.price, 9.99);
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(product.created_at.timestamp_millis(), 1_700_000_000_123);
    }
}
