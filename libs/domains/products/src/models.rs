use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Sort direction for listings
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Product entity as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Store-assigned identifier (24-char hex)
    #[schema(example = "65f1c0c2a1b2c3d4e5f60718")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    /// Stock Keeping Unit
    pub sku: String,
    /// Units on hand
    pub inventory: i64,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Set at creation and on every update; never decreases
    pub updated_at: DateTime<Utc>,
}

/// Full product representation accepted by create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200, message = "name must be 1 to 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(exclusive_min = 0.0, message = "price must be greater than zero"))]
    pub price: f64,
    #[validate(length(min = 1, message = "sku is required"))]
    pub sku: String,
    #[validate(range(min = 0, message = "inventory cannot be negative"))]
    #[serde(default)]
    pub inventory: i64,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Query filters for listing products.
///
/// Every dimension is optional and present ones are ANDed. Pagination always
/// applies; a `limit` of 0 means no cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive substring match on name
    pub name: Option<String>,
    /// Match any of these categories (repeat the key or comma-separate)
    #[serde(default)]
    pub categories: Vec<String>,
    /// Inclusive lower price bound, ignored unless > 0
    pub min_price: Option<f64>,
    /// Inclusive upper price bound, ignored unless > 0
    pub max_price: Option<f64>,
    /// Field to sort by (`id` sorts by identifier)
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of results to skip
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u32 {
    10
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            name: None,
            categories: Vec::new(),
            min_price: None,
            max_price: None,
            sort_by: None,
            sort_order: SortOrder::default(),
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl ProductFilter {
    /// Split comma-separated categories and drop blank values so that
    /// `?categories=a,b` and `?categories=a&categories=b` are the same filter.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.filter(|n| !n.is_empty());
        self.sort_by = self
            .sort_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.categories = self
            .categories
            .iter()
            .flat_map(|c| c.split(','))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Lower price bound that actually constrains the query.
    pub fn effective_min_price(&self) -> Option<f64> {
        self.min_price.filter(|p| *p > 0.0)
    }

    /// Upper price bound that actually constrains the query.
    pub fn effective_max_price(&self) -> Option<f64> {
        self.max_price.filter(|p| *p > 0.0)
    }
}
