//! Products Domain
//!
//! Product catalog backed by MongoDB, fronted by a read-through Redis cache,
//! announcing every mutation on NATS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Cache read-through, invalidation, events
//! └──┬───┬───┬──┘
//!    │   │   │
//!    │   │   └──────────────┐
//!    │   └───────┐          │
//! ┌──▼────────┐ ┌▼──────┐ ┌─▼─────────┐
//! │Repository │ │ Cache │ │ Publisher │
//! └───────────┘ └───────┘ └───────────┘
//! ```
//!
//! The repository is authoritative. Cache and publisher failures are logged
//! and never reach the caller.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_products::{
//!     handlers,
//!     memory::{InMemoryCache, InMemoryProductRepository},
//!     service::ProductService,
//! };
//! # use domain_products::events::EventPublisher;
//! # fn example(publisher: Arc<dyn EventPublisher>) {
//! let service = ProductService::new(
//!     Arc::new(InMemoryProductRepository::new()),
//!     Arc::new(InMemoryCache::new()),
//!     publisher,
//! );
//!
//! let router = handlers::router(service);
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod events;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use cache::{ProductCache, RedisProductCache};
pub use error::{CacheError, ProductError, ProductResult, PublishError};
pub use events::{EventPublisher, NatsEventPublisher, ProductEvent};
pub use handlers::ApiDoc;
pub use models::{Product, ProductFilter, ProductInput, SortOrder};
pub use mongodb::MongoProductRepository;
pub use repository::ProductRepository;
pub use service::{CACHE_TTL, PUBLISH_TIMEOUT, ProductService, cache_key};
