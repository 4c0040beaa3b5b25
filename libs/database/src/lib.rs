//! Connectors and health checks for the catalog's backing services.
//!
//! # Features
//!
//! - `redis` (default) - Redis `ConnectionManager` connector
//! - `mongodb` - MongoDB client connector
//! - `config` - `core_config::FromEnv` implementations for the config types
//! - `all` - everything above
//!
//! Every connector has a `*_with_retry` variant that wraps the connect call in
//! exponential backoff. Those are meant for process startup only; request
//! paths never retry.
//!
//! # Examples
//!
//! ## Redis
//!
//! ```ignore
//! use database::redis::{RedisConfig, connect_from_config_with_retry};
//! use redis::AsyncCommands;
//!
//! let mut conn = connect_from_config_with_retry(&RedisConfig::default(), None).await?;
//! conn.set::<_, _, ()>("key", "value").await?;
//! ```
//!
//! ## MongoDB
//!
//! ```ignore
//! use database::mongodb::{MongoConfig, connect_from_config};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "product_service");
//! let client = connect_from_config(&config).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};
