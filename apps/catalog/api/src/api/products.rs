//! Products API routes

use axum::{Router, middleware};
use axum_helpers::{JwtAuth, jwt_auth_middleware};
use domain_products::{
    MongoProductRepository, NatsEventPublisher, ProductService, RedisProductCache, handlers,
};
use std::sync::Arc;

use crate::state::AppState;

/// Wire the product service to MongoDB, Redis and NATS
pub fn service(state: &AppState) -> ProductService {
    ProductService::new(
        Arc::new(MongoProductRepository::new(&state.db)),
        Arc::new(RedisProductCache::new(state.redis.clone())),
        Arc::new(NatsEventPublisher::new(state.nats.clone())),
    )
    .with_deadline(state.config.service_deadline())
}

/// Create products router behind bearer authentication
pub fn router(service: ProductService, auth: JwtAuth) -> Router {
    handlers::router(service).layer(middleware::from_fn_with_state(auth, jwt_auth_middleware))
}

/// Initialize products indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    let repository = MongoProductRepository::new(&state.db);
    repository.init_indexes().await?;
    Ok(())
}
