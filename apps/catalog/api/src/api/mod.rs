//! API routes module

pub mod health;
pub mod products;

use axum::{Router, middleware};
use axum_helpers::{JwtAuth, RateLimiter, rate_limit_middleware};
use domain_products::ProductService;

use crate::state::AppState;

/// Create all API routes.
///
/// Every route is rate limited per client; `/products` additionally requires
/// a bearer token.
pub fn routes(
    state: &AppState,
    service: ProductService,
    auth: JwtAuth,
    limiter: RateLimiter,
) -> Router {
    Router::new()
        .nest("/products", products::router(service, auth))
        .merge(health::router(state.clone()))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
}

/// Initialize database indexes
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    products::init_indexes(state).await
}
