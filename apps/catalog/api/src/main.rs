//! Catalog API - product catalog REST server

use axum_helpers::{
    CleanupCoordinator, JwtAuth, RateLimiter, create_production_app, create_router,
    health_router,
};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::common::{RetryConfig, retry_with_backoff};
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(nats = %config.nats.url, "Connecting to MongoDB, Redis and NATS");

    let (mongo_client, redis, nats) = tokio::try_join!(
        async {
            database::mongodb::connect_from_config_with_retry(
                &config.mongodb,
                Some(RetryConfig::for_startup()),
            )
            .await
            .map_err(eyre::Report::from)
        },
        async {
            database::redis::connect_from_config_with_retry(
                &config.redis,
                Some(RetryConfig::for_startup()),
            )
            .await
            .map_err(eyre::Report::from)
        },
        async {
            retry_with_backoff(
                "nats",
                || async_nats::connect(config.nats.url.as_str()),
                RetryConfig::for_startup(),
            )
            .await
            .map_err(eyre::Report::from)
        },
    )?;

    let db = mongo_client.database(config.mongodb.database());
    info!(database = %config.mongodb.database(), "Connected to backing services");

    let state = AppState {
        config: config.clone(),
        mongo_client,
        db,
        redis,
        nats,
    };

    api::init_indexes(&state).await?;

    let auth = JwtAuth::new(&config.jwt);
    let limiter = RateLimiter::new(&config.rate_limit);
    let limiter_cleanup = limiter.spawn_cleanup(config.rate_limit.cleanup_interval());

    let service = api::products::service(&state);
    let api_routes = api::routes(&state, service, auth, limiter);
    let router = create_router::<openapi::ApiDoc>(api_routes, config.server.request_timeout());
    let app = router.merge(health_router(config.app));

    let mut cleanup = CleanupCoordinator::new();
    let nats = state.nats.clone();
    cleanup.add_task("nats", async move {
        nats.flush().await.map_err(|e| e.to_string())
    });
    let mongo_client = state.mongo_client.clone();
    cleanup.add_task("mongodb", async move {
        mongo_client.shutdown().await;
        Ok(())
    });

    info!(port = config.server.port, "Starting Catalog API");

    let result = create_production_app(app, &config.server, Duration::from_secs(30), async move {
        limiter_cleanup.abort();
        cleanup.run().await;
    })
    .await;

    result.map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}
