//! Readiness endpoint

use axum::{Router, extract::State, response::Response, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use async_nats::connection::State as NatsState;

use crate::state::AppState;

async fn ready(State(state): State<AppState>) -> Response {
    let mongo: HealthCheckFuture<'_> = Box::pin(async {
        database::mongodb::check_health(&state.mongo_client)
            .await
            .map_err(|e| e.to_string())
    });
    let redis: HealthCheckFuture<'_> = Box::pin(async {
        database::redis::check_health(&state.redis)
            .await
            .map_err(|e| e.to_string())
    });
    let nats: HealthCheckFuture<'_> = Box::pin(async {
        match state.nats.connection_state() {
            NatsState::Connected => Ok(()),
            other => Err(format!("NATS connection is {other:?}")),
        }
    });

    run_health_checks(vec![("mongodb", mongo), ("redis", redis), ("nats", nats)]).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
}
