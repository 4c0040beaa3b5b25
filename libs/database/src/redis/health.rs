use redis::aio::ConnectionManager;
use tracing::debug;

use crate::common::DatabaseError;

/// Check Redis health with a `PING`.
///
/// Takes the manager by reference and clones it; clones share one
/// multiplexed connection.
pub async fn check_health(conn: &ConnectionManager) -> Result<(), DatabaseError> {
    debug!("Running Redis health check");

    let mut conn = conn.clone();
    let response: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("Redis PING failed: {}", e)))?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "Redis PING returned unexpected response: {}",
            response
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}
