use mongodb::{Client, bson::doc};
use tracing::debug;

use crate::common::DatabaseError;

/// Check MongoDB health with a `ping` against the admin database.
///
/// ```ignore
/// use database::mongodb::check_health;
///
/// check_health(&client).await.map_err(|e| e.to_string())?;
/// ```
pub async fn check_health(client: &Client) -> Result<(), DatabaseError> {
    debug!("Running MongoDB health check");

    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(format!("MongoDB ping failed: {}", e)))?;

    debug!("MongoDB health check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_check_health() {
        let client = Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        assert!(check_health(&client).await.is_ok());
    }
}
