//! Domain events and the publisher capability

use async_nats::HeaderMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PublishError;
use crate::models::Product;

pub const PRODUCT_CREATED: &str = "product.created";
pub const PRODUCT_UPDATED: &str = "product.updated";
pub const PRODUCT_DELETED: &str = "product.deleted";

/// Payload published on every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub id: String,
    /// Absent for deletions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
    pub timestamp: DateTime<Utc>,
}

impl ProductEvent {
    pub fn with_product(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            product: Some(product.clone()),
            timestamp: Utc::now(),
        }
    }

    pub fn deleted(id: &str) -> Self {
        Self {
            id: id.to_string(),
            product: None,
            timestamp: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PublishError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Fire-and-forget publish of a payload to a topic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Publishes to NATS; the topic is used as the subject.
#[derive(Clone)]
pub struct NatsEventPublisher {
    client: async_nats::Client,
}

impl NatsEventPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "application/json");

        self.client
            .publish_with_headers(topic.to_string(), headers, payload.into())
            .await
            .map_err(|e| PublishError::Broker(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: "65f1c0c2a1b2c3d4e5f60718".to_string(),
            name: "Widget".to_string(),
            description: String::new(),
            price: 9.99,
            sku: "W-1".to_string(),
            inventory: 5,
            categories: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_event_with_product_payload() {
        let event = ProductEvent::with_product(&product());
        let json: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();

        assert_eq!(json["id"], "65f1c0c2a1b2c3d4e5f60718");
        assert_eq!(json["product"]["sku"], "W-1");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_deleted_event_omits_product() {
        let event = ProductEvent::deleted("65f1c0c2a1b2c3d4e5f60718");
        let json: serde_json::Value = serde_json::from_slice(&event.to_bytes().unwrap()).unwrap();

        assert_eq!(json["id"], "65f1c0c2a1b2c3d4e5f60718");
        assert!(json.get("product").is_none());
    }
}
