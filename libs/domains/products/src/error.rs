use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product {0} not found")]
    NotFound(String),

    #[error("Invalid product ID format: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Operation exceeded its deadline")]
    DeadlineExceeded,
}

pub type ProductResult<T> = Result<T, ProductError>;

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::InvalidIdentifier(id) => {
                AppError::InvalidIdentifier(format!("Invalid product ID format: {}", id))
            }
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
            ProductError::DeadlineExceeded => {
                AppError::GatewayTimeout("The product store did not answer in time".to_string())
            }
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        ProductError::StoreUnavailable(err.to_string())
    }
}

/// Cache backend failure. Never surfaced to API callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache operation timed out")]
    Timeout,
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Event publication failure. Never surfaced to API callers.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Broker rejected publish: {0}")]
    Broker(String),

    #[error("Publish did not complete in time")]
    Timeout,
}
