//! HTTP middleware module.
//!
//! - CORS configuration
//! - Security headers
//! - Per-client rate limiting
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::http::{RateLimiter, rate_limit_middleware, security_headers};
//!
//! let app = Router::new()
//!     .layer(axum::middleware::from_fn_with_state(limiter, rate_limit_middleware))
//!     .layer(axum::middleware::from_fn(security_headers));
//! ```

pub mod cors;
pub mod rate_limit;
pub mod security;

pub use cors::{cors_layer_from_env, create_cors_layer, create_permissive_cors_layer};
pub use rate_limit::{RateLimitConfig, RateLimiter, client_ip, rate_limit_middleware};
pub use security::security_headers;
