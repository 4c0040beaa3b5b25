//! Configuration for Catalog API

use axum_helpers::{JwtConfig, RateLimitConfig};
use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_or_default, env_parse_or_default,
    server::ServerConfig,
};
use database::mongodb::MongoConfig;
use database::redis::RedisConfig;
use std::time::Duration;

pub use core_config::Environment;

const DEFAULT_DATABASE: &str = "product_service";
const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";

/// NATS connection settings.
///
/// - `NATS_URL` (default: `nats://127.0.0.1:4222`)
#[derive(Clone, Debug)]
pub struct NatsConfig {
    pub url: String,
}

impl FromEnv for NatsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("NATS_URL", DEFAULT_NATS_URL),
        })
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub redis: RedisConfig,
    pub nats: NatsConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub environment: Environment,
    /// Upper bound on each store/cache call made by the product service
    pub service_deadline_secs: u64,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            mongodb: MongoConfig::from_env_or_database(DEFAULT_DATABASE)?,
            redis: RedisConfig::from_env()?,
            nats: NatsConfig::from_env()?,
            server: ServerConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            environment: Environment::from_env(),
            service_deadline_secs: env_parse_or_default("SERVICE_DEADLINE_SECS", 5u64)?,
        })
    }

    pub fn service_deadline(&self) -> Duration {
        Duration::from_secs(self.service_deadline_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "an-adequately-long-secret-for-tests-0123";

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("MONGODB_DATABASE", None),
                ("MONGO_DATABASE", None),
                ("NATS_URL", None),
                ("PORT", None),
                ("RATE_LIMIT_REQUESTS", None),
                ("SERVICE_DEADLINE_SECS", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.mongodb.database(), "product_service");
                assert_eq!(config.nats.url, "nats://127.0.0.1:4222");
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.rate_limit.requests_per_second.get(), 100);
                assert_eq!(config.service_deadline(), Duration::from_secs(5));
                assert_eq!(config.app.name, "catalog_api");
            },
        );
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("MONGODB_DATABASE", Some("catalog")),
                ("NATS_URL", Some("nats://broker:4222")),
                ("PORT", Some("9090")),
                ("SERVICE_DEADLINE_SECS", Some("2")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.mongodb.database(), "catalog");
                assert_eq!(config.nats.url, "nats://broker:4222");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.service_deadline(), Duration::from_secs(2));
            },
        );
    }

    #[test]
    fn test_missing_jwt_secret_fails() {
        temp_env::with_var_unset("JWT_SECRET", || {
            assert!(Config::from_env().is_err());
        });
    }

    #[test]
    fn test_garbage_port_fails() {
        temp_env::with_vars(
            [("JWT_SECRET", Some(SECRET)), ("PORT", Some("eighty"))],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }
}
