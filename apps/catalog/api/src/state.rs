//! Application state management

use database::redis::ConnectionManager;
use mongodb::{Client, Database};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub mongo_client: Client,
    pub db: Database,
    pub redis: ConnectionManager,
    pub nats: async_nats::Client,
}
