//! Back-office admin API: generic resource CRUD over a pluggable store, plus an analytics proxy.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod query;
pub mod resource;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, ConfigError, StoreError};
pub use migration::{ensure_database_exists, ensure_tables};
pub use response::ApiResponse;
pub use routes::build_router;
pub use service::ResourceService;
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Store};
