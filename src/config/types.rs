//! Configuration types. One `AppConfig` per process, shared as `Arc<AppConfig>`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
/// `2mb`, the default request-body limit.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DATABASE_SCHEMA: &str = "public";
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:8080",
    "http://localhost:3000",
];
pub const DEFAULT_GA4_API_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";
pub const DEFAULT_CONVERSION_EVENT: &str = "generate_lead";
pub const DEFAULT_GA4_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATIC_DIR: &str = "dist";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
    pub static_dir: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When absent the server falls back to the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub schema: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub property_id: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub api_base: String,
    pub conversion_event: String,
    pub timeout_secs: u64,
    pub degrade_gracefully: bool,
}

impl AnalyticsConfig {
    pub fn is_configured(&self) -> bool {
        self.property_id.is_some() && self.access_token.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig {
                host: DEFAULT_HOST.into(),
                port: DEFAULT_PORT,
                body_limit: DEFAULT_BODY_LIMIT,
                static_dir: DEFAULT_STATIC_DIR.into(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                schema: DEFAULT_DATABASE_SCHEMA.into(),
            },
            cors: CorsConfig {
                allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            },
            auth: AuthConfig { admin_token: None },
            analytics: AnalyticsConfig {
                property_id: None,
                access_token: None,
                api_base: DEFAULT_GA4_API_BASE.into(),
                conversion_event: DEFAULT_CONVERSION_EVENT.into(),
                timeout_secs: DEFAULT_GA4_TIMEOUT_SECS,
                degrade_gracefully: true,
            },
        }
    }
}
