//! Load `AppConfig` from environment variables (after reading `.env` if present).

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;

impl AppConfig {
    /// Read `.env`, then the process environment. Validates before returning.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = AppConfig::default();

        let port = match get("PORT") {
            Some(v) => v.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT",
                reason: e.to_string(),
            })?,
            None => defaults.server.port,
        };
        let body_limit = match get("UPLOAD_MAX_SIZE") {
            Some(v) => parse_size(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "UPLOAD_MAX_SIZE",
                reason: format!("'{}' is not a size such as 512kb or 2mb", v),
            })?,
            None => defaults.server.body_limit,
        };
        let max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: e.to_string(),
            })?,
            None => defaults.database.max_connections,
        };
        let timeout_secs = match get("GA4_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "GA4_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => defaults.analytics.timeout_secs,
        };
        let degrade_gracefully = match get("ANALYTICS_DEGRADE_GRACEFULLY") {
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "ANALYTICS_DEGRADE_GRACEFULLY",
                reason: format!("'{}' is not a boolean", v),
            })?,
            None => defaults.analytics.degrade_gracefully,
        };
        let allowed_origins = match get("CORS_ORIGIN") {
            Some(v) => v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => defaults.cors.allowed_origins,
        };

        let config = AppConfig {
            server: ServerConfig {
                host: get("HOST").unwrap_or(defaults.server.host),
                port,
                body_limit,
                static_dir: get("STATIC_DIR").unwrap_or(defaults.server.static_dir),
            },
            database: DatabaseConfig {
                url: get("DATABASE_URL"),
                max_connections,
                schema: get("DATABASE_SCHEMA").unwrap_or(defaults.database.schema),
            },
            cors: CorsConfig { allowed_origins },
            auth: AuthConfig {
                admin_token: get("ADMIN_API_TOKEN"),
            },
            analytics: AnalyticsConfig {
                property_id: get("GA4_PROPERTY_ID"),
                access_token: get("GA4_ACCESS_TOKEN"),
                api_base: get("GA4_API_BASE").unwrap_or(defaults.analytics.api_base),
                conversion_event: get("GA4_CONVERSION_EVENT")
                    .unwrap_or(defaults.analytics.conversion_event),
                timeout_secs,
                degrade_gracefully,
            },
        };
        validate(&config)?;
        Ok(config)
    }
}

/// Parse sizes like `2mb`, `512kb`, `1024` (bytes). Case-insensitive.
pub fn parse_size(s: &str) -> Option<usize> {
    let lower = s.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = lower.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("kb") {
        (n, 1024)
    } else if let Some(n) = lower.strip_suffix('b') {
        (n, 1)
    } else {
        (lower.as_str(), 1)
    };
    digits.trim().parse::<usize>().ok()?.checked_mul(multiplier)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let c = load(&[]).unwrap();
        assert_eq!(c.server.port, DEFAULT_PORT);
        assert_eq!(c.server.body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(c.cors.allowed_origins.len(), 3);
        assert!(c.database.url.is_none());
        assert!(c.analytics.degrade_gracefully);
        assert!(!c.analytics.is_configured());
    }

    #[test]
    fn cors_origins_are_trimmed_and_blank_entries_dropped() {
        let c = load(&[("CORS_ORIGIN", " https://a.example , ,https://b.example")]).unwrap();
        assert_eq!(
            c.cors.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::InvalidValue { key: "PORT", .. })
        ));
    }

    #[test]
    fn analytics_needs_property_and_token() {
        let c = load(&[("GA4_PROPERTY_ID", "123")]).unwrap();
        assert!(!c.analytics.is_configured());
        let c = load(&[("GA4_PROPERTY_ID", "123"), ("GA4_ACCESS_TOKEN", "tok")]).unwrap();
        assert!(c.analytics.is_configured());
    }

    #[test]
    fn sizes() {
        assert_eq!(parse_size("2mb"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("512KB"), Some(512 * 1024));
        assert_eq!(parse_size("100b"), Some(100));
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("lots"), None);
    }
}
