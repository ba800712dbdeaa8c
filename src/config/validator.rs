//! Config validation: reject values the server cannot start with.

use crate::config::AppConfig;
use crate::error::ConfigError;

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::Validation("PORT must be non-zero".into()));
    }
    if config.server.body_limit == 0 {
        return Err(ConfigError::Validation("UPLOAD_MAX_SIZE must be non-zero".into()));
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
        ));
    }
    if config.cors.allowed_origins.is_empty() {
        return Err(ConfigError::Validation(
            "CORS_ORIGIN must name at least one origin".into(),
        ));
    }
    if !is_identifier(&config.database.schema) {
        return Err(ConfigError::Validation(format!(
            "DATABASE_SCHEMA '{}' is not a valid identifier",
            config.database.schema
        )));
    }
    if config.analytics.timeout_secs == 0 {
        return Err(ConfigError::Validation("GA4_TIMEOUT_SECS must be non-zero".into()));
    }
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
