//! Field rules from the resource descriptor, checked before a payload reaches the store.

use crate::error::AppError;
use crate::resource::{ResourceDescriptor, ValidationRule};
use crate::store::Record;
use regex::Regex;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Create payloads: every required field must be present and non-null.
    pub fn validate_create(descriptor: &ResourceDescriptor, body: &Record) -> Result<(), AppError> {
        let mut fields: Vec<_> = descriptor.validation.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        for (field, rule) in fields {
            let val = body.get(field);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule)?;
            }
        }
        Ok(())
    }

    /// Update payloads: only fields present are checked. A required field may not be nulled.
    pub fn validate_update(descriptor: &ResourceDescriptor, body: &Record) -> Result<(), AppError> {
        for (field, v) in body {
            let Some(rule) = descriptor.validation.get(field) else {
                continue;
            };
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::Validation(format!("{} cannot be null", field)));
            }
            validate_field(field, v, rule)?;
        }
        Ok(())
    }
}

fn invalid(msg: String) -> AppError {
    AppError::Validation(msg)
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(invalid(format!("{} must be at most {} characters", field, max)));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(invalid(format!("{} must be at least {} characters", field, min)));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = Regex::new(pattern)
                .map_err(|_| invalid(format!("invalid pattern for {}", field)))?;
            if !re.is_match(s) {
                return Err(invalid(format!("{} does not match required pattern", field)));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let shown: Vec<String> = allowed.iter().map(Value::to_string).collect();
            return Err(invalid(format!("{} must be one of: {}", field, shown.join(", "))));
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        let Some(n) = v.as_f64() else {
            return Err(invalid(format!("{} must be a number", field)));
        };
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(invalid(format!("{} must be at least {}", field, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(invalid(format!("{} must be at most {}", field, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Err(invalid(format!("{} must be a string", field)));
    };
    let ok = match format.to_lowercase().as_str() {
        "email" => match s.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
            None => false,
        },
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid(format!("{} must be a valid {}", field, format)))
    }
}
