//! Standard response envelope: `{success: true, data}` or `{success: false, error}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Exactly one of `data` or `error` is ever present; `success` is the discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success {
        data: T,
        meta: Option<serde_json::Value>,
    },
    Failure {
        error: String,
    },
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse::Success { data, meta: None }
    }

    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        ApiResponse::Success {
            data,
            meta: Some(meta),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ApiResponse::Failure {
            error: error.into(),
        }
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiResponse::Success { data, meta } => {
                let len = if meta.is_some() { 3 } else { 2 };
                let mut s = serializer.serialize_struct("ApiResponse", len)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("data", data)?;
                if let Some(meta) = meta {
                    s.serialize_field("meta", meta)?;
                }
                s.end()
            }
            ApiResponse::Failure { error } => {
                let mut s = serializer.serialize_struct("ApiResponse", 2)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("error", error)?;
                s.end()
            }
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub fn success_created<T: Serialize>(data: T) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ApiResponse::success(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_has_no_error_field() {
        let v = serde_json::to_value(ApiResponse::success(json!([1, 2]))).unwrap();
        assert_eq!(v, json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn failure_has_no_data_field() {
        let v = serde_json::to_value(ApiResponse::<()>::failure("gone")).unwrap();
        assert_eq!(v, json!({"success": false, "error": "gone"}));
    }

    #[test]
    fn meta_is_emitted_only_when_set() {
        let v = serde_json::to_value(ApiResponse::success_with_meta(0, json!({"degraded": true})))
            .unwrap();
        assert_eq!(v["meta"]["degraded"], json!(true));
        assert!(v.get("error").is_none());
    }
}
