//! Typed errors and HTTP mapping. Every error renders as a failure envelope.

use crate::response::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// Faults reported by a [`crate::store::Store`]. Only the message is ever shown to clients.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store refused the operation (constraint violation, unknown column, bad value).
    #[error("{0}")]
    Rejected(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => StoreError::Rejected(db.message().to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Rejected(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("admin access is not configured")]
    NotConfigured,
}

/// Failures of the analytics upstream. Masked behind fallback data unless degradation is disabled.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("analytics source not configured")]
    NotConfigured,
    #[error("analytics request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("analytics upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("analytics response malformed: {0}")]
    Decode(String),
    #[error("no analytics data available")]
    NoData,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Inconsistent(String),
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    /// Request refused before reaching a handler's logic, e.g. wrong method or oversized body.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Inconsistent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Store(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body: ApiResponse<()> = ApiResponse::failure(self.to_string());
        (status, body).into_response()
    }
}
