//! Resource handlers, generic over the store. State is the entity's [`ResourceService`].

use crate::error::AppError;
use crate::response::{success_created, ApiResponse};
use crate::service::{RequestValidator, ResourceService};
use crate::store::{Record, Store};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

/// Malformed JSON stays a 400; wrong content type and oversized bodies keep their own status.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| match e.status() {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AppError::Validation(e.body_text())
        }
        status => AppError::Rejected {
            status,
            message: e.body_text(),
        },
    })
}

pub async fn list<S: Store>(
    State(svc): State<ResourceService<S>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<ApiResponse<Vec<Record>>, AppError> {
    Ok(ApiResponse::success(svc.list(&params).await?))
}

pub async fn get_one<S: Store>(
    State(svc): State<ResourceService<S>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Record>, AppError> {
    Ok(ApiResponse::success(svc.get_one(&id).await?))
}

pub async fn create<S: Store>(
    State(svc): State<ResourceService<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<Record>), AppError> {
    let body = json_body(body)?;
    if let Some(fields) = body.as_object() {
        RequestValidator::validate_create(svc.descriptor(), fields)?;
    }
    Ok(success_created(svc.create(body).await?))
}

pub async fn update<S: Store>(
    State(svc): State<ResourceService<S>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ApiResponse<Record>, AppError> {
    let body = json_body(body)?;
    if let Some(fields) = body.as_object() {
        RequestValidator::validate_update(svc.descriptor(), fields)?;
    }
    Ok(ApiResponse::success(svc.update(&id, body).await?))
}

/// Responds with the removed record.
pub async fn remove<S: Store>(
    State(svc): State<ResourceService<S>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Record>, AppError> {
    Ok(ApiResponse::success(svc.remove(&id).await?))
}
