//! Analytics proxy handlers. A fallback report is still a success; the reason goes in `meta`.

use crate::analytics::{
    AnalyticsService, BasicMetrics, Conversions, Overview, Realtime, Report, SourcesChart, Timeseries,
};
use crate::error::AppError;
use crate::response::ApiResponse;
use axum::extract::State;
use serde_json::json;

fn envelope<T>(report: Report<T>) -> ApiResponse<T> {
    match report.degraded {
        Some(reason) => {
            ApiResponse::success_with_meta(report.data, json!({ "degraded": true, "reason": reason }))
        }
        None => ApiResponse::success(report.data),
    }
}

pub async fn overview(State(svc): State<AnalyticsService>) -> Result<ApiResponse<Overview>, AppError> {
    svc.overview().await.map(envelope)
}

pub async fn metrics(State(svc): State<AnalyticsService>) -> Result<ApiResponse<BasicMetrics>, AppError> {
    svc.metrics().await.map(envelope)
}

pub async fn timeseries(State(svc): State<AnalyticsService>) -> Result<ApiResponse<Timeseries>, AppError> {
    svc.timeseries().await.map(envelope)
}

pub async fn sources(State(svc): State<AnalyticsService>) -> Result<ApiResponse<SourcesChart>, AppError> {
    svc.sources().await.map(envelope)
}

pub async fn realtime(State(svc): State<AnalyticsService>) -> Result<ApiResponse<Realtime>, AppError> {
    svc.realtime().await.map(envelope)
}

pub async fn conversions(State(svc): State<AnalyticsService>) -> Result<ApiResponse<Conversions>, AppError> {
    svc.conversions().await.map(envelope)
}
