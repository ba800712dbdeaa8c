//! `/api/analytics/*`: read-only, never cached.

use crate::analytics::AnalyticsService;
use crate::handlers::analytics::{conversions, metrics, overview, realtime, sources, timeseries};
use crate::middleware::no_store;
use axum::{middleware, routing::get, Router};

pub fn analytics_routes(svc: AnalyticsService) -> Router {
    Router::new()
        .route("/overview", get(overview))
        .route("/metrics", get(metrics))
        .route("/timeseries", get(timeseries))
        .route("/sources", get(sources))
        .route("/realtime", get(realtime))
        .route("/conversions", get(conversions))
        .layer(middleware::from_fn(no_store))
        .with_state(svc)
}
