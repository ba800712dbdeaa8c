//! Router assembly: common, admin and analytics routes, SPA fallback, global layers.

pub mod analytics;
pub mod common;
pub mod resource;

pub use analytics::analytics_routes;
pub use common::common_routes;
pub use resource::{admin_routes, resource_routes};

use crate::error::AppError;
use crate::middleware::{cors_layer, envelope_rejections, preflight, tracing_layer};
use crate::state::AppState;
use crate::store::Store;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::path::Path;
use tower::ServiceExt;
use tower_http::{
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
};

type StaticFiles = ServeDir<ServeFile>;

fn static_files(dir: &str) -> Option<StaticFiles> {
    let root = Path::new(dir);
    if !root.is_dir() {
        tracing::info!(dir = %dir, "static directory not found, serving API only");
        return None;
    }
    Some(ServeDir::new(root).fallback(ServeFile::new(root.join("index.html"))))
}

/// Unknown `/api` paths get a JSON 404; everything else goes to the SPA when one is present.
async fn fallback(files: Option<StaticFiles>, req: Request) -> Response {
    let api = req.uri().path() == "/api" || req.uri().path().starts_with("/api/");
    match files {
        Some(files) if !api => match files.oneshot(req).await {
            Ok(res) => res.into_response(),
            Err(never) => match never {},
        },
        _ => AppError::NotFound("Not Found".into()).into_response(),
    }
}

/// The full application router.
pub fn build_router<S: Store>(state: AppState<S>) -> Router {
    let config = &state.config;
    let files = static_files(&config.server.static_dir);

    Router::new()
        .merge(common_routes(state.store.clone()))
        .nest(
            "/api/admin",
            admin_routes(
                state.store.clone(),
                &config.database.schema,
                state.gate.clone(),
            ),
        )
        .nest("/api/analytics", analytics_routes(state.analytics.clone()))
        .fallback(move |req: Request| fallback(files.clone(), req))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit))
        .layer(middleware::from_fn(envelope_rejections))
        .layer(middleware::from_fn(preflight))
        .layer(cors_layer(&config.cors))
        .layer(tracing_layer())
}
