//! Back-office API server.
//!
//! With `DATABASE_URL` set, records live in PostgreSQL (database and tables are created on start).
//! Without it, an in-memory store is used, which is only suitable for local development.

use backoffice::{
    build_router, ensure_database_exists, ensure_tables, AppConfig, AppState, MemoryStore, PgStore,
    Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn serve<S: Store>(config: AppConfig, store: S) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, Arc::new(store))?;
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("backoffice listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("backoffice=info,tower_http=info")
            }),
        )
        .init();

    match config.database.url.clone() {
        Some(database_url) => {
            ensure_database_exists(&database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&database_url)
                .await?;
            ensure_tables(&pool, &config.database.schema).await?;
            serve(config, PgStore::new(pool)).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            serve(config, MemoryStore::admin()).await
        }
    }
}
