//! Everything the router needs, built once at startup. Nothing in here changes after that.

use crate::analytics::{AnalyticsService, AnalyticsSource, Ga4Client, Unconfigured};
use crate::auth::{AuthGate, BearerTokenGate};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::Store;
use std::sync::Arc;

pub struct AppState<S: Store> {
    pub config: Arc<AppConfig>,
    pub store: Arc<S>,
    pub analytics: AnalyticsService,
    pub gate: Arc<dyn AuthGate>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
            analytics: self.analytics.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Bearer-token gate from `auth`, GA4 client from `analytics` (or the unconfigured stand-in).
    pub fn new(config: AppConfig, store: Arc<S>) -> Result<Self, AppError> {
        let source: Arc<dyn AnalyticsSource> = match Ga4Client::from_config(&config.analytics)? {
            Some(client) => Arc::new(client),
            None => {
                tracing::info!("GA4 credentials not set, analytics will serve fallback data");
                Arc::new(Unconfigured)
            }
        };
        if config.auth.admin_token.is_none() {
            tracing::warn!("ADMIN_API_TOKEN not set, every admin request will be rejected");
        }
        let gate = Arc::new(BearerTokenGate::new(config.auth.admin_token.clone()));
        Ok(Self::with_parts(config, store, source, gate))
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<S>,
        source: Arc<dyn AnalyticsSource>,
        gate: Arc<dyn AuthGate>,
    ) -> Self {
        let analytics = AnalyticsService::new(
            source,
            config.analytics.degrade_gracefully,
            &config.analytics.conversion_event,
        );
        AppState {
            config: Arc::new(config),
            store,
            analytics,
            gate,
        }
    }
}
