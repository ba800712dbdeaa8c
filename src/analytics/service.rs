//! Dashboard reports with fallback: upstream trouble yields zeroed data plus a reason, never a failure,
//! unless graceful degradation is switched off.

use crate::analytics::source::*;
use crate::error::{AppError, UpstreamError};
use chrono::{SecondsFormat, Utc};
use std::future::Future;
use std::sync::Arc;

/// Report data and, when it is a fallback, why.
#[derive(Debug, PartialEq)]
pub struct Report<T> {
    pub data: T,
    pub degraded: Option<String>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    source: Arc<dyn AnalyticsSource>,
    degrade_gracefully: bool,
    conversion_event: String,
}

impl AnalyticsService {
    pub fn new(source: Arc<dyn AnalyticsSource>, degrade_gracefully: bool, conversion_event: &str) -> Self {
        AnalyticsService {
            source,
            degrade_gracefully,
            conversion_event: conversion_event.to_string(),
        }
    }

    /// Unconfigured upstream always falls back; other failures follow the degrade policy.
    async fn guarded<T, Fut>(&self, report: &'static str, fetch: Fut) -> Result<Report<T>, AppError>
    where
        T: Default,
        Fut: Future<Output = Result<Option<T>, UpstreamError>>,
    {
        if !self.source.is_configured() {
            tracing::debug!(report, "analytics not configured, serving fallback");
            return Ok(Report {
                data: T::default(),
                degraded: Some(UpstreamError::NotConfigured.to_string()),
            });
        }
        let err = match fetch.await {
            Ok(Some(data)) => return Ok(Report { data, degraded: None }),
            Ok(None) => UpstreamError::NoData,
            Err(e) => e,
        };
        tracing::warn!(report, error = %err, "analytics upstream failed");
        if self.degrade_gracefully {
            Ok(Report {
                data: T::default(),
                degraded: Some(err.to_string()),
            })
        } else {
            Err(AppError::Upstream(err))
        }
    }

    pub async fn metrics(&self) -> Result<Report<BasicMetrics>, AppError> {
        self.guarded("metrics", self.source.basic_metrics()).await
    }

    pub async fn overview(&self) -> Result<Report<Overview>, AppError> {
        let src = &self.source;
        self.guarded("overview", async {
            let (metrics, top_pages, traffic_sources, device_breakdown) = tokio::try_join!(
                src.basic_metrics(),
                src.top_pages(),
                src.traffic_sources(),
                src.device_breakdown()
            )?;
            Ok::<_, UpstreamError>(metrics.map(|m| Overview {
                page_views: m.screen_page_views,
                sessions: m.sessions,
                users: m.active_users,
                bounce_rate: m.bounce_rate,
                avg_session_duration: m.average_session_duration,
                top_pages,
                traffic_sources,
                device_breakdown,
            }))
        })
        .await
    }

    pub async fn timeseries(&self) -> Result<Report<Timeseries>, AppError> {
        let src = &self.source;
        self.guarded("timeseries", async { src.timeseries().await.map(Some) })
            .await
    }

    pub async fn sources(&self) -> Result<Report<SourcesChart>, AppError> {
        let src = &self.source;
        self.guarded("sources", async {
            let sources = src.traffic_sources().await?;
            Ok::<_, UpstreamError>(Some(SourcesChart {
                labels: sources.iter().map(|s| s.source.clone()).collect(),
                sessions: sources.iter().map(|s| s.percentage).collect(),
            }))
        })
        .await
    }

    pub async fn realtime(&self) -> Result<Report<Realtime>, AppError> {
        let src = &self.source;
        self.guarded("realtime", async {
            Ok::<_, UpstreamError>(src.basic_metrics().await?.map(|m| Realtime {
                active_users: m.active_users,
                sessions: m.sessions,
                page_views: m.screen_page_views,
                current_pages: Vec::new(),
                countries: Vec::new(),
            }))
        })
        .await
    }

    /// Conversion rate is conversions per hundred sessions.
    pub async fn conversions(&self) -> Result<Report<Conversions>, AppError> {
        let src = &self.source;
        let event = self.conversion_event.as_str();
        self.guarded("conversions", async {
            let (metrics, count) =
                tokio::try_join!(src.basic_metrics(), src.event_count(event))?;
            Ok::<_, UpstreamError>(metrics.map(|m| {
                let rate = if m.sessions == 0 {
                    0.0
                } else {
                    ((count as f64 / m.sessions as f64) * 10_000.0).round() / 100.0
                };
                Conversions {
                    total_conversions: count,
                    conversion_rate: rate,
                    revenue: 0.0,
                    goal_completions: Vec::new(),
                    last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                }
            }))
        })
        .await
    }
}
