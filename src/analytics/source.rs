//! Analytics source capability and the payload shapes served to the dashboard.

use crate::error::UpstreamError;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Site-wide totals over the reporting window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicMetrics {
    pub active_users: u64,
    pub sessions: u64,
    pub screen_page_views: u64,
    /// Seconds.
    pub average_session_duration: f64,
    /// Percentage, 0 to 100.
    pub bounce_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStat {
    pub path: String,
    pub views: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSource {
    pub source: String,
    pub sessions: u64,
    pub percentage: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStat {
    pub device: String,
    pub sessions: u64,
    pub percentage: f64,
}

/// Daily series, oldest first. Labels are ISO dates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeseries {
    pub labels: Vec<String>,
    pub users: Vec<u64>,
    pub sessions: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub page_views: u64,
    pub sessions: u64,
    pub users: u64,
    pub bounce_rate: f64,
    pub avg_session_duration: f64,
    pub top_pages: Vec<PageStat>,
    pub traffic_sources: Vec<TrafficSource>,
    pub device_breakdown: Vec<DeviceStat>,
}

/// Chart-ready source shares: `sessions[i]` is the percentage for `labels[i]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesChart {
    pub labels: Vec<String>,
    pub sessions: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Realtime {
    pub active_users: u64,
    pub sessions: u64,
    pub page_views: u64,
    pub current_pages: Vec<PageStat>,
    pub countries: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversions {
    pub total_conversions: u64,
    pub conversion_rate: f64,
    pub revenue: f64,
    pub goal_completions: Vec<serde_json::Value>,
    pub last_updated: String,
}

impl Default for Conversions {
    fn default() -> Self {
        Conversions {
            total_conversions: 0,
            conversion_rate: 0.0,
            revenue: 0.0,
            goal_completions: Vec::new(),
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Read-only reporting backend. `basic_metrics` returns `None` when the window has no data.
#[async_trait]
pub trait AnalyticsSource: Send + Sync + 'static {
    fn is_configured(&self) -> bool;

    async fn basic_metrics(&self) -> Result<Option<BasicMetrics>, UpstreamError>;

    async fn top_pages(&self) -> Result<Vec<PageStat>, UpstreamError>;

    async fn traffic_sources(&self) -> Result<Vec<TrafficSource>, UpstreamError>;

    async fn device_breakdown(&self) -> Result<Vec<DeviceStat>, UpstreamError>;

    async fn timeseries(&self) -> Result<Timeseries, UpstreamError>;

    /// Occurrences of `event` over the reporting window.
    async fn event_count(&self, event: &str) -> Result<u64, UpstreamError>;
}

/// Stand-in when no credentials are configured.
pub struct Unconfigured;

#[async_trait]
impl AnalyticsSource for Unconfigured {
    fn is_configured(&self) -> bool {
        false
    }

    async fn basic_metrics(&self) -> Result<Option<BasicMetrics>, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }

    async fn top_pages(&self) -> Result<Vec<PageStat>, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }

    async fn traffic_sources(&self) -> Result<Vec<TrafficSource>, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }

    async fn device_breakdown(&self) -> Result<Vec<DeviceStat>, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }

    async fn timeseries(&self) -> Result<Timeseries, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }

    async fn event_count(&self, _event: &str) -> Result<u64, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }
}
