//! Google Analytics 4 Data API client (`properties/{id}:runReport`).

use crate::analytics::source::*;
use crate::config::AnalyticsConfig;
use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DATE_RANGE_START: &str = "30daysAgo";
const DATE_RANGE_END: &str = "today";
const TOP_LIMIT: u32 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    #[serde(default)]
    rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    #[serde(default)]
    dimension_values: Vec<Cell>,
    #[serde(default)]
    metric_values: Vec<Cell>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    #[serde(default)]
    value: String,
}

impl ReportRow {
    fn dimension(&self, i: usize) -> String {
        self.dimension_values
            .get(i)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    fn metric(&self, i: usize) -> f64 {
        self.metric_values
            .get(i)
            .and_then(|c| c.value.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    fn count(&self, i: usize) -> u64 {
        self.metric(i).max(0.0).round() as u64
    }
}

fn round_to(v: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (v * f).round() / f
}

fn share(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, 1)
}

/// `20240131` → `2024-01-31`; anything else passes through.
fn iso_date(raw: &str) -> String {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

pub struct Ga4Client {
    client: Client,
    report_url: String,
    access_token: String,
}

impl Ga4Client {
    pub fn new(
        api_base: &str,
        property_id: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Ga4Client {
            client,
            report_url: format!(
                "{}/properties/{}:runReport",
                api_base.trim_end_matches('/'),
                property_id
            ),
            access_token: access_token.to_string(),
        })
    }

    /// `None` when the property or token is missing.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Option<Self>, UpstreamError> {
        match (&config.property_id, &config.access_token) {
            (Some(property), Some(token)) => Self::new(
                &config.api_base,
                property,
                token,
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    async fn run_report(&self, body: Value) -> Result<ReportResponse, UpstreamError> {
        tracing::debug!(url = %self.report_url, "ga4 runReport");
        let response = self
            .client
            .post(&self.report_url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<ReportResponse>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    fn window() -> Value {
        json!([{ "startDate": DATE_RANGE_START, "endDate": DATE_RANGE_END }])
    }

    async fn sessions_by(&self, dimension: &str) -> Result<Vec<(String, u64)>, UpstreamError> {
        let report = self
            .run_report(json!({
                "dateRanges": Self::window(),
                "dimensions": [{ "name": dimension }],
                "metrics": [{ "name": "sessions" }],
                "orderBys": [{ "metric": { "metricName": "sessions" }, "desc": true }],
                "limit": TOP_LIMIT,
            }))
            .await?;
        Ok(report
            .rows
            .iter()
            .map(|r| (r.dimension(0), r.count(0)))
            .collect())
    }
}

#[async_trait]
impl AnalyticsSource for Ga4Client {
    fn is_configured(&self) -> bool {
        true
    }

    async fn basic_metrics(&self) -> Result<Option<BasicMetrics>, UpstreamError> {
        let report = self
            .run_report(json!({
                "dateRanges": Self::window(),
                "metrics": [
                    { "name": "activeUsers" },
                    { "name": "sessions" },
                    { "name": "screenPageViews" },
                    { "name": "averageSessionDuration" },
                    { "name": "bounceRate" },
                ],
            }))
            .await?;
        Ok(report.rows.first().map(|r| BasicMetrics {
            active_users: r.count(0),
            sessions: r.count(1),
            screen_page_views: r.count(2),
            average_session_duration: round_to(r.metric(3), 1),
            bounce_rate: round_to(r.metric(4) * 100.0, 2),
        }))
    }

    async fn top_pages(&self) -> Result<Vec<PageStat>, UpstreamError> {
        let report = self
            .run_report(json!({
                "dateRanges": Self::window(),
                "dimensions": [{ "name": "pagePath" }],
                "metrics": [{ "name": "screenPageViews" }],
                "orderBys": [{ "metric": { "metricName": "screenPageViews" }, "desc": true }],
                "limit": TOP_LIMIT,
            }))
            .await?;
        Ok(report
            .rows
            .iter()
            .map(|r| PageStat {
                path: r.dimension(0),
                views: r.count(0),
            })
            .collect())
    }

    async fn traffic_sources(&self) -> Result<Vec<TrafficSource>, UpstreamError> {
        let rows = self.sessions_by("sessionDefaultChannelGroup").await?;
        let total: u64 = rows.iter().map(|(_, n)| n).sum();
        Ok(rows
            .into_iter()
            .map(|(source, sessions)| TrafficSource {
                source,
                sessions,
                percentage: share(sessions, total),
            })
            .collect())
    }

    async fn device_breakdown(&self) -> Result<Vec<DeviceStat>, UpstreamError> {
        let rows = self.sessions_by("deviceCategory").await?;
        let total: u64 = rows.iter().map(|(_, n)| n).sum();
        Ok(rows
            .into_iter()
            .map(|(device, sessions)| DeviceStat {
                device,
                sessions,
                percentage: share(sessions, total),
            })
            .collect())
    }

    async fn timeseries(&self) -> Result<Timeseries, UpstreamError> {
        let report = self
            .run_report(json!({
                "dateRanges": Self::window(),
                "dimensions": [{ "name": "date" }],
                "metrics": [{ "name": "activeUsers" }, { "name": "sessions" }],
                "orderBys": [{ "dimension": { "dimensionName": "date" } }],
            }))
            .await?;
        let mut ts = Timeseries::default();
        for r in &report.rows {
            ts.labels.push(iso_date(&r.dimension(0)));
            ts.users.push(r.count(0));
            ts.sessions.push(r.count(1));
        }
        Ok(ts)
    }

    async fn event_count(&self, event: &str) -> Result<u64, UpstreamError> {
        let report = self
            .run_report(json!({
                "dateRanges": Self::window(),
                "dimensions": [{ "name": "eventName" }],
                "metrics": [{ "name": "eventCount" }],
                "dimensionFilter": {
                    "filter": {
                        "fieldName": "eventName",
                        "stringFilter": { "matchType": "EXACT", "value": event }
                    }
                },
            }))
            .await?;
        Ok(report.rows.iter().map(|r| r.count(0)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn client(server: &MockServer) -> Ga4Client {
        Ga4Client::new(&server.uri(), "123", "tok", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn dates_become_iso() {
        assert_eq!(iso_date("20240131"), "2024-01-31");
        assert_eq!(iso_date("2024-01-31"), "2024-01-31");
    }

    #[test]
    fn shares_handle_zero_total() {
        assert_eq!(share(1, 0), 0.0);
        assert_eq!(share(1, 3), 33.3);
    }

    #[tokio::test]
    async fn basic_metrics_parses_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/properties/123:runReport"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [{
                    "metricValues": [
                        {"value": "42"}, {"value": "55"}, {"value": "180"},
                        {"value": "73.456"}, {"value": "0.4123"}
                    ]
                }]
            })))
            .mount(&server)
            .await;
        let m = client(&server).await.basic_metrics().await.unwrap().unwrap();
        assert_eq!(m.active_users, 42);
        assert_eq!(m.sessions, 55);
        assert_eq!(m.screen_page_views, 180);
        assert_eq!(m.average_session_duration, 73.5);
        assert_eq!(m.bounce_rate, 41.23);
    }

    #[tokio::test]
    async fn empty_report_is_no_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        assert_eq!(client(&server).await.basic_metrics().await.unwrap(), None);
    }

    #[tokio::test]
    async fn traffic_sources_carry_percentages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"dimensions": [{"name": "sessionDefaultChannelGroup"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [
                    {"dimensionValues": [{"value": "Organic Search"}], "metricValues": [{"value": "75"}]},
                    {"dimensionValues": [{"value": "Direct"}], "metricValues": [{"value": "25"}]}
                ]
            })))
            .mount(&server)
            .await;
        let sources = client(&server).await.traffic_sources().await.unwrap();
        assert_eq!(sources[0].source, "Organic Search");
        assert_eq!(sources[0].percentage, 75.0);
        assert_eq!(sources[1].percentage, 25.0);
    }

    #[tokio::test]
    async fn timeseries_labels_are_iso_dates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [
                    {"dimensionValues": [{"value": "20240101"}], "metricValues": [{"value": "3"}, {"value": "4"}]},
                    {"dimensionValues": [{"value": "20240102"}], "metricValues": [{"value": "5"}, {"value": "6"}]}
                ]
            })))
            .mount(&server)
            .await;
        let ts = client(&server).await.timeseries().await.unwrap();
        assert_eq!(ts.labels, vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(ts.users, vec![3, 5]);
        assert_eq!(ts.sessions, vec![4, 6]);
    }

    #[tokio::test]
    async fn upstream_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;
        let err = client(&server).await.top_pages().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 403, .. }));
    }

    #[test]
    fn from_config_requires_both_credentials() {
        let mut cfg = crate::config::AppConfig::default().analytics;
        cfg.property_id = Some("123".into());
        assert!(Ga4Client::from_config(&cfg).unwrap().is_none());
        cfg.access_token = Some("tok".into());
        assert!(Ga4Client::from_config(&cfg).unwrap().is_some());
    }
}
