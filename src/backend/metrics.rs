//! Request metrics: an injected collector, the axum middleware that feeds
//! it, and the periodic flush to a monitoring sink.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

pub const SERVICE_NAME: &str = "TodoAppAPI";
pub const METRICS_NAMESPACE: &str = "TodoApp/API";
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Default, Clone, PartialEq)]
struct MetricsWindow {
    requests: u64,
    errors: u64,
    durations: Vec<Duration>,
}

/// In-process request counters for the current flush window.
///
/// Owned by the server state. Recording and snapshot-and-reset share one
/// mutex so a flush never loses or double-counts a concurrent request.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    window: Mutex<MetricsWindow>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: u16, duration: Duration) {
        let mut window = match self.window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        window.requests += 1;
        if status >= 400 {
            window.errors += 1;
        }
        window.durations.push(duration);
    }

    /// Aggregate the current window without resetting it.
    pub fn peek(&self) -> MetricsReport {
        let window = match self.window.lock() {
            Ok(w) => w.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        MetricsReport::from_window(&window, Utc::now())
    }

    /// Aggregate the current window and reset every counter to zero.
    pub fn take_report(&self) -> MetricsReport {
        let window = match self.window.lock() {
            Ok(mut w) => std::mem::take(&mut *w),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        MetricsReport::from_window(&window, Utc::now())
    }

    /// Take a report and push it. Counters are reset whether or not the
    /// push succeeds; a failed push is logged and dropped.
    pub async fn flush(&self, sink: &dyn MetricsSink) -> MetricsReport {
        let report = self.take_report();
        match sink.push(&report).await {
            Ok(()) => tracing::info!(
                requests = report.request_count,
                errors = report.error_count,
                "Metrics sent"
            ),
            Err(e) => tracing::warn!("Failed to push metrics: {:#}", e),
        }
        report
    }
}

/// Aggregates pushed to the monitoring sink for one flush window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub namespace: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub request_count: u64,
    pub error_count: u64,
    pub average_response_time_ms: f64,
    /// Percentage of requests that failed; absent for an empty window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
}

impl MetricsReport {
    fn from_window(window: &MetricsWindow, timestamp: DateTime<Utc>) -> Self {
        let average_response_time_ms = if window.durations.is_empty() {
            0.0
        } else {
            let total: f64 = window
                .durations
                .iter()
                .map(|d| d.as_secs_f64() * 1000.0)
                .sum();
            total / window.durations.len() as f64
        };
        let error_rate = (window.requests > 0)
            .then(|| window.errors as f64 / window.requests as f64 * 100.0);

        Self {
            namespace: METRICS_NAMESPACE.to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp,
            request_count: window.requests,
            error_count: window.errors,
            average_response_time_ms,
            error_rate,
        }
    }
}

/// Destination for flushed metrics.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn push(&self, report: &MetricsReport) -> anyhow::Result<()>;
}

/// Posts each report as JSON to an external monitoring endpoint.
pub struct HttpMetricsSink {
    client: reqwest::Client,
    endpoint: String,
    region: String,
}

impl HttpMetricsSink {
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build metrics HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            region: region.into(),
        })
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn push(&self, report: &MetricsReport) -> anyhow::Result<()> {
        self.client
            .post(&self.endpoint)
            .header("X-Metrics-Region", &self.region)
            .json(report)
            .send()
            .await
            .context("Failed to send metrics")?
            .error_for_status()
            .context("Monitoring endpoint rejected metrics")?;
        Ok(())
    }
}

/// Writes reports to the log when no monitoring endpoint is configured.
pub struct LogMetricsSink;

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn push(&self, report: &MetricsReport) -> anyhow::Result<()> {
        tracing::info!(
            namespace = %report.namespace,
            requests = report.request_count,
            errors = report.error_count,
            avg_ms = report.average_response_time_ms,
            error_rate = ?report.error_rate,
            "Metrics report"
        );
        Ok(())
    }
}

/// Spawn the periodic flush loop. The first flush happens one full
/// interval after start. Abort the handle to stop it.
pub fn spawn_flush_task(
    collector: Arc<MetricsCollector>,
    sink: Arc<dyn MetricsSink>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            collector.flush(sink.as_ref()).await;
        }
    })
}

/// Middleware: time every request, count it, and log an access line.
pub async fn track_requests(
    State(metrics): State<Arc<MetricsCollector>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();
    metrics.record(status, duration);
    tracing::info!(
        %method,
        %path,
        status,
        duration_ms = duration.as_millis() as u64,
        "request"
    );
    response
}
