// ABOUTME: Post-trigger health verification against the public endpoint.
// ABOUTME: A single bounded probe by default, or a bounded polling sequence.

mod probe;
mod url;

pub use probe::{HealthProbe, HttpProbe, ProbeError};
pub use url::HealthUrl;

use crate::config::{HealthConfig, VerifyPolicy};
use crate::deploy::CancelToken;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// 2xx and 3xx count as healthy.
    pub fn from_http(status: u16) -> Self {
        if (200..400).contains(&status) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub url: Option<String>,
    pub http_status: Option<u16>,
    pub attempts: u32,
    pub detail: Option<String>,
}

impl HealthReport {
    fn unknown(detail: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unknown,
            url: None,
            http_status: None,
            attempts: 0,
            detail: Some(detail.into()),
        }
    }

    fn invalid(url: Option<String>, err: &ProbeError) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            url,
            http_status: None,
            attempts: 0,
            detail: Some(err.to_string()),
        }
    }
}

/// Probe `endpoint` once. `None` endpoint yields `Unknown` without any request.
pub async fn verify_once<P>(
    probe: &P,
    endpoint: Option<&str>,
    path: &str,
    timeout: Duration,
) -> HealthReport
where
    P: HealthProbe + ?Sized,
{
    let Some(endpoint) = endpoint else {
        return HealthReport::unknown("no public endpoint");
    };
    let url = match HealthUrl::build(endpoint, path) {
        Ok(url) => url,
        Err(e) => return HealthReport::invalid(Some(endpoint.to_string()), &e),
    };
    attempt(probe, &url, timeout, 1).await
}

/// Verify according to the configured policy. Never retries past the policy's bounds.
///
/// Polling stops early once `cancel` fires; the last attempt is reported.
pub async fn verify<P>(
    probe: &P,
    endpoint: Option<&str>,
    config: &HealthConfig,
    cancel: &CancelToken,
) -> HealthReport
where
    P: HealthProbe + ?Sized,
{
    match config.policy {
        VerifyPolicy::Once => verify_once(probe, endpoint, &config.path, config.timeout).await,
        VerifyPolicy::Poll {
            interval,
            max_interval,
            deadline,
        } => {
            let Some(endpoint) = endpoint else {
                return HealthReport::unknown("no public endpoint");
            };
            let url = match HealthUrl::build(endpoint, &config.path) {
                Ok(url) => url,
                Err(e) => return HealthReport::invalid(Some(endpoint.to_string()), &e),
            };
            let bounds = PollBounds {
                timeout: config.timeout,
                interval,
                max_interval,
                deadline,
            };
            poll(probe, &url, bounds, cancel).await
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PollBounds {
    timeout: Duration,
    interval: Duration,
    max_interval: Duration,
    deadline: Duration,
}

async fn poll<P>(
    probe: &P,
    url: &HealthUrl,
    bounds: PollBounds,
    cancel: &CancelToken,
) -> HealthReport
where
    P: HealthProbe + ?Sized,
{
    let started = Instant::now();
    let mut wait = bounds.interval;
    let mut attempts = 0;
    loop {
        attempts += 1;
        let report = attempt(probe, url, bounds.timeout, attempts).await;
        if report.status == HealthStatus::Healthy {
            return report;
        }
        if cancel.is_cancelled() {
            tracing::debug!(attempts, "health polling cancelled");
            return report;
        }
        if started.elapsed() + wait > bounds.deadline {
            tracing::debug!(attempts, "health deadline reached");
            return report;
        }
        tracing::debug!(attempts, wait_ms = wait.as_millis() as u64, "endpoint not healthy yet");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(attempts, "health polling cancelled");
                return report;
            }
            _ = tokio::time::sleep(wait) => {}
        }
        wait = (wait * 2).min(bounds.max_interval);
    }
}

async fn attempt<P>(probe: &P, url: &HealthUrl, timeout: Duration, attempts: u32) -> HealthReport
where
    P: HealthProbe + ?Sized,
{
    let result = probe.get(url, timeout).await;
    let (status, http_status, detail) = match result {
        Ok(code) => {
            let status = HealthStatus::from_http(code);
            let detail = (status != HealthStatus::Healthy).then(|| format!("HTTP {}", code));
            (status, Some(code), detail)
        }
        Err(e) => (HealthStatus::Unhealthy, None, Some(e.to_string())),
    };
    tracing::debug!(url = %url, %status, ?http_status, "health probe");
    HealthReport {
        status,
        url: Some(url.to_string()),
        http_status,
        attempts,
        detail,
    }
}
