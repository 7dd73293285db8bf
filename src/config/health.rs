// ABOUTME: Post-trigger health verification configuration.
// ABOUTME: Probe path, per-request timeout, and the single-shot or polling policy.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_path")]
    pub path: String,

    /// Bound on a single probe request.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default)]
    pub policy: VerifyPolicy,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            timeout: default_timeout(),
            policy: VerifyPolicy::default(),
        }
    }
}

/// How much confidence to gather after triggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum VerifyPolicy {
    /// One probe, shortly after the last trigger returns.
    #[default]
    Once,
    /// Probe until healthy or the deadline passes, doubling the wait up to `max_interval`.
    Poll {
        #[serde(default = "default_interval", with = "humantime_serde")]
        interval: Duration,
        #[serde(default = "default_max_interval", with = "humantime_serde")]
        max_interval: Duration,
        #[serde(default = "default_deadline", with = "humantime_serde")]
        deadline: Duration,
    },
}

fn default_path() -> String {
    "/health".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_deadline() -> Duration {
    Duration::from_secs(300)
}
