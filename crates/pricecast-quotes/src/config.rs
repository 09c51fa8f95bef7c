//! Upstream and retry configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry policy with capped exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per fetch, including the first (must be >= 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    #[serde(default = "default_initial_wait_ms")]
    pub initial_wait_ms: u64,
    /// Upper bound for any single wait.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_wait_ms() -> u64 {
    500
}

fn default_max_wait_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_wait_ms: default_initial_wait_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl RetryConfig {
    /// Wait after the zero-based `attempt` failed:
    /// `min(initial_wait * 2^attempt, max_wait)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(32);
        let delay = self.initial_wait_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_wait_ms))
    }
}

/// Upstream quote provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Price endpoint; `fsym`/`tsyms` query parameters are appended.
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_url() -> String {
    "https://min-api.cryptocompare.com/data/price".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}
