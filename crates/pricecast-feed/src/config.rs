//! Poller configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Time between fetches.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Capacity of the update queue handed to the consumer.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_interval_ms() -> u64 {
    3_000
}

fn default_buffer_size() -> usize {
    10
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
