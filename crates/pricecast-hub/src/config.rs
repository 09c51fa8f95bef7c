//! Hub configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{HubError, HubResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Broadcast ingress capacity. Updates beyond it are dropped.
    #[serde(default = "default_ingress_capacity")]
    pub ingress_capacity: usize,
    /// Interval between sweeps for closed subscribers.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    /// Per-subscriber queue bound.
    #[serde(default = "default_subscriber_queue_size")]
    pub subscriber_queue_size: usize,
    /// Register/unregister channel capacity.
    #[serde(default = "default_control_capacity")]
    pub control_capacity: usize,
}

fn default_ingress_capacity() -> usize {
    64
}

fn default_cleanup_interval_ms() -> u64 {
    30_000
}

fn default_subscriber_queue_size() -> usize {
    10
}

fn default_control_capacity() -> usize {
    16
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ingress_capacity: default_ingress_capacity(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            subscriber_queue_size: default_subscriber_queue_size(),
            control_capacity: default_control_capacity(),
        }
    }
}

impl HubConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Reject zero capacities and intervals.
    pub fn validate(&self) -> HubResult<()> {
        let zero = [
            ("ingress_capacity", self.ingress_capacity == 0),
            ("cleanup_interval_ms", self.cleanup_interval_ms == 0),
            ("subscriber_queue_size", self.subscriber_queue_size == 0),
            ("control_capacity", self.control_capacity == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(HubError::InvalidConfig(format!("{name} must be positive"))),
            None => Ok(()),
        }
    }
}
