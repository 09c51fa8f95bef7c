//! Application configuration.
//!
//! Loaded from an optional TOML file layered under `PRICECAST__*`
//! environment variables (`__` separates nested keys).

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use pricecast_core::Pair;
use pricecast_feed::PollerConfig;
use pricecast_history::HistoryConfig;
use pricecast_hub::HubConfig;
use pricecast_quotes::UpstreamConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "PRICECAST";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pair the poller monitors.
    #[serde(default = "default_pair")]
    pub pair: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_pair() -> String {
    Pair::BTC_USD.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pair: default_pair(),
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            poller: PollerConfig::default(),
            history: HistoryConfig::default(),
            hub: HubConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Pair streamed by `GET /stream`.
    #[serde(default = "default_pair")]
    pub default_pair: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_pair: default_pair(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Serve `GET /metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (if it exists) with environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        Self::load_with_env(path, None)
    }

    /// Load with an explicit environment map instead of the process
    /// environment. `None` reads the process environment.
    pub fn load_with_env(
        path: &str,
        env: Option<config::Map<String, String>>,
    ) -> AppResult<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "Config file not found, using defaults");
        }

        let config: Self = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Environment overrides are not applied.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero sizes and intervals and unparsable pairs.
    pub fn validate(&self) -> AppResult<()> {
        self.pair()?;
        self.default_pair()?;

        let zero = [
            ("upstream.retry.max_attempts", self.upstream.retry.max_attempts == 0),
            ("upstream.timeout_ms", self.upstream.timeout_ms == 0),
            ("poller.interval_ms", self.poller.interval_ms == 0),
            ("poller.buffer_size", self.poller.buffer_size == 0),
            ("history.capacity", self.history.capacity == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(AppError::Config(format!("{name} must be positive")));
        }

        self.hub.validate()?;
        Ok(())
    }

    /// The monitored pair.
    pub fn pair(&self) -> AppResult<Pair> {
        self.pair
            .parse()
            .map_err(|e| AppError::Config(format!("pair: {e}")))
    }

    /// The pair served by `GET /stream`.
    pub fn default_pair(&self) -> AppResult<Pair> {
        self.server
            .default_pair
            .parse()
            .map_err(|e| AppError::Config(format!("server.default_pair: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricecast_history::HistoryBackend;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.pair().unwrap(), Pair::BTC_USD);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.retry.max_attempts, 3);
        assert_eq!(config.poller.interval_ms, 3_000);
        assert_eq!(config.history.backend, HistoryBackend::Ring);
        assert_eq!(config.history.capacity, 100);
        assert_eq!(config.hub.ingress_capacity, 64);
        assert!(config.telemetry.metrics_enabled);
    }

    #[test]
    fn test_partial_file() {
        let config = AppConfig::from_toml(
            r#"
            pair = "ETHEUR"

            [history]
            backend = "vec"

            [upstream.retry]
            initial_wait_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.pair().unwrap().to_string(), "ETHEUR");
        assert_eq!(config.history.backend, HistoryBackend::Vec);
        assert_eq!(config.history.capacity, 100);
        assert_eq!(config.upstream.retry.initial_wait_ms, 250);
        assert_eq!(config.upstream.retry.max_wait_ms, 5_000);
    }

    #[test]
    fn test_env_overrides_file() {
        let env: config::Map<String, String> = [
            ("PRICECAST__POLLER__INTERVAL_MS", "500"),
            ("PRICECAST__SERVER__PORT", "9090"),
            ("PRICECAST__PAIR", "ETHUSD"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::load_with_env("does/not/exist.toml", Some(env)).unwrap();
        assert_eq!(config.poller.interval_ms, 500);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.pair().unwrap().to_string(), "ETHUSD");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AppConfig::from_toml("pair = \"BTC\"").is_err());
        assert!(AppConfig::from_toml("[poller]\ninterval_ms = 0").is_err());
        assert!(AppConfig::from_toml("[history]\ncapacity = 0").is_err());
        assert!(AppConfig::from_toml("[hub]\nsubscriber_queue_size = 0").is_err());
        assert!(AppConfig::from_toml("[upstream.retry]\nmax_attempts = 0").is_err());
    }
}
