use crate::error::{Error, Result};
use log::warn;
use serde::Deserialize;
use std::time::Duration;

/// What the intake loop does with a record that fails validation.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Stop reading from the feed
    #[default]
    Abandon,
    /// Log the record and keep reading
    Skip,
}

/// How trade identifiers are issued.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradeIdScheme {
    /// Uniform random 64-bit values
    #[default]
    Random,
    /// Monotonic counter, unique within the process
    Sequential,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RuntimeConfig {
    pub feed_host: String,
    pub feed_port: u32,
    pub read_timeout_ms: u64,
    pub worker_threads: usize,
    pub on_malformed: MalformedPolicy,
    /// Consecutive read timeouts tolerated before intake stops; 0 waits forever
    pub max_consecutive_timeouts: u32,
    pub trade_ids: TradeIdScheme,
    /// Empty disables the metrics endpoint
    pub metrics_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            feed_host: "127.0.0.1".to_string(),
            feed_port: 9000,
            read_timeout_ms: 5000,
            worker_threads: 4,
            on_malformed: MalformedPolicy::Abandon,
            max_consecutive_timeouts: 3,
            trade_ids: TradeIdScheme::Random,
            metrics_addr: "0.0.0.0:4010".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config file at `path`. A missing file falls back to the
    /// defaults; a file that does not parse or validate is an error.
    pub fn from_toml(path: &str) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Something went wrong reading the runtime config file {}, using defaults: {:?}",
                    path, e
                );
                return Ok(RuntimeConfig::new());
            }
        };
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RuntimeConfig = toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("invalid runtime config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(Error::Configuration(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Configuration(
                "read_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
