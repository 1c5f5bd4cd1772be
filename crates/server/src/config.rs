// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration, loaded from `config.yaml` in the directory given
//! by `--config` / `CONFIG_PATH`. Missing optional fields fall back to
//! defaults; required fields are checked by [`Config::validate`]. Durations
//! are integer seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

/// Notification fan-out service.
#[derive(Debug, Parser)]
#[command(name = "notifyd", version, about)]
pub struct Cli {
    /// Directory containing config.yaml.
    #[arg(long, env = "CONFIG_PATH", default_value = "./config")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port the WebSocket/health listener binds on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Port the Prometheus text endpoint binds on.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// HTTP read timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub read_timeout: u64,
    /// HTTP write timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub write_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Bootstrap broker list. Required, non-empty.
    #[serde(default)]
    pub brokers: Vec<String>,
    /// Topic carrying JSON-encoded notification records. Required.
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ws_buffer")]
    pub read_buffer_size: usize,
    #[serde(default = "default_ws_buffer")]
    pub write_buffer_size: usize,
    /// Seconds to wait for a pong before the read deadline expires.
    #[serde(default = "default_pong_wait")]
    pub pong_wait: u64,
    /// Ping cadence in seconds. Defaults to 90% of `pong_wait`.
    #[serde(default)]
    pub ping_period: Option<u64>,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cert_file: String,
    #[serde(default)]
    pub key_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_http_timeout() -> u64 {
    15
}
fn default_group_id() -> String {
    "notifyd".to_owned()
}
fn default_auto_offset_reset() -> String {
    "earliest".to_owned()
}
fn default_ws_buffer() -> usize {
    1024
}
fn default_pong_wait() -> u64 {
    60
}
fn default_max_message_size() -> usize {
    512_000
}
fn default_log_level() -> String {
    "info".to_owned()
}
fn default_log_format() -> String {
    "text".to_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            metrics_port: default_metrics_port(),
            read_timeout: default_http_timeout(),
            write_timeout: default_http_timeout(),
        }
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            topic: String::new(),
            group_id: default_group_id(),
            auto_offset_reset: default_auto_offset_reset(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: default_ws_buffer(),
            write_buffer_size: default_ws_buffer(),
            pong_wait: default_pong_wait(),
            ping_period: None,
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Config {
    /// Load and validate `config.yaml` from `dir`.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join("config.yaml");
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations missing required fields.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.kafka.brokers.is_empty() || self.kafka.brokers.iter().any(String::is_empty) {
            anyhow::bail!("kafka.brokers must be a non-empty list of broker addresses");
        }
        if self.kafka.topic.is_empty() {
            anyhow::bail!("kafka.topic is required");
        }
        if self.websocket.pong_wait == 0 {
            anyhow::bail!("websocket.pong_wait must be positive");
        }
        if self.tls.enabled && (self.tls.cert_file.is_empty() || self.tls.key_file.is_empty()) {
            anyhow::bail!("tls.cert_file and tls.key_file are required when tls.enabled");
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.server.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.server.write_timeout)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.websocket.pong_wait)
    }

    /// Ping cadence: configured value, or 90% of the pong deadline.
    pub fn ping_period(&self) -> Duration {
        match self.websocket.ping_period {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_millis(self.websocket.pong_wait * 900),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
