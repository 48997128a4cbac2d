//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub console: ListenerConfig,
    #[serde(default)]
    pub events: ListenerConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:4280".to_string()
}

/// Optional TCP listener (console sessions or event stream)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Bind address; the listener is disabled when unset
    #[serde(default)]
    pub bind: Option<String>,
}

/// Connection to the out-of-process Z-Wave driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Address of the driver's JSON-lines socket
    #[serde(default = "default_driver_address")]
    pub address: String,
    /// Connection attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between connection attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: default_driver_address(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_driver_address() -> String {
    "127.0.0.1:4290".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
