//! Application settings and configuration management

use crate::backend::instance::InstanceAddress;
use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Instances registered at startup, in round-robin order
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Health probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_health_check_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_health_check_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_health_check_path")]
    pub path: String,
    /// Upper bound on probes in flight during one cycle
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_health_check_interval() -> u64 {
    5
}

fn default_health_check_timeout() -> u64 {
    1000
}

fn default_health_check_path() -> String {
    "/health".to_string()
}

fn default_max_concurrency() -> usize {
    16
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_health_check_interval(),
            timeout_ms: default_health_check_timeout(),
            path: default_health_check_path(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Forwarding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_dispatch_path")]
    pub path: String,
}

fn default_dispatch_timeout() -> u64 {
    5000
}

fn default_dispatch_path() -> String {
    "/process".to_string()
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_dispatch_timeout(),
            path: default_dispatch_path(),
        }
    }
}

/// A seed instance
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    pub ip: String,
    pub port: u16,
}

impl InstanceConfig {
    pub fn address(&self) -> Result<InstanceAddress> {
        InstanceAddress::new(&self.ip, self.port)
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Configuration path is not valid UTF-8".to_string(),
            ))
        })?;

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (prefixed with BALANCER__)
            .add_source(
                Environment::with_prefix("BALANCER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }
        if self.health_check.interval_secs == 0 {
            return Err(invalid("Health check interval cannot be 0"));
        }
        if self.health_check.timeout_ms == 0 {
            return Err(invalid("Health check timeout cannot be 0"));
        }
        if self.health_check.max_concurrency == 0 {
            return Err(invalid("Health check concurrency cannot be 0"));
        }
        if !self.health_check.path.starts_with('/') {
            return Err(invalid("Health check path must start with '/'"));
        }
        if self.dispatch.timeout_ms == 0 {
            return Err(invalid("Dispatch timeout cannot be 0"));
        }
        if !self.dispatch.path.starts_with('/') {
            return Err(invalid("Dispatch path must start with '/'"));
        }

        for instance in &self.instances {
            instance.address().map_err(|e| {
                invalid(&format!(
                    "Seed instance '{}:{}' is invalid: {}",
                    instance.ip, instance.port, e
                ))
            })?;
        }

        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            health_check: HealthCheckConfig::default(),
            dispatch: DispatchConfig::default(),
            instances: vec![],
        }
    }
}
