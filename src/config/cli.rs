//! Command-line flag surface.
//!
//! Every field of [`ProxyConfig`] that an operator can change is exposed as
//! a flag; anything not given falls back to the schema defaults.

use clap::Parser;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration assembly.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Parser)]
#[command(name = "nexus")]
#[command(about = "Round-robin HTTP load balancer with active and passive health checks", long_about = None)]
pub struct Cli {
    /// Address to accept client connections on.
    #[arg(short, long, default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Backend endpoint URL. Repeat for each backend, in rotation order.
    #[arg(short, long = "backend", value_name = "URL")]
    pub backends: Vec<String>,

    /// Active health check interval in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub health_interval_ms: u64,

    /// Active health check TCP connect timeout in milliseconds.
    #[arg(long, default_value_t = 2_000)]
    pub health_timeout_ms: u64,

    /// Disable active health checks (passive detection stays on).
    #[arg(long)]
    pub no_health_check: bool,

    /// Maximum attempts per request before answering 503.
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Per-attempt upstream request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Expose Prometheus metrics on this address.
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<String>,

    /// Serve the admin status API on this address.
    #[arg(long, value_name = "ADDR")]
    pub admin_address: Option<String>,

    /// Bearer token required by the admin API.
    #[arg(long)]
    pub admin_key: Option<String>,
}

impl Cli {
    /// Merge flags over the defaults and validate the result.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = ProxyConfig::default();

        config.listener.bind_address = self.listen;
        if !self.backends.is_empty() {
            config.backends = self.backends;
        }

        config.health_check.enabled = !self.no_health_check;
        config.health_check.interval_ms = self.health_interval_ms;
        config.health_check.timeout_ms = self.health_timeout_ms;

        config.retries.max_attempts = self.max_attempts;
        config.timeouts.request_ms = self.request_timeout_ms;

        config.observability.log_level = self.log_level;
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = addr;
        }

        if let Some(addr) = self.admin_address {
            config.admin.enabled = true;
            config.admin.bind_address = addr;
        }
        config.admin.api_key = self.admin_key;

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
