//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap and serde handle syntactic)
//! - Backend endpoints parse as `http` URLs with a host and are unique
//! - Validate value ranges (interval, timeout and attempts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend `{endpoint}` is not a valid URL: {reason}")]
    InvalidBackend { endpoint: String, reason: String },

    #[error("backend `{endpoint}` uses unsupported scheme `{scheme}` (only http)")]
    UnsupportedScheme { endpoint: String, scheme: String },

    #[error("backend `{0}` is listed more than once")]
    DuplicateBackend(String),

    #[error("listener bind address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for endpoint in &config.backends {
        if let Err(e) = parse_endpoint(endpoint) {
            errors.push(e);
        }
        if !seen.insert(endpoint.as_str()) {
            errors.push(ValidationError::DuplicateBackend(endpoint.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.health_check.interval_ms == 0 {
        errors.push(ValidationError::Zero("health check interval"));
    }
    if config.health_check.timeout_ms == 0 {
        errors.push(ValidationError::Zero("health check timeout"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero("max attempts"));
    }
    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::Zero("request timeout"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a backend endpoint string into a URL the forwarder can reach.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(endpoint).map_err(|e| ValidationError::InvalidBackend {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            endpoint: endpoint.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().is_none() {
        return Err(ValidationError::InvalidBackend {
            endpoint: endpoint.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}
