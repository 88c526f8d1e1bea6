//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command-line flags
//!     → cli.rs (clap parse, merge over defaults)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared by reference to pool, dispatcher and health checker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; no reload
//! - All fields have defaults to allow minimal invocations
//! - Validation separates syntactic (clap) from semantic checks

pub mod cli;
pub mod schema;
pub mod validation;

pub use cli::{Cli, ConfigError};
pub use schema::{
    AdminConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    RetryConfig, TimeoutConfig,
};
