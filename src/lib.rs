//! MapGate - Ingress gate for a geospatial map server
//!
//! Fronts an upstream map server with per-client rate limiting, an upstream
//! host whitelist, and a hash-validated cache for local data files.
//!
//! # Overview
//!
//! The binary reads its configuration from the environment (plus an optional
//! `.env` file), builds one [`IngressState`] and serves HTTP/1 until Ctrl-C.
//!
//! # Example
//!
//! ```rust,no_run
//! use mapgate::config::EnvVarConfig;
//! use mapgate::IngressState;
//!
//! let config = EnvVarConfig::from_env();
//! let state = IngressState::from_config(&config, config.data_dir()).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`config`] - Configuration from environment variables
//! - [`env_vars`] - Environment variable constants
//! - [`server`] - Accept loop, shutdown and startup banner
//! - [`args`] - Command line argument parsing
//!
//! # Re-exports from mapgate-core
//!
//! - [`rate_limiter`] - Sliding window rate limiting
//! - [`content_cache`] - Hash-validated file cache
//! - [`forwarder`] - Upstream forwarding with host whitelisting
//! - [`request_handler`] - HTTP routing and error responses

#![forbid(unsafe_code)]

pub mod args;
pub mod config;
pub mod env_vars;
pub mod server;

// Re-export mapgate-core modules
pub use mapgate_core::content_cache;
pub use mapgate_core::forwarder;
pub use mapgate_core::rate_limiter;
pub use mapgate_core::request_handler;
pub use mapgate_core::types;

// Re-export commonly used items at crate root
pub use config::EnvVarConfig;
pub use mapgate_core::{
    AllowedHosts, ConfigProvider, ContentCache, IngressState, MapGateError, ProxyConfig,
    ProxyForwarder, ProxyProvider, RateLimitCleanupConfig, RateLimitConfig, RateLimiter,
    RateLimitingProvider, UpstreamConfig,
};
