//! MapGate Core - Ingress control for a geospatial map proxy
//!
//! This crate provides the components that sit in front of the upstream map
//! server:
//! - Sliding window rate limiting per client
//! - File content cache invalidated by content hash
//! - Method-agnostic forwarding restricted to whitelisted upstream hosts
//! - An HTTP request handler wiring the three together, with allow-all CORS
//!
//! # Overview
//!
//! Configuration is provided via the [`ConfigProvider`] trait, so the same
//! components can be driven from environment variables, files, or tests.
//! Nothing here is global: build an [`IngressState`] once and share it.
//!
//! # Example
//!
//! ```rust,no_run
//! use mapgate_core::{
//!     AllowedHosts, IngressState, ProxyConfig, ProxyProvider, RateLimitCleanupConfig,
//!     RateLimitConfig, RateLimitingProvider, UpstreamConfig,
//! };
//!
//! #[derive(Default)]
//! struct MyConfig {
//!     rate: RateLimitConfig,
//!     cleanup: RateLimitCleanupConfig,
//!     proxy: ProxyConfig,
//!     upstream: UpstreamConfig,
//!     hosts: AllowedHosts,
//! }
//!
//! impl RateLimitingProvider for MyConfig {
//!     fn rate_limit_config(&self) -> &RateLimitConfig { &self.rate }
//!     fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig { &self.cleanup }
//! }
//!
//! impl ProxyProvider for MyConfig {
//!     fn proxy_config(&self) -> &ProxyConfig { &self.proxy }
//!     fn upstream_config(&self) -> &UpstreamConfig { &self.upstream }
//!     fn allowed_hosts(&self) -> &AllowedHosts { &self.hosts }
//! }
//!
//! let state = IngressState::from_config(&MyConfig::default(), "data").unwrap();
//! ```
//!
//! # Modules
//!
//! - [`types`] - Configuration traits and structs
//! - [`error`] - Error types and result aliases
//! - [`headers`] - HTTP header constants
//! - [`clock`] - Time source used by the rate limiter
//! - [`client_ip`] - Client identity extraction
//! - [`cors`] - Cross-origin headers and preflight answers
//! - [`rate_limiter`] - Sliding window rate limiting
//! - [`content_cache`] - Hash-validated file cache
//! - [`forwarder`] - Upstream forwarding with host whitelisting
//! - [`request_handler`] - HTTP routing and error responses

#![forbid(unsafe_code)]

pub mod client_ip;
pub mod clock;
pub mod content_cache;
pub mod cors;
pub mod defaults;
pub mod error;
pub mod forwarder;
pub mod headers;
pub mod rate_limiter;
pub mod request_handler;
#[cfg(test)]
pub mod test_utils;
pub mod types;

// Re-export commonly used items at crate root
pub use content_cache::{CachedContent, ContentCache, DataKind};
pub use error::{MapGateError, Result};
pub use forwarder::{ForwardRequest, ForwardResponse, ProxyForwarder};
pub use rate_limiter::RateLimiter;
pub use request_handler::IngressState;
pub use types::{
    // Configuration structs
    AllowedHosts,
    // Aggregated configuration trait
    ConfigProvider,
    ProxyConfig,
    // Composable configuration traits
    ProxyProvider,
    RateLimitCleanupConfig,
    RateLimitConfig,
    RateLimitingProvider,
    UpstreamConfig,
    UpstreamCredentials,
};
