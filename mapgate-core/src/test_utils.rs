//! Test utilities for MapGate.
//!
//! Shared configuration used by unit tests. Only compiled for tests.

use crate::types::{
    AllowedHosts, ProxyConfig, ProxyProvider, RateLimitCleanupConfig, RateLimitConfig,
    RateLimitingProvider, UpstreamConfig, UpstreamCredentials,
};
use std::time::Duration;

/// Configuration implementing every provider trait, with builder methods.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    pub rate_limit: RateLimitConfig,
    pub cleanup: RateLimitCleanupConfig,
    pub proxy: ProxyConfig,
    pub upstream: UpstreamConfig,
    pub allowed_hosts: AllowedHosts,
}

impl TestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure rate limiting.
    pub fn with_rate_limit(mut self, max_requests: u32, window_secs: u64) -> Self {
        self.rate_limit = RateLimitConfig {
            max_requests,
            window_duration: Duration::from_secs(window_secs),
        };
        self
    }

    /// Point the proxy at `base_url` and whitelist exactly `hosts`.
    pub fn with_upstream(mut self, base_url: &str, hosts: &[&str]) -> Self {
        self.upstream.base_url = base_url.to_string();
        self.allowed_hosts = AllowedHosts::new(hosts);
        self
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.upstream.credentials = Some(UpstreamCredentials::new(username, password));
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.upstream.access_token = Some(token.to_string());
        self
    }

    /// Configure the body limit in bytes.
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.proxy.max_body_size = bytes;
        self
    }
}

impl RateLimitingProvider for TestConfig {
    fn rate_limit_config(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig {
        &self.cleanup
    }
}

impl ProxyProvider for TestConfig {
    fn proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }

    fn upstream_config(&self) -> &UpstreamConfig {
        &self.upstream
    }

    fn allowed_hosts(&self) -> &AllowedHosts {
        &self.allowed_hosts
    }
}
