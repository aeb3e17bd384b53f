//! Type definitions for MapGate configuration.
//!
//! This module contains:
//! - Composable configuration traits
//! - Rate limiting and cleanup configuration
//! - Proxy, upstream and whitelist configuration

use std::collections::HashSet;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::defaults;

// ============================================================================
// Composable Configuration Traits
// ============================================================================

/// Configuration for rate limiting behavior.
pub trait RateLimitingProvider: Send + Sync {
    /// Returns the rate limiting configuration.
    fn rate_limit_config(&self) -> &RateLimitConfig;

    /// Returns the rate limiter cleanup configuration.
    fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig;
}

/// Configuration for proxy behavior and the upstream it talks to.
pub trait ProxyProvider: Send + Sync {
    /// Returns the proxy configuration.
    fn proxy_config(&self) -> &ProxyConfig;

    /// Returns the upstream server configuration.
    fn upstream_config(&self) -> &UpstreamConfig;

    /// Returns the set of hosts the proxy may forward to.
    fn allowed_hosts(&self) -> &AllowedHosts;
}

/// Trait for complete configuration injection.
///
/// Implemented automatically for any type implementing every provider trait.
///
/// # Example
///
/// ```
/// use mapgate_core::{
///     AllowedHosts, ProxyConfig, ProxyProvider, RateLimitCleanupConfig, RateLimitConfig,
///     RateLimitingProvider, UpstreamConfig,
/// };
///
/// struct MyConfig {
///     rate: RateLimitConfig,
///     cleanup: RateLimitCleanupConfig,
///     proxy: ProxyConfig,
///     upstream: UpstreamConfig,
///     hosts: AllowedHosts,
/// }
///
/// impl RateLimitingProvider for MyConfig {
///     fn rate_limit_config(&self) -> &RateLimitConfig { &self.rate }
///     fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig { &self.cleanup }
/// }
///
/// impl ProxyProvider for MyConfig {
///     fn proxy_config(&self) -> &ProxyConfig { &self.proxy }
///     fn upstream_config(&self) -> &UpstreamConfig { &self.upstream }
///     fn allowed_hosts(&self) -> &AllowedHosts { &self.hosts }
/// }
/// ```
pub trait ConfigProvider: RateLimitingProvider + ProxyProvider {}

impl<T> ConfigProvider for T where T: RateLimitingProvider + ProxyProvider {}

// ============================================================================
// Rate limiting
// ============================================================================

/// Sliding window admission limits, applied per client.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mapgate_core::RateLimitConfig;
///
/// let config = RateLimitConfig {
///     max_requests: 100,
///     window_duration: Duration::from_secs(60),
/// };
///
/// assert!(config.is_valid());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum number of admissions per client within the window
    pub max_requests: u32,
    /// Length of the lookback window
    pub window_duration: Duration,
}

impl RateLimitConfig {
    /// A valid configuration admits at least one request over a non-zero window.
    pub fn is_valid(&self) -> bool {
        self.max_requests > 0 && !self.window_duration.is_zero()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: defaults::RATE_LIMIT_REQUESTS,
            window_duration: defaults::RATE_LIMIT_WINDOW,
        }
    }
}

/// Configuration for sweeping clients whose window has fully expired.
///
/// Keeps limiter memory bounded under a churning client population.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitCleanupConfig {
    /// Number of tracked clients before an inline sweep is considered (0 = disabled)
    pub threshold: usize,
    /// Minimum interval between sweeps
    pub interval: Duration,
}

impl RateLimitCleanupConfig {
    /// Inline cleanup is enabled when threshold is greater than zero.
    pub fn is_enabled(&self) -> bool {
        self.threshold > 0
    }
}

impl Default for RateLimitCleanupConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::RATE_LIMIT_CLEANUP_THRESHOLD,
            interval: defaults::RATE_LIMIT_CLEANUP_INTERVAL,
        }
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// Configuration for the proxy route and upstream communication.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mapgate_core::ProxyConfig;
///
/// let config = ProxyConfig {
///     timeout: Duration::from_secs(15),
///     max_body_size: ProxyConfig::mb_to_bytes(100).unwrap(),
///     path_prefix: "/sgs-proxy/".to_string(),
/// };
///
/// assert!(config.is_valid());
/// assert_eq!(config.max_body_size_mb(), "100");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Timeout for upstream requests
    pub timeout: Duration,
    /// Maximum inbound body size in bytes (0 = unlimited)
    pub max_body_size: usize,
    /// Path prefix that selects the proxy route; always starts and ends with `/`
    pub path_prefix: String,
}

impl ProxyConfig {
    /// A valid configuration has a non-zero timeout and a rooted prefix with
    /// at least one segment; a bare `/` would capture every route.
    pub fn is_valid(&self) -> bool {
        !self.timeout.is_zero() && self.path_prefix.starts_with('/') && self.path_prefix != "/"
    }

    /// Returns the maximum body size formatted for display.
    pub fn max_body_size_mb(&self) -> String {
        if self.max_body_size == 0 {
            "unlimited".to_string()
        } else {
            (self.max_body_size / 1024 / 1024).to_string()
        }
    }

    /// Converts megabytes to bytes; 0 stays 0 (unlimited).
    ///
    /// Returns `None` if the byte count does not fit in `usize`.
    pub fn mb_to_bytes(mb: usize) -> Option<usize> {
        mb.checked_mul(1024 * 1024)
    }

    /// Normalizes a route prefix to the `/prefix/` form.
    pub fn normalize_prefix(prefix: &str) -> String {
        let trimmed = prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout: defaults::PROXY_TIMEOUT,
            max_body_size: defaults::MAX_BODY_SIZE,
            path_prefix: defaults::PROXY_PATH_PREFIX.to_string(),
        }
    }
}

/// Basic credentials presented to the upstream server.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamCredentials {
    username: String,
    password: String,
}

impl UpstreamCredentials {
    /// Creates credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the `Authorization` header value (RFC 7617).
    ///
    /// ```
    /// use mapgate_core::UpstreamCredentials;
    ///
    /// let creds = UpstreamCredentials::new("Aladdin", "open sesame");
    /// assert_eq!(creds.basic_auth_value(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    /// ```
    pub fn basic_auth_value(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl std::fmt::Debug for UpstreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The upstream map server and the fixed headers sent with every call.
#[derive(Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL of the upstream, e.g. `http://124.17.4.220:24088/SG`
    pub base_url: String,
    /// Basic credentials, if configured
    pub credentials: Option<UpstreamCredentials>,
    /// Value for the `X-Access-Token` header, if configured
    pub access_token: Option<String>,
}

impl UpstreamConfig {
    /// Creates an upstream configuration without credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            access_token: None,
        }
    }

    /// Returns the base URL with trailing slashes removed and the `/SG`
    /// segment appended when missing.
    ///
    /// ```
    /// use mapgate_core::UpstreamConfig;
    ///
    /// assert_eq!(UpstreamConfig::new("http://h:1/").normalized_base(), "http://h:1/SG");
    /// assert_eq!(UpstreamConfig::new("http://h:1/sg/").normalized_base(), "http://h:1/sg");
    /// ```
    pub fn normalized_base(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let segment = defaults::UPSTREAM_PATH_SEGMENT;
        if base.len() >= segment.len()
            && base.is_char_boundary(base.len() - segment.len())
            && base[base.len() - segment.len()..].eq_ignore_ascii_case(segment)
        {
            base.to_string()
        } else {
            format!("{base}{segment}")
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::new(defaults::UPSTREAM_URL)
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Immutable set of hostnames the proxy may forward to.
///
/// Hostnames are compared case-insensitively.
///
/// ```
/// use mapgate_core::AllowedHosts;
///
/// let hosts = AllowedHosts::new(["124.17.4.220", "Maps.Example.org"]);
/// assert!(hosts.contains("maps.example.org"));
/// assert!(!hosts.contains("evil.com"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowedHosts {
    hosts: HashSet<String>,
}

impl AllowedHosts {
    /// Builds a whitelist, dropping blank entries.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Returns true if `host` is whitelisted.
    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(&host.to_ascii_lowercase())
    }

    /// Returns the number of whitelisted hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true if nothing is whitelisted (every forward is refused).
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Returns the whitelisted hosts in sorted order.
    pub fn sorted(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.hosts.iter().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }
}

impl Default for AllowedHosts {
    fn default() -> Self {
        Self::new(defaults::ALLOWED_HOSTS)
    }
}
