//! Configuration management for MapGate.
//!
//! Configuration is read from environment variables once, at startup, into an
//! [`EnvVarConfig`] that implements the core provider traits. Reading goes
//! through an injectable lookup function so tests never touch the process
//! environment.
//!
//! Invalid values fall back to their defaults and log a warning.
//!
//! # Example
//!
//! ```
//! use mapgate::config::EnvVarConfig;
//! use mapgate::types::RateLimitingProvider;
//!
//! let config = EnvVarConfig::from_env();
//! println!("Max requests: {}", config.rate_limit_config().max_requests);
//! ```

use std::env::VarError;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::env_vars;
use mapgate_core::{
    AllowedHosts, ProxyConfig, ProxyProvider, RateLimitCleanupConfig, RateLimitConfig,
    RateLimitingProvider, UpstreamConfig, UpstreamCredentials, defaults,
};

// ============================================================================
// Internal Helpers
// ============================================================================

/// Parses an environment variable with fallback to a default value.
///
/// Logs a warning if the value exists but cannot be parsed.
fn parse_env_var_or_default<T, F>(env_var: &F, var_name: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Result<String, VarError>,
{
    match env_var(var_name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = var_name, value = %value, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Returns the variable's value if it is set and not blank.
fn non_empty<F>(env_var: &F, var_name: &str) -> Option<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    env_var(var_name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a comma-separated string into a Vec of trimmed strings.
///
/// Filters out empty entries after trimming.
fn parse_comma_separated(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// Computation from an env lookup
// ============================================================================

fn compute_rate_limit_config<F>(env_var: &F) -> RateLimitConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let max_requests = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_REQUESTS,
        defaults::RATE_LIMIT_REQUESTS,
    );
    let window_secs = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_WINDOW_SECS,
        defaults::RATE_LIMIT_WINDOW_SECS,
    );

    let config = RateLimitConfig {
        max_requests,
        window_duration: Duration::from_secs(window_secs),
    };

    if !config.is_valid() {
        warn!("Invalid rate limit configuration, using defaults");
        return RateLimitConfig::default();
    }

    config
}

fn compute_rate_limit_cleanup_config<F>(env_var: &F) -> RateLimitCleanupConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let threshold = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_CLEANUP_THRESHOLD,
        defaults::RATE_LIMIT_CLEANUP_THRESHOLD,
    );
    let interval_secs = parse_env_var_or_default(
        env_var,
        env_vars::RATE_LIMIT_CLEANUP_INTERVAL_SECS,
        defaults::RATE_LIMIT_CLEANUP_INTERVAL_SECS,
    );

    RateLimitCleanupConfig {
        threshold,
        interval: Duration::from_secs(interval_secs),
    }
}

fn compute_proxy_config<F>(env_var: &F) -> ProxyConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let timeout_secs = parse_env_var_or_default(
        env_var,
        env_vars::PROXY_TIMEOUT_SECS,
        defaults::PROXY_TIMEOUT_SECS,
    );
    let max_body_mb = parse_env_var_or_default(
        env_var,
        env_vars::MAX_BODY_SIZE_MB,
        defaults::MAX_BODY_SIZE_MB,
    );
    let max_body_size = ProxyConfig::mb_to_bytes(max_body_mb).unwrap_or_else(|| {
        warn!(var = env_vars::MAX_BODY_SIZE_MB, value = max_body_mb, "Body size limit too large, using default");
        defaults::MAX_BODY_SIZE
    });
    let path_prefix = match non_empty(env_var, env_vars::PROXY_PATH_PREFIX) {
        Some(raw) => match ProxyConfig::normalize_prefix(&raw) {
            prefix if prefix == "/" => {
                warn!(var = env_vars::PROXY_PATH_PREFIX, value = %raw, "Proxy prefix has no path segment, using default");
                defaults::PROXY_PATH_PREFIX.to_string()
            }
            prefix => prefix,
        },
        None => defaults::PROXY_PATH_PREFIX.to_string(),
    };

    let config = ProxyConfig {
        timeout: Duration::from_secs(timeout_secs),
        max_body_size,
        path_prefix,
    };

    if !config.is_valid() {
        warn!("Invalid proxy configuration, using defaults");
        return ProxyConfig::default();
    }

    config
}

fn compute_upstream_config<F>(env_var: &F) -> UpstreamConfig
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let base_url = non_empty(env_var, env_vars::UPSTREAM_URL)
        .unwrap_or_else(|| defaults::UPSTREAM_URL.to_string());

    let username = non_empty(env_var, env_vars::UPSTREAM_USERNAME);
    let password = env_var(env_vars::UPSTREAM_PASSWORD).ok();
    let credentials = match (username, password) {
        (Some(username), Some(password)) => Some(UpstreamCredentials::new(username, password)),
        (Some(_), None) => {
            warn!(
                var = env_vars::UPSTREAM_PASSWORD,
                "Upstream username set without password, not sending credentials"
            );
            None
        }
        (None, Some(_)) => {
            warn!(
                var = env_vars::UPSTREAM_USERNAME,
                "Upstream password set without username, not sending credentials"
            );
            None
        }
        (None, None) => None,
    };

    UpstreamConfig {
        base_url,
        credentials,
        access_token: non_empty(env_var, env_vars::UPSTREAM_ACCESS_TOKEN),
    }
}

fn compute_allowed_hosts<F>(env_var: &F) -> AllowedHosts
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match non_empty(env_var, env_vars::PROXY_ALLOWED_HOSTS) {
        Some(hosts) => AllowedHosts::new(parse_comma_separated(&hosts)),
        None => AllowedHosts::default(),
    }
}

// ============================================================================
// EnvVarConfig - provider implementation using environment variables
// ============================================================================

/// Configuration provider that reads from environment variables.
///
/// This is the configuration provider for the MapGate binary. All values
/// are computed when it is created.
#[derive(Clone, Debug)]
pub struct EnvVarConfig {
    rate_limit: RateLimitConfig,
    cleanup: RateLimitCleanupConfig,
    proxy: ProxyConfig,
    upstream: UpstreamConfig,
    allowed_hosts: AllowedHosts,
    data_dir: PathBuf,
}

impl EnvVarConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Reads the configuration through `env_var`.
    pub fn from_lookup<F>(env_var: F) -> Self
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let data_dir = non_empty(&env_var, env_vars::DATA_DIR)
            .unwrap_or_else(|| defaults::DATA_DIR.to_string());

        Self {
            rate_limit: compute_rate_limit_config(&env_var),
            cleanup: compute_rate_limit_cleanup_config(&env_var),
            proxy: compute_proxy_config(&env_var),
            upstream: compute_upstream_config(&env_var),
            allowed_hosts: compute_allowed_hosts(&env_var),
            data_dir: PathBuf::from(data_dir),
        }
    }

    /// Directory served by the data routes.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for EnvVarConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RateLimitingProvider for EnvVarConfig {
    fn rate_limit_config(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    fn rate_limit_cleanup_config(&self) -> &RateLimitCleanupConfig {
        &self.cleanup
    }
}

impl ProxyProvider for EnvVarConfig {
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
