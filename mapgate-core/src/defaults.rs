//! Default configuration values for MapGate.
//!
//! Shared by the environment loader and tests so both agree on one set of
//! numbers.

use std::time::Duration;

/// Default maximum requests per rate limit window.
pub const RATE_LIMIT_REQUESTS: u32 = 100;

/// Default rate limit window duration in seconds.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default rate limit window duration.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(RATE_LIMIT_WINDOW_SECS);

/// Default cleanup threshold (number of tracked clients before an inline sweep).
pub const RATE_LIMIT_CLEANUP_THRESHOLD: usize = 10_000;

/// Default cleanup interval in seconds.
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default cleanup interval duration.
pub const RATE_LIMIT_CLEANUP_INTERVAL: Duration =
    Duration::from_secs(RATE_LIMIT_CLEANUP_INTERVAL_SECS);

/// Default upstream timeout in seconds.
pub const PROXY_TIMEOUT_SECS: u64 = 15;

/// Default upstream timeout duration.
pub const PROXY_TIMEOUT: Duration = Duration::from_secs(PROXY_TIMEOUT_SECS);

/// Default maximum body size in megabytes.
pub const MAX_BODY_SIZE_MB: usize = 100;

/// Default maximum body size in bytes.
pub const MAX_BODY_SIZE: usize = MAX_BODY_SIZE_MB * 1024 * 1024;

/// Default upstream map server.
pub const UPSTREAM_URL: &str = "http://124.17.4.220:24088/SG";

/// Path segment every upstream base is normalized to end with.
pub const UPSTREAM_PATH_SEGMENT: &str = "/SG";

/// Default upstream whitelist.
pub const ALLOWED_HOSTS: &[&str] = &["124.17.4.220"];

/// Default path prefix of the proxy route.
pub const PROXY_PATH_PREFIX: &str = "/sgs-proxy/";

/// Default listen host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const SERVER_PORT: u16 = 9700;

/// Default directory served by the data routes.
pub const DATA_DIR: &str = "data";
