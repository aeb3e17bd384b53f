//! Environment variable names used throughout MapGate configuration

/// Upstream map server
pub const UPSTREAM_URL: &str = "SGS_SERVER_URL";
pub const UPSTREAM_USERNAME: &str = "SGS_USERNAME";
pub const UPSTREAM_PASSWORD: &str = "SGS_PASSWORD";
pub const UPSTREAM_ACCESS_TOKEN: &str = "SGS_ACCESS_TOKEN";

/// Proxy behavior configuration
pub const PROXY_ALLOWED_HOSTS: &str = "PROXY_ALLOWED_HOSTS";
pub const PROXY_PATH_PREFIX: &str = "PROXY_PATH_PREFIX";
pub const PROXY_TIMEOUT_SECS: &str = "PROXY_TIMEOUT_SECS";
pub const MAX_BODY_SIZE_MB: &str = "MAX_BODY_SIZE_MB";

/// Rate limiting configuration
pub const RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";
pub const RATE_LIMIT_WINDOW_SECS: &str = "RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_CLEANUP_THRESHOLD: &str = "RATE_LIMIT_CLEANUP_THRESHOLD";
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: &str = "RATE_LIMIT_CLEANUP_INTERVAL_SECS";

/// Data files and listen address
pub const DATA_DIR: &str = "DATA_DIR";
pub const SERVER_HOST: &str = "SERVER_HOST";
pub const SERVER_PORT: &str = "SERVER_PORT";

/// Variables whose values are never printed.
pub const SECRET_VARS: &[&str] = &[UPSTREAM_PASSWORD, UPSTREAM_ACCESS_TOKEN];

/// Get all environment variable names for documentation/validation
pub fn all_env_vars() -> &'static [&'static str] {
    &[
        UPSTREAM_URL,
        UPSTREAM_USERNAME,
        UPSTREAM_PASSWORD,
        UPSTREAM_ACCESS_TOKEN,
        PROXY_ALLOWED_HOSTS,
        PROXY_PATH_PREFIX,
        PROXY_TIMEOUT_SECS,
        MAX_BODY_SIZE_MB,
        RATE_LIMIT_REQUESTS,
        RATE_LIMIT_WINDOW_SECS,
        RATE_LIMIT_CLEANUP_THRESHOLD,
        RATE_LIMIT_CLEANUP_INTERVAL_SECS,
        DATA_DIR,
        SERVER_HOST,
        SERVER_PORT,
    ]
}

/// Whether the value of `var_name` must be masked when displayed.
pub fn is_secret(var_name: &str) -> bool {
    SECRET_VARS.contains(&var_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_env_vars_unique() {
        let vars = all_env_vars();
        let unique: std::collections::HashSet<_> = vars.iter().collect();
        assert_eq!(unique.len(), vars.len());
    }

    #[test]
    fn test_secrets_are_listed() {
        for secret in SECRET_VARS {
            assert!(all_env_vars().contains(secret));
        }
        assert!(is_secret(UPSTREAM_PASSWORD));
        assert!(!is_secret(UPSTREAM_USERNAME));
    }
}
