//! Error types for MapGate.
//!
//! Every failure the ingress layer can produce maps to exactly one variant,
//! and every variant maps to exactly one HTTP status. Handlers turn errors
//! into `{"detail": ...}` responses through [`MapGateError::status_code`]
//! and [`MapGateError::detail`].

use hyper::StatusCode;
use thiserror::Error;

/// Result type alias for MapGate operations.
pub type Result<T> = std::result::Result<T, MapGateError>;

/// Unified error type for MapGate operations.
///
/// # Example
///
/// ```
/// use mapgate_core::error::{MapGateError, Result};
///
/// fn check_host(host: &str) -> Result<()> {
///     if host != "124.17.4.220" {
///         return Err(MapGateError::ForbiddenHost(host.into()));
///     }
///     Ok(())
/// }
///
/// assert!(check_host("evil.com").is_err());
/// ```
#[derive(Debug, Error)]
pub enum MapGateError {
    /// Client exceeded its sliding-window quota.
    #[error("Rate limit exceeded for client: {0}")]
    RateLimitExceeded(String),

    /// Resolved upstream host is not on the whitelist.
    #[error("Host not allowed: {0}")]
    ForbiddenHost(String),

    /// Upstream call failed, timed out, or its body could not be read.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Requested file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Request body too large.
    #[error("Request body too large: {size} bytes (max: {max} bytes)")]
    BodyTooLarge {
        /// Actual body size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// Failed to read the inbound request body.
    #[error("Body read error: {0}")]
    BodyReadError(String),

    /// A cached file could not be parsed as the requested kind.
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Unexpected filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (missing or invalid values).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MapGateError {
    /// Returns the HTTP status code that should be returned to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::ForbiddenHost(_) => StatusCode::FORBIDDEN,
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BodyReadError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidContent(_)
            | Self::Io(_)
            | Self::ConfigError(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message placed in the `detail` field of error responses.
    ///
    /// Upstream and server-side failures carry the underlying error text so
    /// operators can diagnose them from the response alone.
    pub fn detail(&self) -> String {
        match self {
            Self::RateLimitExceeded(_) => "rate limited".to_string(),
            Self::ForbiddenHost(host) => format!("host not allowed: {host}"),
            Self::UpstreamUnreachable(reason) => format!("upstream unreachable: {reason}"),
            Self::NotFound(path) => format!("not found: {path}"),
            Self::BodyTooLarge { .. } => "request body too large".to_string(),
            Self::BodyReadError(_) => "failed to read request body".to_string(),
            Self::InvalidContent(reason) => format!("data load failed: {reason}"),
            Self::Io(err) => format!("server error: {err}"),
            Self::ConfigError(reason) => format!("server error: {reason}"),
            Self::Internal(reason) => format!("server error: {reason}"),
        }
    }

    /// Returns true if this error should be logged at error level.
    ///
    /// Rate limiting, whitelist rejections and missing files are expected
    /// client-side outcomes.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnreachable(_)
                | Self::InvalidContent(_)
                | Self::Io(_)
                | Self::ConfigError(_)
                | Self::Internal(_)
        )
    }
}

impl From<reqwest::Error> for MapGateError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamUnreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MapGateError::ForbiddenHost("evil.com".into());
        assert_eq!(err.to_string(), "Host not allowed: evil.com");

        let err = MapGateError::RateLimitExceeded("1.2.3.4".into());
        assert_eq!(err.to_string(), "Rate limit exceeded for client: 1.2.3.4");

        let err = MapGateError::BodyTooLarge {
            size: 200,
            max: 100,
        };
        assert_eq!(
            err.to_string(),
            "Request body too large: 200 bytes (max: 100 bytes)"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            MapGateError::RateLimitExceeded("".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            MapGateError::ForbiddenHost("".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            MapGateError::UpstreamUnreachable("".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            MapGateError::NotFound("".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MapGateError::BodyTooLarge { size: 0, max: 0 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            MapGateError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_embeds_upstream_reason() {
        let err = MapGateError::UpstreamUnreachable("operation timed out".into());
        assert_eq!(err.detail(), "upstream unreachable: operation timed out");
    }

    #[test]
    fn test_detail_rate_limited() {
        assert_eq!(
            MapGateError::RateLimitExceeded("10.0.0.1".into()).detail(),
            "rate limited"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::other("disk on fire");
        let err: MapGateError = io.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail().contains("disk on fire"));
    }

    #[test]
    fn test_is_server_error() {
        assert!(MapGateError::UpstreamUnreachable("".into()).is_server_error());
        assert!(MapGateError::Internal("".into()).is_server_error());

        assert!(!MapGateError::RateLimitExceeded("".into()).is_server_error());
        assert!(!MapGateError::ForbiddenHost("".into()).is_server_error());
        assert!(!MapGateError::NotFound("".into()).is_server_error());
    }
}
