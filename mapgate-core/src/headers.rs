//! HTTP header constants for MapGate.
//!
//! Centralizes the header names the ingress layer reads, strips, or injects.

/// X-Forwarded-For header - the first entry identifies the client.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Access token header sent to the upstream map server on every call.
pub const X_ACCESS_TOKEN: &str = "x-access-token";

/// Authorization header (upstream Basic credentials).
pub const AUTHORIZATION: &str = "authorization";

/// Content-Type header.
pub const CONTENT_TYPE: &str = "content-type";

/// Host header.
pub const HOST: &str = "host";

/// Content-Length header.
pub const CONTENT_LENGTH: &str = "content-length";

/// Content-Encoding header.
pub const CONTENT_ENCODING: &str = "content-encoding";

/// Accept-Encoding header.
pub const ACCEPT_ENCODING: &str = "accept-encoding";

/// Connection header.
pub const CONNECTION: &str = "connection";

/// Transfer-Encoding header.
pub const TRANSFER_ENCODING: &str = "transfer-encoding";

/// Methods advertised in CORS preflight answers.
pub const CORS_ALLOW_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";

/// How long browsers may cache a preflight answer, in seconds.
pub const CORS_MAX_AGE_SECS: &str = "600";

/// Upstream response headers that are never relayed to the caller.
///
/// The body is re-framed (and already decoded) by the proxy, so framing and
/// encoding headers from the upstream hop would describe the wrong bytes.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    CONTENT_ENCODING,
    TRANSFER_ENCODING,
    CONTENT_LENGTH,
    CONNECTION,
];

/// Inbound request headers that are never forwarded upstream.
///
/// `accept-encoding` is left to the HTTP client, which only advertises the
/// encodings it decodes before the body is relayed.
pub const STRIPPED_REQUEST_HEADERS: &[&str] = &[HOST, CONTENT_LENGTH, ACCEPT_ENCODING];

/// Check if an upstream response header must be dropped.
///
/// Matching is case-insensitive.
///
/// # Example
///
/// ```
/// use mapgate_core::headers::is_hop_by_hop;
///
/// assert!(is_hop_by_hop("connection"));
/// assert!(is_hop_by_hop("Content-Length"));
/// assert!(!is_hop_by_hop("content-type"));
/// ```
pub fn is_hop_by_hop(header_name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(header_name))
}

/// Check if an inbound request header must be dropped before forwarding.
pub fn is_stripped_request_header(header_name: &str) -> bool {
    STRIPPED_REQUEST_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(header_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_headers() {
        assert!(is_hop_by_hop(CONTENT_ENCODING));
        assert!(is_hop_by_hop(TRANSFER_ENCODING));
        assert!(is_hop_by_hop(CONTENT_LENGTH));
        assert!(is_hop_by_hop(CONNECTION));
        assert!(is_hop_by_hop("Transfer-Encoding"));
    }

    #[test]
    fn test_not_hop_by_hop_headers() {
        assert!(!is_hop_by_hop(CONTENT_TYPE));
        assert!(!is_hop_by_hop(HOST));
        assert!(!is_hop_by_hop(X_FORWARDED_FOR));
        assert!(!is_hop_by_hop("cache-control"));
        assert!(!is_hop_by_hop("x-custom-header"));
    }

    #[test]
    fn test_stripped_request_headers() {
        assert!(is_stripped_request_header("host"));
        assert!(is_stripped_request_header("Host"));
        assert!(is_stripped_request_header("content-length"));
        assert!(is_stripped_request_header("Accept-Encoding"));
        assert!(!is_stripped_request_header("accept"));
        assert!(!is_stripped_request_header(AUTHORIZATION));
    }

    #[test]
    fn test_header_constants_lowercase() {
        for name in [
            X_FORWARDED_FOR,
            X_ACCESS_TOKEN,
            AUTHORIZATION,
            CONTENT_TYPE,
            HOST,
            CONTENT_LENGTH,
            ACCEPT_ENCODING,
        ] {
            assert_eq!(name, name.to_lowercase());
        }
    }
}
