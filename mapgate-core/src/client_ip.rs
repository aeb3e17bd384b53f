//! Client identity extraction for rate limiting.
//!
//! The identity is the first `X-Forwarded-For` entry when it is a well-formed
//! IP address, otherwise the address of the directly connected peer.

use std::net::{IpAddr, SocketAddr};

use hyper::HeaderMap;

use crate::headers::X_FORWARDED_FOR;

/// Returns the first `X-Forwarded-For` entry if it parses as an IP address.
///
/// # Example
///
/// ```
/// use hyper::HeaderMap;
/// use mapgate_core::client_ip::forwarded_client;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
/// assert_eq!(forwarded_client(&headers), Some("203.0.113.7".parse().unwrap()));
/// ```
pub fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(X_FORWARDED_FOR)?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}

/// Identity under which a request is rate limited.
pub fn client_identity(headers: &HeaderMap, peer: SocketAddr) -> String {
    forwarded_client(headers)
        .unwrap_or_else(|| peer.ip())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.9.8.7:55000".parse().unwrap()
    }

    fn headers_with_xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_peer_address_without_header() {
        assert_eq!(client_identity(&HeaderMap::new(), peer()), "10.9.8.7");
    }

    #[test]
    fn test_first_forwarded_entry_wins() {
        let headers = headers_with_xff("198.51.100.1, 172.16.0.1, 10.0.0.1");
        assert_eq!(client_identity(&headers, peer()), "198.51.100.1");
    }

    #[test]
    fn test_forwarded_entry_is_trimmed() {
        let headers = headers_with_xff("   192.168.1.100  ,10.0.0.1");
        assert_eq!(client_identity(&headers, peer()), "192.168.1.100");
    }

    #[test]
    fn test_ipv6_forwarded_entry() {
        let headers = headers_with_xff("2001:db8::1");
        assert_eq!(client_identity(&headers, peer()), "2001:db8::1");
    }

    #[test]
    fn test_malformed_forwarded_entry_falls_back_to_peer() {
        for value in ["not-an-ip", "", "unknown, 1.2.3.4", "999.1.1.1"] {
            let headers = headers_with_xff(value);
            assert_eq!(client_identity(&headers, peer()), "10.9.8.7", "value: {value:?}");
        }
    }

    #[test]
    fn test_ipv6_peer() {
        let peer: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(client_identity(&HeaderMap::new(), peer), "::1");
    }
}
