//! Allow-all cross-origin support for browser map clients.
//!
//! Any origin may call any route with any method and headers, credentials
//! included. Because credentials are allowed, the caller's `Origin` is echoed
//! back instead of `*`. Preflights are answered locally and never reach the
//! rate limiter or the upstream.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, HeaderValue, ORIGIN, VARY,
};
use hyper::{HeaderMap, Method, Response, StatusCode};

use crate::headers::{CORS_ALLOW_METHODS, CORS_MAX_AGE_SECS};

/// Returns the caller's `Origin`, if it sent one.
pub fn request_origin(headers: &HeaderMap) -> Option<HeaderValue> {
    headers.get(ORIGIN).cloned()
}

/// Checks whether a request is a CORS preflight.
///
/// A preflight is an `OPTIONS` request carrying both `Origin` and
/// `Access-Control-Request-Method`; a bare `OPTIONS` is routed normally.
pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS
        && headers.contains_key(ORIGIN)
        && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Builds the local answer to a preflight request.
///
/// Requested headers are echoed back, which allows all of them.
pub fn preflight_response(headers: &HeaderMap) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::OK;

    let out = response.headers_mut();
    out.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(CORS_ALLOW_METHODS));
    out.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(CORS_MAX_AGE_SECS));
    if let Some(requested) = headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
        out.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
    }

    if let Some(origin) = request_origin(headers) {
        apply(&mut response, origin);
    }
    response
}

/// Marks `response` as readable by `origin`.
///
/// Replaces any `Access-Control-Allow-*` origin headers relayed from upstream.
pub fn apply<B>(response: &mut Response<B>, origin: HeaderValue) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.append(VARY, HeaderValue::from_static("Origin"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_is_preflight() {
        let full = headers(&[
            ("origin", "http://localhost:8080"),
            ("access-control-request-method", "POST"),
        ]);
        assert!(is_preflight(&Method::OPTIONS, &full));
        assert!(!is_preflight(&Method::GET, &full));

        let no_method = headers(&[("origin", "http://localhost:8080")]);
        assert!(!is_preflight(&Method::OPTIONS, &no_method));

        let no_origin = headers(&[("access-control-request-method", "POST")]);
        assert!(!is_preflight(&Method::OPTIONS, &no_origin));
    }

    #[test]
    fn test_preflight_response_allows_everything() {
        let response = preflight_response(&headers(&[
            ("origin", "http://cesium.local"),
            ("access-control-request-method", "PUT"),
            ("access-control-request-headers", "x-layer-id, content-type"),
        ]));

        assert_eq!(response.status(), StatusCode::OK);
        let out = response.headers();
        assert_eq!(out["access-control-allow-origin"], "http://cesium.local");
        assert_eq!(out["access-control-allow-credentials"], "true");
        assert_eq!(out["access-control-allow-headers"], "x-layer-id, content-type");
        assert_eq!(out["access-control-max-age"], CORS_MAX_AGE_SECS);
        let methods = out["access-control-allow-methods"].to_str().unwrap();
        for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "HEAD"] {
            assert!(methods.contains(method), "{method} missing from {methods}");
        }
    }

    #[test]
    fn test_apply_overrides_relayed_origin() {
        let mut response = Response::new(());
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("http://upstream.only"));

        apply(&mut response, HeaderValue::from_static("http://cesium.local"));

        let allowed: Vec<_> = response
            .headers()
            .get_all(ACCESS_CONTROL_ALLOW_ORIGIN)
            .iter()
            .collect();
        assert_eq!(allowed, vec!["http://cesium.local"]);
        assert_eq!(response.headers()[VARY], "Origin");
    }
}
