//! Whitelisted, method-agnostic forwarding to the upstream map server.
//!
//! # Flow
//!
//! 1. Join the normalized upstream base with the request path and query
//! 2. Parse the target and check its host against the whitelist; a refused
//!    target never reaches the network
//! 3. Copy the caller's headers (minus `host`, `content-length` and
//!    `accept-encoding`) and set the fixed upstream credentials on top
//! 4. Send with the configured timeout, no retries
//! 5. Relay status, body and headers, dropping framing headers that no
//!    longer describe the relayed body
//!
//! The forwarder holds no lock while the upstream call is in flight.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{MapGateError, Result};
use crate::headers::{self, is_hop_by_hop, is_stripped_request_header};
use crate::types::{AllowedHosts, ProxyProvider, UpstreamConfig};

/// A request to relay, already separated from the inbound HTTP exchange.
#[derive(Clone, Debug)]
pub struct ForwardRequest {
    pub method: Method,
    /// Path below the upstream base, without a leading `/`
    pub path: String,
    /// Raw query string, without the `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardRequest {
    /// Creates a bodiless request with no headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// The upstream's answer, with stripped headers already removed.
#[derive(Clone, Debug)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardResponse {
    /// Converts into a hyper response carrying the same status, headers and body.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Relays requests to the configured upstream.
///
/// Cheap to clone: the HTTP client pools connections internally and clones
/// share that pool.
#[derive(Clone)]
pub struct ProxyForwarder {
    client: reqwest::Client,
    base: String,
    fixed_headers: HeaderMap,
    allowed_hosts: AllowedHosts,
    timeout: Duration,
}

impl ProxyForwarder {
    /// Creates a forwarder for `upstream`, refusing hosts outside `allowed_hosts`.
    ///
    /// # Errors
    ///
    /// Returns [`MapGateError::ConfigError`] if the credentials or access
    /// token are not valid header values, or the HTTP client cannot be built.
    pub fn new(upstream: &UpstreamConfig, allowed_hosts: AllowedHosts, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MapGateError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: upstream.normalized_base(),
            fixed_headers: fixed_headers(upstream)?,
            allowed_hosts,
            timeout,
        })
    }

    /// Creates a forwarder from a configuration provider.
    pub fn from_config(config: &impl ProxyProvider) -> Result<Self> {
        Self::new(
            config.upstream_config(),
            config.allowed_hosts().clone(),
            config.proxy_config().timeout,
        )
    }

    /// The normalized upstream base every target is built from.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Builds the upstream URL for `path` and `query`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use mapgate_core::{AllowedHosts, ProxyForwarder, UpstreamConfig};
    ///
    /// let forwarder = ProxyForwarder::new(
    ///     &UpstreamConfig::new("http://124.17.4.220:24088/"),
    ///     AllowedHosts::default(),
    ///     Duration::from_secs(15),
    /// ).unwrap();
    ///
    /// assert_eq!(
    ///     forwarder.target_url("tiles/3/4/5", Some("fmt=png")),
    ///     "http://124.17.4.220:24088/SG/tiles/3/4/5?fmt=png"
    /// );
    /// ```
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => format!("{}/{}?{}", self.base, path, query),
            _ => format!("{}/{}", self.base, path),
        }
    }

    /// Parses `target` and checks its host against the whitelist.
    ///
    /// # Errors
    ///
    /// Returns [`MapGateError::ForbiddenHost`] if the target cannot be parsed,
    /// has no host, or its host is not whitelisted.
    pub fn validate_host(&self, target: &str) -> Result<Url> {
        let url = Url::parse(target).map_err(|_| MapGateError::ForbiddenHost(target.to_string()))?;

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase())
            .ok_or_else(|| MapGateError::ForbiddenHost(target.to_string()))?;

        if !self.allowed_hosts.contains(&host) {
            return Err(MapGateError::ForbiddenHost(host));
        }

        Ok(url)
    }

    /// Relays `request` to the upstream and returns its sanitized response.
    ///
    /// # Errors
    ///
    /// - [`MapGateError::ForbiddenHost`] if the target host is not whitelisted
    /// - [`MapGateError::UpstreamUnreachable`] on connection failure, timeout,
    ///   or failure while reading the upstream body
    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse> {
        let target = self.target_url(&request.path, request.query.as_deref());
        let url = match self.validate_host(&target) {
            Ok(url) => url,
            Err(err) => {
                warn!(target = %target, error = %err, "Refusing to forward to non-whitelisted host");
                return Err(err);
            }
        };

        let mut outbound = HeaderMap::with_capacity(request.headers.len() + self.fixed_headers.len());
        for (name, value) in request.headers.iter() {
            if !is_stripped_request_header(name.as_str()) {
                outbound.append(name.clone(), value.clone());
            }
        }
        for (name, value) in self.fixed_headers.iter() {
            outbound.insert(name.clone(), value.clone());
        }

        let method = request.method;
        let mut builder = self
            .client
            .request(method.clone(), url)
            .headers(outbound)
            .timeout(self.timeout);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(target = %target, error = %e, "Upstream request failed");
            MapGateError::from(e)
        })?;

        let status = response.status();
        let mut relayed = HeaderMap::with_capacity(response.headers().len());
        for (name, value) in response.headers().iter() {
            if !is_hop_by_hop(name.as_str()) {
                relayed.append(name.clone(), value.clone());
            }
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(target = %target, error = %e, "Failed to read upstream body");
            MapGateError::from(e)
        })?;

        info!(
            method = %method,
            target = %target,
            status = status.as_u16(),
            bytes = body.len(),
            "Forwarded request"
        );

        Ok(ForwardResponse {
            status,
            headers: relayed,
            body,
        })
    }
}

impl std::fmt::Debug for ProxyForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyForwarder")
            .field("base", &self.base)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Headers set on every upstream call, overriding the caller's.
fn fixed_headers(upstream: &UpstreamConfig) -> Result<HeaderMap> {
    let mut fixed = HeaderMap::new();

    if let Some(credentials) = &upstream.credentials {
        let mut value = HeaderValue::from_str(&credentials.basic_auth_value())
            .map_err(|_| MapGateError::ConfigError("invalid upstream credentials".into()))?;
        value.set_sensitive(true);
        fixed.insert(HeaderName::from_static(headers::AUTHORIZATION), value);
    }

    if let Some(token) = &upstream.access_token {
        let mut value = HeaderValue::from_str(token)
            .map_err(|_| MapGateError::ConfigError("invalid upstream access token".into()))?;
        value.set_sensitive(true);
        fixed.insert(HeaderName::from_static(headers::X_ACCESS_TOKEN), value);
    }

    debug!(count = fixed.len(), "Prepared fixed upstream headers");
    Ok(fixed)
}
