//! HTTP request handling for the ingress layer.
//!
//! # Routes
//!
//! - `{proxy_prefix}{path}`: rate limited per client, then relayed upstream
//! - `GET /health`: service status as JSON
//! - `GET /data/{file}`: file content through the [`ContentCache`]
//! - `DELETE /data/{file}` and `DELETE /data`: cache invalidation
//!
//! Anything else is a JSON 404. Every error response has the shape
//! `{"detail": "..."}`.
//!
//! CORS preflights on any path are answered locally before routing, and every
//! response to a request with an `Origin` carries allow-all CORS headers.
//!
//! # Proxy flow
//!
//! 1. Resolve the client identity from `X-Forwarded-For` or the peer address
//! 2. Apply rate limiting; a denied request never reaches the network
//! 3. Read the body, enforcing the size limit
//! 4. Forward through the [`ProxyForwarder`] and relay its answer

use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use tracing::{debug, error, warn};

use crate::client_ip;
use crate::content_cache::{CachedContent, ContentCache, DataKind};
use crate::cors;
use crate::error::{MapGateError, Result};
use crate::forwarder::{ForwardRequest, ProxyForwarder};
use crate::headers::CONTENT_TYPE;
use crate::rate_limiter::RateLimiter;
use crate::types::{ConfigProvider, ProxyConfig};

const HEALTH_PATH: &str = "/health";
const DATA_ROOT: &str = "/data";

/// Everything a request handler needs, built once at startup.
///
/// Shared across connections behind an `Arc`.
#[derive(Clone, Debug)]
pub struct IngressState {
    pub limiter: RateLimiter,
    pub forwarder: ProxyForwarder,
    pub cache: ContentCache,
    pub proxy_config: ProxyConfig,
    /// Directory served by the data routes
    pub data_dir: PathBuf,
}

impl IngressState {
    /// Builds fresh limiter, forwarder and cache instances from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`MapGateError::ConfigError`] if the forwarder cannot be built.
    pub fn from_config(config: &impl ConfigProvider, data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            limiter: RateLimiter::from_config(config),
            forwarder: ProxyForwarder::from_config(config)?,
            cache: ContentCache::new(),
            proxy_config: config.proxy_config().clone(),
            data_dir: data_dir.into(),
        })
    }
}

/// Routes an incoming HTTP request.
///
/// Always returns `Ok`: failures become JSON error responses.
pub async fn handle_request<B>(
    req: Request<B>,
    peer: SocketAddr,
    state: Arc<IngressState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    if cors::is_preflight(req.method(), req.headers()) {
        debug!(path = %req.uri().path(), "Answered CORS preflight");
        return Ok(cors::preflight_response(req.headers()));
    }

    let origin = cors::request_origin(req.headers());
    let path = req.uri().path();

    let result = if path.starts_with(state.proxy_config.path_prefix.as_str()) {
        handle_proxy(req, peer, &state).await
    } else if path == HEALTH_PATH && req.method() == Method::GET {
        Ok(health_response(&state))
    } else if path == DATA_ROOT || path.starts_with("/data/") {
        handle_data(req.method(), path, &state).await
    } else {
        Err(MapGateError::NotFound(path.to_string()))
    };

    let mut response = result.unwrap_or_else(|err| error_response(&err));
    if let Some(origin) = origin {
        cors::apply(&mut response, origin);
    }
    Ok(response)
}

async fn handle_proxy<B>(req: Request<B>, peer: SocketAddr, state: &IngressState) -> Result<Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let client = client_ip::client_identity(req.headers(), peer);
    if !state.limiter.is_allowed(&client).await {
        return Err(MapGateError::RateLimitExceeded(client));
    }

    let (parts, body) = req.into_parts();
    let body = read_body(body, state.proxy_config.max_body_size).await?;

    let prefix_len = state.proxy_config.path_prefix.len();
    let request = ForwardRequest {
        method: parts.method,
        path: parts.uri.path()[prefix_len..].to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };

    debug!(client = %client, path = %request.path, "Admitted proxy request");
    let response = state.forwarder.forward(request).await?;
    Ok(response.into_response())
}

/// Collects the request body, refusing bodies over `max_size` (0 = unlimited).
async fn read_body<B>(body: B, max_size: usize) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let bytes = body
        .collect()
        .await
        .map_err(|e| MapGateError::BodyReadError(e.to_string()))?
        .to_bytes();

    if max_size > 0 && bytes.len() > max_size {
        return Err(MapGateError::BodyTooLarge {
            size: bytes.len(),
            max: max_size,
        });
    }

    Ok(bytes)
}

async fn handle_data(method: &Method, path: &str, state: &IngressState) -> Result<Response<Full<Bytes>>> {
    let encoded = path
        .strip_prefix(DATA_ROOT)
        .unwrap_or_default()
        .trim_start_matches('/');
    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|_| MapGateError::NotFound(path.to_string()))?;
    let relative: &str = &decoded;

    match *method {
        Method::DELETE if relative.is_empty() => {
            let removed = state.cache.clear(None).await;
            debug!(removed, "Cleared data cache");
            Ok(empty_response(StatusCode::NO_CONTENT))
        }
        Method::DELETE => {
            let file = resolve_data_path(&state.data_dir, relative)
                .ok_or_else(|| MapGateError::NotFound(path.to_string()))?;
            state.cache.clear(Some(&file)).await;
            Ok(empty_response(StatusCode::NO_CONTENT))
        }
        Method::GET => {
            let file = resolve_data_path(&state.data_dir, relative)
                .ok_or_else(|| MapGateError::NotFound(path.to_string()))?;
            let content = state
                .cache
                .get(&file, DataKind::from_path(&file))
                .await
                .map_err(|err| match err {
                    MapGateError::NotFound(_) => MapGateError::NotFound(path.to_string()),
                    other => other,
                })?;
            Ok(content_response(&content))
        }
        _ => Err(MapGateError::NotFound(path.to_string())),
    }
}

/// Joins `relative` onto `root`, refusing anything that could leave `root`.
///
/// `relative` must already be percent-decoded, so encoded `..` segments are
/// refused like literal ones.
fn resolve_data_path(root: &Path, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() {
        return None;
    }

    let relative = Path::new(relative);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }

    Some(root.join(relative))
}

fn health_response(state: &IngressState) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "ok",
        "service": "mapgate",
        "version": env!("CARGO_PKG_VERSION"),
        "upstream": state.forwarder.base(),
        "proxy_endpoint": state.proxy_config.path_prefix,
    });
    json_response(StatusCode::OK, &body)
}

fn content_response(content: &CachedContent) -> Response<Full<Bytes>> {
    let content_type = match content.kind() {
        DataKind::Json => "application/json",
        DataKind::Text => "text/plain; charset=utf-8",
    };
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Full::new(content.to_bytes()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Logs `err` at a level matching its cause and renders it as a response.
fn error_response(err: &MapGateError) -> Response<Full<Bytes>> {
    if err.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Request rejected");
    }
    create_error_response(err.status_code(), &err.detail())
}

/// Creates a standardized `{"detail": ...}` error response.
///
/// # Example
///
/// ```
/// use mapgate_core::request_handler::create_error_response;
/// use hyper::StatusCode;
///
/// let response = create_error_response(StatusCode::TOO_MANY_REQUESTS, "rate limited");
/// assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
/// assert_eq!(response.headers()["content-type"], "application/json");
/// ```
pub fn create_error_response(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "detail": detail }))
}
