//! HTTP server loop and startup reporting.
//!
//! One tokio task serves each accepted connection over HTTP/1. On shutdown
//! the listener stops accepting, open connections are asked to finish their
//! current request, and the loop waits a bounded time for them to close.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::args::Args;
use crate::config::EnvVarConfig;
use crate::env_vars;
use mapgate_core::request_handler::{self, IngressState};
use mapgate_core::{ProxyForwarder, ProxyProvider, RateLimitingProvider};

/// How long in-flight connections get to finish after shutdown is requested.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Connection tracking
// ============================================================================

/// Counts open connections so shutdown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
}

/// Decrements the tracker when the connection task ends.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection until the returned guard is dropped.
    pub fn track(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active: self.active.clone(),
        }
    }

    /// Get current active connection count.
    pub fn count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for all connections to finish with timeout.
    /// Returns true if all connections finished, false if timeout reached.
    pub async fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();

        while self.count() > 0 {
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        true
    }
}

// ============================================================================
// Accept loop
// ============================================================================

/// Serves connections from `listener` until `shutdown` completes.
///
/// # Errors
///
/// Currently always returns `Ok`; accept errors are logged and skipped.
pub async fn serve<F>(listener: TcpListener, state: Arc<IngressState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let tracker = ConnectionTracker::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(error = %err, "Failed to accept connection");
                        continue;
                    }
                };

                debug!(peer = %peer, "New connection");

                let io = TokioIo::new(stream);
                let state = state.clone();
                let guard = tracker.track();
                let mut stop_rx = stop_rx.clone();

                tokio::task::spawn(async move {
                    let _guard = guard;
                    let service = service_fn(move |req| {
                        request_handler::handle_request(req, peer, state.clone())
                    });

                    let conn = http1::Builder::new().serve_connection(io, service);
                    tokio::pin!(conn);

                    let result = tokio::select! {
                        result = conn.as_mut() => result,
                        _ = stop_rx.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };

                    if let Err(err) = result {
                        debug!(peer = %peer, error = %err, "Connection error");
                    }
                });
            }
        }
    }

    // Receivers only observe the change; a send error means no connection is open
    let _ = stop_tx.send(true);
    drop(listener);

    if !tracker.wait_for_shutdown(DRAIN_TIMEOUT).await {
        warn!(remaining = tracker.count(), "Drain timeout reached, closing remaining connections");
    }

    info!("Server stopped");
    Ok(())
}

/// Completes on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Unable to listen for Ctrl-C, shutdown only by process kill");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Startup banner
// ============================================================================

/// Logs the effective configuration at startup.
pub fn log_startup_info(args: &Args, config: &EnvVarConfig, forwarder: &ProxyForwarder) {
    let rate = config.rate_limit_config();
    let cleanup = config.rate_limit_cleanup_config();
    let proxy = config.proxy_config();
    let upstream = config.upstream_config();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind = %args.bind,
        port = args.listen,
        "MapGate starting"
    );
    info!(
        target_url = forwarder.base(),
        proxy_endpoint = %proxy.path_prefix,
        allowed_hosts = ?config.allowed_hosts().sorted(),
        credentials = upstream.credentials.is_some(),
        access_token = upstream.access_token.is_some(),
        "Upstream"
    );
    info!(
        max_requests = rate.max_requests,
        window_secs = rate.window_duration.as_secs(),
        cleanup_threshold = cleanup.threshold,
        cleanup_interval_secs = cleanup.interval.as_secs(),
        "Rate limiting"
    );
    info!(
        timeout_secs = proxy.timeout.as_secs(),
        max_body_mb = %proxy.max_body_size_mb(),
        data_dir = %config.data_dir().display(),
        "Proxy"
    );

    if args.verbose {
        log_env_config(|key| std::env::var(key).ok());
    }
}

/// Logs which environment variables are set, masking secrets.
fn log_env_config<F>(env_var: F)
where
    F: Fn(&str) -> Option<String>,
{
    for &var_name in env_vars::all_env_vars() {
        let value = match env_var(var_name) {
            Some(_) if env_vars::is_secret(var_name) => "[CONFIGURED]".to_string(),
            Some(value) => value,
            None => "[NOT SET]".to_string(),
        };
        debug!(var = var_name, value = %value, "Environment");
    }
}
