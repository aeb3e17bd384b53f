//! Rate limiting implementation for MapGate.
//!
//! Per-client admission control using a sliding window log: every admitted
//! request records its instant, and a client is admitted while fewer than
//! `max_requests` instants fall inside the last `window_duration`.
//!
//! # Algorithm
//!
//! On each call, under the limiter lock:
//! - Instants older than the window are dropped for this client
//! - If the remaining count has reached the limit, the call is denied and
//!   nothing is recorded
//! - Otherwise the current instant is recorded and the call is admitted
//!
//! Unlike a fixed bucket, the window moves with time, so a burst straddling
//! a bucket boundary can never admit twice the limit.
//!
//! # Memory Management
//!
//! Clients that stop calling would otherwise be tracked forever. Clients
//! whose window has fully expired are removed:
//! - inline, when the tracked count exceeds the cleanup threshold and the
//!   cleanup interval has passed since the previous sweep
//! - periodically, by [`run_cleanup`] spawned at startup
//!
//! # Thread Safety
//!
//! Uses `tokio::sync::Mutex` so waiting for the lock never blocks a runtime
//! worker. The lock is only held for the prune-and-record step.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::types::{RateLimitCleanupConfig, RateLimitConfig, RateLimitingProvider};

/// Admission instants per client, oldest first.
type ClientWindows = HashMap<String, VecDeque<Instant>>;

#[derive(Default)]
struct LimiterState {
    windows: ClientWindows,
    last_cleanup: Option<Instant>,
}

impl LimiterState {
    /// Returns true (and records `now`) if a sweep may run at `now`.
    fn claim_cleanup(&mut self, now: Instant, interval: Duration) -> bool {
        match self.last_cleanup {
            Some(last) if now.saturating_duration_since(last) < interval => false,
            _ => {
                self.last_cleanup = Some(now);
                true
            }
        }
    }

    /// Removes every client whose window holds no live instant.
    fn sweep(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, instants| {
            prune(instants, now, window);
            !instants.is_empty()
        });
        before - self.windows.len()
    }
}

/// Drops instants that are at least `window` old.
fn prune(instants: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = instants.front() {
        if now.saturating_duration_since(oldest) >= window {
            instants.pop_front();
        } else {
            break;
        }
    }
}

/// Thread-safe sliding window rate limiter.
///
/// Clones share state, so one instance built at startup can be handed to
/// every connection.
///
/// # Example
///
/// ```
/// use mapgate_core::{RateLimiter, RateLimitConfig, RateLimitCleanupConfig};
/// use std::time::Duration;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let limiter = RateLimiter::new(
///     RateLimitConfig { max_requests: 3, window_duration: Duration::from_secs(60) },
///     RateLimitCleanupConfig::default(),
/// );
///
/// for _ in 0..3 {
///     assert!(limiter.is_allowed("1.2.3.4").await);
/// }
/// assert!(!limiter.is_allowed("1.2.3.4").await);
/// # });
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<LimiterState>>,
    config: RateLimitConfig,
    cleanup: RateLimitCleanupConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates an empty limiter driven by the system clock.
    pub fn new(config: RateLimitConfig, cleanup: RateLimitCleanupConfig) -> Self {
        Self::with_clock(config, cleanup, Arc::new(SystemClock))
    }

    /// Creates an empty limiter reading time from `clock`.
    pub fn with_clock(
        config: RateLimitConfig,
        cleanup: RateLimitCleanupConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterState::default())),
            config,
            cleanup,
            clock,
        }
    }

    /// Creates a limiter from a configuration provider.
    pub fn from_config(config: &impl RateLimitingProvider) -> Self {
        Self::new(
            config.rate_limit_config().clone(),
            config.rate_limit_cleanup_config().clone(),
        )
    }

    /// Returns the admission limits.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decides whether a request from `client_id` is admitted.
    ///
    /// Returns `true` and records the request if fewer than `max_requests`
    /// requests were admitted for this client within the window. Returns
    /// `false` otherwise; a denied request does not count against the window.
    pub async fn is_allowed(&self, client_id: &str) -> bool {
        let window = self.config.window_duration;
        let limit = self.config.max_requests as usize;

        let mut state = self.inner.lock().await;
        let now = self.clock.now();

        if self.cleanup.is_enabled()
            && state.windows.len() > self.cleanup.threshold
            && state.claim_cleanup(now, self.cleanup.interval)
        {
            let removed = state.sweep(now, window);
            if removed > 0 {
                debug!(
                    removed_clients = removed,
                    remaining_clients = state.windows.len(),
                    "Rate limiter cleanup completed"
                );
            }
        }

        let instants = state.windows.entry(client_id.to_string()).or_default();
        prune(instants, now, window);

        if instants.len() >= limit {
            return false;
        }

        instants.push_back(now);
        true
    }

    /// Removes every client whose window has fully expired.
    ///
    /// Returns the number of clients removed.
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.inner.lock().await;
        let now = self.clock.now();
        state.last_cleanup = Some(now);
        state.sweep(now, self.config.window_duration)
    }

    /// Returns the number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.inner.lock().await.windows.len()
    }

    /// Returns how many admissions of `client_id` are still inside the window.
    pub async fn active_requests(&self, client_id: &str) -> usize {
        let state = self.inner.lock().await;
        let now = self.clock.now();
        let window = self.config.window_duration;
        state.windows.get(client_id).map_or(0, |instants| {
            instants
                .iter()
                .filter(|&&t| now.saturating_duration_since(t) < window)
                .count()
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("cleanup", &self.cleanup)
            .finish_non_exhaustive()
    }
}

/// Sweeps expired clients every `every` until the task is dropped.
///
/// Meant to be spawned once at startup next to the server loop.
pub async fn run_cleanup(limiter: RateLimiter, every: Duration) {
    if every.is_zero() {
        return;
    }

    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately; nothing to sweep yet.
    interval.tick().await;

    loop {
        interval.tick().await;
        let removed = limiter.purge_expired().await;
        if removed > 0 {
            debug!(removed_clients = removed, "Periodic rate limiter sweep");
        }
    }
}
