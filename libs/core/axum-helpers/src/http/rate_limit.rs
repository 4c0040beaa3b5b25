//! Per-client request rate limiting.
//!
//! One GCRA bucket per client IP. The bucket map is bounded: buckets that
//! have fully replenished carry no state worth keeping and are dropped by
//! [`RateLimiter::evict_idle`], both from a periodic task and eagerly once
//! the map grows past `max_clients`. Eager sweeps run at most once per
//! [`OVERFLOW_SWEEP_GAP`].

use crate::errors::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use core_config::{ConfigError, FromEnv, env_parse_or_default};
use governor::{DefaultKeyedRateLimiter, Quota};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Minimum spacing between eager sweeps of an oversized client map.
pub const OVERFLOW_SWEEP_GAP: Duration = Duration::from_secs(1);

/// Rate limit configuration.
///
/// Loaded from environment variables:
/// - `RATE_LIMIT_REQUESTS`: requests per second and burst size (default 100)
/// - `RATE_LIMIT_MAX_CLIENTS`: tracked clients before eager eviction (default 10000)
/// - `RATE_LIMIT_CLEANUP_SECS`: period of the eviction task (default 60)
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub max_clients: usize,
    pub cleanup_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: NonZeroU32::new(100).unwrap_or(NonZeroU32::MIN),
            max_clients: 10_000,
            cleanup_interval_secs: 60,
        }
    }
}

impl FromEnv for RateLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            requests_per_second: env_parse_or_default(
                "RATE_LIMIT_REQUESTS",
                defaults.requests_per_second,
            )?,
            max_clients: env_parse_or_default("RATE_LIMIT_MAX_CLIENTS", defaults.max_clients)?,
            cleanup_interval_secs: env_parse_or_default(
                "RATE_LIMIT_CLEANUP_SECS",
                defaults.cleanup_interval_secs,
            )?,
        })
    }
}

/// Keyed limiter shared by every request handler.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    max_clients: usize,
    last_overflow_sweep: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = Quota::per_second(config.requests_per_second)
            .allow_burst(config.requests_per_second);

        Self {
            inner: Arc::new(governor::RateLimiter::keyed(quota)),
            max_clients: config.max_clients,
            last_overflow_sweep: Arc::new(Mutex::new(None)),
        }
    }

    /// Take one cell from `ip`'s bucket. `false` means the client is over quota.
    pub fn check(&self, ip: IpAddr) -> bool {
        let allowed = self.inner.check_key(&ip).is_ok();

        if self.inner.len() > self.max_clients && self.claim_overflow_sweep() {
            self.evict_idle();
        }

        allowed
    }

    /// Whether this caller may run an eager sweep now. Concurrent callers
    /// and callers inside the gap skip it.
    fn claim_overflow_sweep(&self) -> bool {
        let Ok(mut last) = self.last_overflow_sweep.try_lock() else {
            return false;
        };

        let now = Instant::now();
        if last.is_some_and(|at| now.duration_since(at) < OVERFLOW_SWEEP_GAP) {
            return false;
        }
        *last = Some(now);
        true
    }

    /// Drop buckets that have fully replenished.
    pub fn evict_idle(&self) {
        let before = self.inner.len();
        self.inner.retain_recent();
        self.inner.shrink_to_fit();

        let evicted = before.saturating_sub(self.inner.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.inner.len(), "Evicted idle rate limit buckets");
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.inner.len()
    }

    /// Run [`Self::evict_idle`] every `interval` until the task is aborted.
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.evict_idle();
            }
        })
    }
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
pub fn client_ip(request: &Request) -> IpAddr {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok());

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rejects requests over the client's quota with `429 Too Many Requests`.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);

    if !limiter.check(ip) {
        return Err(AppError::TooManyRequests(format!(
            "Rate limit exceeded for {ip}"
        )));
    }

    Ok(next.run(request).await)
}
