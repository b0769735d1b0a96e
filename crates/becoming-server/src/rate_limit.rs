//! Per-client request throttling.
//!
//! Each client address owns a token bucket sized by [`Quota`]. A request
//! spends one token; tokens trickle back at the sustained rate. When the
//! bucket is dry the request is rejected with `429` and a `Retry-After`
//! covering the time until the next token.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::ServerError;

/// Sustained rate and burst size shared by every bucket.
#[derive(Debug, Clone, Copy)]
struct Quota {
    per_sec: f64,
    burst: f64,
}

impl Quota {
    /// Whole seconds until `tokens` has grown back to one.
    fn retry_after(&self, tokens: f64) -> u64 {
        ((1.0 - tokens) / self.per_sec).ceil().max(1.0) as u64
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    touched: Instant,
}

impl Bucket {
    fn full(quota: Quota, now: Instant) -> Self {
        Self {
            tokens: quota.burst,
            touched: now,
        }
    }

    fn spend(&mut self, quota: Quota, now: Instant) -> Result<(), u64> {
        let refill = now.saturating_duration_since(self.touched).as_secs_f64() * quota.per_sec;
        self.tokens = (self.tokens + refill).min(quota.burst);
        self.touched = now;

        if self.tokens < 1.0 {
            return Err(quota.retry_after(self.tokens));
        }
        self.tokens -= 1.0;
        Ok(())
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    quota: Quota,
    buckets: Arc<Mutex<HashMap<IpAddr, Bucket>>>,
}

impl RateLimiter {
    pub fn new(per_sec: f64, burst: f64) -> Self {
        Self {
            quota: Quota { per_sec, burst },
            buckets: Arc::default(),
        }
    }

    /// `Err(retry_after_secs)` once `client` has used up its burst.
    pub async fn check(&self, client: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let quota = self.quota;
        self.buckets
            .lock()
            .await
            .entry(client)
            .or_insert_with(|| Bucket::full(quota, now))
            .spend(quota, now)
    }

    /// Forget clients that have been quiet for at least `idle`.
    pub async fn purge_stale(&self, idle: Duration) {
        let now = Instant::now();
        self.buckets
            .lock()
            .await
            .retain(|_, bucket| now.saturating_duration_since(bucket.touched) < idle);
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    if let Some(client) = peer.or_else(|| forwarded_client(req.headers())) {
        if let Err(retry_after_secs) = limiter.check(client).await {
            warn!(%client, retry_after_secs, "Rate limit exceeded");
            return Err(ServerError::RateLimited { retry_after_secs });
        }
    }

    Ok(next.run(req).await)
}

/// Client address reported by a reverse proxy: the first hop of
/// `X-Forwarded-For`, else `X-Real-IP`.
fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str, first_hop: bool| {
        let raw = headers.get(name)?.to_str().ok()?;
        let candidate = if first_hop {
            raw.split(',').next()?
        } else {
            raw
        };
        candidate.trim().parse::<IpAddr>().ok()
    };

    header_ip("x-forwarded-for", true).or_else(|| header_ip("x-real-ip", false))
}
