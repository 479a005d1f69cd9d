//! Per-address request ceiling for the `/api` routes.
//!
//! Each client address gets a fixed window that opens on its first request;
//! once `max` requests have been admitted inside the window, further requests
//! are answered here with 429 and never reach a handler.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tracing::{debug, warn};

pub const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the caller's window resets.
    pub reset_after: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn check(&self, ip: IpAddr) -> Decision {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, now: Instant) -> Decision {
        let mut clients = self.clients.lock();
        let entry = clients.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < self.max;
        if allowed {
            entry.count += 1;
        }
        let reset_after = self
            .window
            .saturating_sub(now.duration_since(entry.started));

        Decision {
            allowed,
            limit: self.max,
            remaining: self.max.saturating_sub(entry.count),
            reset_after,
        }
    }

    /// Drops windows that have fully elapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, w| now.duration_since(w.started) < self.window);
        before - clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

/// Purges expired windows once per window length, for the life of the runtime.
pub fn spawn_purge_task(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window().max(Duration::from_secs(1)));
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = limiter.purge_expired(Instant::now());
            if removed > 0 {
                debug!(removed, "expired rate-limit windows purged");
            }
        }
    })
}

fn secs_ceil(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

fn apply_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    let reset = secs_ceil(decision.reset_after);
    for (name, value) in [
        ("ratelimit-limit", u64::from(decision.limit)),
        ("ratelimit-remaining", u64::from(decision.remaining)),
        ("ratelimit-reset", reset),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
    if !decision.allowed {
        headers.insert(http::header::RETRY_AFTER, HeaderValue::from(reset));
    }
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn limit_by_ip(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let decision = limiter.check(addr.ip());
    if !decision.allowed {
        warn!(client = %addr.ip(), path = %request.uri().path(), "rate limit exceeded");
        let mut response = (StatusCode::TOO_MANY_REQUESTS, REJECTION_MESSAGE).into_response();
        apply_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(&mut response, &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::{RateLimiter, secs_ceil};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::{Duration, Instant};

    const A: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
    const B: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

    #[test]
    fn admits_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();
        for expected_remaining in [2, 1, 0] {
            let d = limiter.check_at(A, t0);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }
        let d = limiter.check_at(A, t0 + Duration::from_secs(1));
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_after, Duration::from_secs(59));
    }

    #[test]
    fn addresses_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at(A, t0).allowed);
        assert!(!limiter.check_at(A, t0).allowed);
        assert!(limiter.check_at(B, t0).allowed);
    }

    #[test]
    fn window_reopens_after_it_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at(A, t0).allowed);
        assert!(!limiter.check_at(A, t0 + Duration::from_secs(59)).allowed);
        assert!(limiter.check_at(A, t0 + Duration::from_secs(60)).allowed);
    }

    #[test]
    fn purge_drops_only_elapsed_windows() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let t0 = Instant::now();
        limiter.check_at(A, t0);
        limiter.check_at(B, t0 + Duration::from_secs(30));
        assert_eq!(limiter.purge_expired(t0 + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn reset_rounds_up_to_whole_seconds() {
        assert_eq!(secs_ceil(Duration::from_millis(1500)), 2);
        assert_eq!(secs_ceil(Duration::from_secs(3)), 3);
        assert_eq!(secs_ceil(Duration::ZERO), 0);
    }
}
