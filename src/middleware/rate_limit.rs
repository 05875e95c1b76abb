//! Rate limiting middleware.
//!
//! Fixed-window request counting per IP address. An IP that goes past
//! `max_requests + burst` inside one window lands on the ban list and is
//! refused until its ban expires.

use crate::api::error::detail_response;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Configuration for rate limiting.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// Burst allowance (extra requests above limit before hard reject).
    pub burst: u32,
    /// How long an IP stays banned after blowing through the burst.
    pub ban_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            burst: 20,
            ban_duration: Duration::from_secs(15 * 60),
        }
    }
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Default)]
struct LimiterState {
    windows: HashMap<IpAddr, RateLimitEntry>,
    /// Abusive IPs and the instant their ban lifts.
    banned: HashMap<IpAddr, Instant>,
}

/// Rate limiter state shared by every request.
#[derive(Clone)]
pub struct RateLimitLayer {
    config: RateLimitConfig,
    state: Arc<Mutex<LimiterState>>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed { remaining: u32 },
    BurstUsed { remaining: u32 },
    /// The request that tripped the limit; the IP is now banned.
    Exceeded { retry_after: Duration },
    Banned { retry_after: Duration },
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(LimiterState::default())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if request should be allowed.
    pub fn check(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let mut state = self.state.lock();

        if let Some(&until) = state.banned.get(&ip) {
            if now < until {
                return RateLimitResult::Banned {
                    retry_after: until - now,
                };
            }
            state.banned.remove(&ip);
            state.windows.remove(&ip);
            info!(ip = %ip, "Ban expired");
        }

        let entry = state.windows.entry(ip).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);

        let limit = self.config.max_requests.saturating_add(self.config.burst);
        let remaining = limit.saturating_sub(entry.count);

        if entry.count > limit {
            state.windows.remove(&ip);
            state.banned.insert(ip, now + self.config.ban_duration);
            RateLimitResult::Exceeded {
                retry_after: self.config.ban_duration,
            }
        } else if entry.count > self.config.max_requests {
            RateLimitResult::BurstUsed { remaining }
        } else {
            RateLimitResult::Allowed { remaining }
        }
    }

    #[cfg(test)]
    fn is_banned(&self, ip: IpAddr) -> bool {
        self.state
            .lock()
            .banned
            .get(&ip)
            .is_some_and(|&until| Instant::now() < until)
    }

    /// Periodic cleanup of stale windows and expired bans (call from a background task).
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let mut state = self.state.lock();
        let window = self.config.window;

        state
            .windows
            .retain(|_, entry| now.duration_since(entry.window_start) < window * 2);
        state.banned.retain(|_, until| now < *until);
    }
}

/// Rate limiting middleware function.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<RateLimitLayer>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();

    let retry_after = match limiter.check(ip) {
        RateLimitResult::Allowed { .. } | RateLimitResult::BurstUsed { .. } => {
            return next.run(request).await;
        }
        RateLimitResult::Exceeded { retry_after } => {
            warn!(
                ip = %ip,
                ban_secs = retry_after.as_secs(),
                "Rate limit exceeded, IP banned"
            );
            retry_after
        }
        RateLimitResult::Banned { retry_after } => retry_after,
    };

    let mut response = detail_response(
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests. Please slow down.",
    );
    if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, burst: u32) -> RateLimitLayer {
        RateLimitLayer::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
            burst,
            ban_duration: Duration::from_secs(300),
        })
    }

    fn localhost() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn test_rate_limit_allows_under_limit() {
        let limiter = limiter(10, 5);
        for _ in 0..10 {
            assert!(matches!(
                limiter.check(localhost()),
                RateLimitResult::Allowed { .. }
            ));
        }
    }

    #[test]
    fn test_huge_limits_do_not_overflow() {
        let limiter = limiter(u32::MAX, u32::MAX);
        assert!(matches!(
            limiter.check(localhost()),
            RateLimitResult::Allowed { .. }
        ));
    }

    #[test]
    fn test_burst_then_ban() {
        let limiter = limiter(5, 3);
        let ip = localhost();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(matches!(limiter.check_at(ip, now), RateLimitResult::Allowed { .. }));
        }
        for _ in 0..3 {
            assert!(matches!(limiter.check_at(ip, now), RateLimitResult::BurstUsed { .. }));
        }

        assert_eq!(
            limiter.check_at(ip, now),
            RateLimitResult::Exceeded {
                retry_after: Duration::from_secs(300)
            }
        );
        assert!(limiter.is_banned(ip));

        // Still banned even after the counting window would have reset
        let later = now + Duration::from_secs(120);
        assert_eq!(
            limiter.check_at(ip, later),
            RateLimitResult::Banned {
                retry_after: Duration::from_secs(180)
            }
        );
    }

    #[test]
    fn test_ban_expires() {
        let limiter = limiter(1, 0);
        let ip = localhost();
        let now = Instant::now();

        limiter.check_at(ip, now);
        assert!(matches!(limiter.check_at(ip, now), RateLimitResult::Exceeded { .. }));

        let after_ban = now + Duration::from_secs(301);
        assert!(matches!(
            limiter.check_at(ip, after_ban),
            RateLimitResult::Allowed { .. }
        ));
    }

    #[test]
    fn test_ban_is_per_ip() {
        let limiter = limiter(1, 0);
        let now = Instant::now();
        let other: IpAddr = "10.0.0.2".parse().unwrap();

        limiter.check_at(localhost(), now);
        limiter.check_at(localhost(), now);
        assert!(matches!(
            limiter.check_at(other, now),
            RateLimitResult::Allowed { .. }
        ));
    }

    #[test]
    fn test_cleanup_drops_expired_bans() {
        let limiter = limiter(1, 0);
        let now = Instant::now();
        limiter.check_at(localhost(), now);
        limiter.check_at(localhost(), now);

        limiter.cleanup_at(now + Duration::from_secs(10));
        assert_eq!(limiter.state.lock().banned.len(), 1);

        limiter.cleanup_at(now + Duration::from_secs(400));
        assert!(limiter.state.lock().banned.is_empty());
        assert!(limiter.state.lock().windows.is_empty());
    }
}
