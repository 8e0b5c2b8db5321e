// In-memory sliding-window rate limiting.
// Each limited endpoint keeps a deque of request timestamps per key (IP or
// email); a request is allowed when fewer than max_requests timestamps fall
// inside the window. State is process-local and resets on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::app_config::config;

/// Limit parameters for one endpoint
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub current_count: u32,
    /// Seconds until the oldest counted request leaves the window; only
    /// meaningful when the request was denied.
    pub retry_after: u64,
}

/// Sliding-window limiter over an arbitrary string key.
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Check and record one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = windows.entry(key.to_string()).or_default();

        // Drop timestamps that have slid out of the window
        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) >= self.config.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        let current = timestamps.len() as u32;
        if current >= self.config.max_requests {
            let retry_after = timestamps
                .front()
                .map(|oldest| {
                    self.config
                        .window
                        .saturating_sub(now.duration_since(*oldest))
                        .as_secs()
                        .max(1)
                })
                .unwrap_or(1);

            debug!(key = %key, current, limit = self.config.max_requests, "rate limit exceeded");
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                current_count: current,
                retry_after,
            };
        }

        timestamps.push_back(now);
        RateLimitResult {
            allowed: true,
            remaining: self.config.max_requests - current - 1,
            current_count: current + 1,
            retry_after: 0,
        }
    }

    /// Drop windows whose every timestamp has expired. Called by the
    /// periodic sweep so the map does not grow with one entry per IP forever.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window;
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, timestamps| {
            timestamps
                .back()
                .map(|last| now.duration_since(*last) < window)
                .unwrap_or(false)
        });
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// The limiters the application actually runs, built from config.
pub struct RateLimitService {
    pub login_per_ip: SlidingWindowLimiter,
    pub login_per_email: SlidingWindowLimiter,
    pub contact_per_ip: SlidingWindowLimiter,
}

impl RateLimitService {
    pub fn from_config() -> Self {
        let security = &config().security;
        Self {
            login_per_ip: SlidingWindowLimiter::new(RateLimitConfig::new(
                security.login_rate_limit_per_ip,
                60,
            )),
            login_per_email: SlidingWindowLimiter::new(RateLimitConfig::new(
                security.login_rate_limit_per_email,
                3600,
            )),
            contact_per_ip: SlidingWindowLimiter::new(RateLimitConfig::new(
                security.contact_rate_limit_per_ip,
                u64::from(security.contact_rate_limit_window_seconds),
            )),
        }
    }

    /// Login is limited on two axes; the stricter outcome wins. The
    /// per-email check only runs when the per-IP check passed, so a blocked
    /// IP cannot burn another user's email budget.
    pub fn check_login(&self, ip: &str, email: &str) -> RateLimitResult {
        let by_ip = self.login_per_ip.check(ip);
        if !by_ip.allowed {
            warn!(ip = %ip, "login rate limit hit for IP");
            return by_ip;
        }
        let by_email = self.login_per_email.check(&email.to_lowercase());
        if !by_email.allowed {
            warn!("login rate limit hit for email");
        }
        by_email
    }

    pub fn check_contact(&self, ip: &str) -> RateLimitResult {
        let result = self.contact_per_ip.check(ip);
        if !result.allowed {
            warn!(ip = %ip, "contact form rate limit hit for IP");
        }
        result
    }

    /// Periodic cleanup across all limiters.
    pub fn sweep(&self) -> usize {
        self.login_per_ip.sweep() + self.login_per_email.sweep() + self.contact_per_ip.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitConfig::new(max, window_secs))
    }

    #[test]
    fn test_allows_up_to_limit() {
        let l = limiter(3, 60);
        assert!(l.check("1.2.3.4").allowed);
        assert!(l.check("1.2.3.4").allowed);
        let third = l.check("1.2.3.4");
        assert!(third.allowed);
        assert_eq!(third.remaining, 0);
        assert!(!l.check("1.2.3.4").allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let l = limiter(1, 60);
        assert!(l.check("a").allowed);
        assert!(!l.check("a").allowed);
        assert!(l.check("b").allowed);
    }

    #[test]
    fn test_denied_request_not_counted() {
        let l = limiter(2, 60);
        l.check("k");
        l.check("k");
        let denied = l.check("k");
        assert!(!denied.allowed);
        assert_eq!(denied.current_count, 2);
    }

    #[test]
    fn test_window_slides() {
        let l = limiter(2, 1);
        let start = Instant::now();
        assert!(l.check_at("k", start).allowed);
        assert!(l.check_at("k", start).allowed);
        assert!(!l.check_at("k", start).allowed);
        // After the window passes, both timestamps have expired
        let later = start + Duration::from_millis(1100);
        assert!(l.check_at("k", later).allowed);
    }

    #[test]
    fn test_retry_after_reported_on_denial() {
        let l = limiter(1, 60);
        let start = Instant::now();
        l.check_at("k", start);
        let denied = l.check_at("k", start + Duration::from_secs(10));
        assert!(!denied.allowed);
        assert!(denied.retry_after >= 49 && denied.retry_after <= 50);
    }

    #[test]
    fn test_sweep_drops_stale_keys() {
        let l = limiter(5, 1);
        l.check("old");
        assert_eq!(l.tracked_keys(), 1);
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(l.sweep(), 1);
        assert_eq!(l.tracked_keys(), 0);
    }
}
