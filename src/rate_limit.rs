use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;
use tracing::debug;

use crate::metrics::RATE_LIMIT_KEYS;

// Fixed-window counter, one entry per client key
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: DateTime<Utc>,
}

// Outcome of a single check. `reset_time` is always the end of the key's
// current window so the handler can echo it in X-RateLimit-Reset;
// `retry_after_secs` is only meaningful when denied.
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    pub retry_after_secs: i64,
}

/// Wall clock seam so tests can drive window expiry deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Process-local fixed-window rate limiter.
///
/// Each key gets MAX requests per WINDOW; the window resets at an absolute
/// wall-clock time rather than sliding, so a client can burst up to 2xMAX
/// across a boundary. That is an accepted tradeoff, matching what the
/// deployed service has always done.
///
/// State lives in process memory only. Each instance of the service counts
/// independently; the effective limit under N instances is MAX x N.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max: u32, window_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            max,
            window: Duration::seconds(window_secs as i64),
            clock,
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    // Check-and-count for one key. The DashMap entry guard is held for the
    // whole read-modify-write, so two concurrent checks on the same key
    // cannot both slip past the threshold.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = self.clock.now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                reset_time: now + self.window,
            });

        // expired window: start a fresh one (lazy expiry)
        if entry.reset_time < now {
            entry.count = 0;
            entry.reset_time = now + self.window;
        }

        if entry.count >= self.max {
            let retry_after = (entry.reset_time - now).num_seconds().max(1);
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: entry.reset_time,
                retry_after_secs: retry_after,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: self.max - entry.count,
            reset_time: entry.reset_time,
            retry_after_secs: 0,
        }
    }

    // Drop every expired entry. Purely a memory bound; check() already
    // handles expiry lazily, so correctness holds even if this never runs.
    pub fn sweep(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.reset_time >= now);
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

// Background sweeper, spawned once at startup
pub async fn sweeper(limiter: Arc<RateLimiter>, every_secs: u64) {
    let mut tick = interval(StdDuration::from_secs(every_secs));
    loop {
        tick.tick().await;
        limiter.sweep();
        let keys = limiter.tracked_keys();
        RATE_LIMIT_KEYS.set(keys as f64);
        debug!(keys, "rate limit sweep complete");
    }
}

// Best-effort client address from proxy headers. A client that is not
// behind a trusted reverse proxy can spoof these; that is a documented
// limitation of the deployment, not something we can detect here.
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(first) = forwarded {
        return first.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    "unknown".to_string()
}

// Hash the address before keying the map so raw IPs never sit in memory
pub fn client_key(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Controllable clock for deterministic window tests
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        fn advance(&self, secs: i64) {
            *self.now.lock().unwrap() += Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn fixed_start() -> DateTime<Utc> {
        "2025-06-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn allows_up_to_max_then_denies() {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let limiter = RateLimiter::new(3, 3600, clock);

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("k");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = limiter.check("k");
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs, 3600);
    }

    #[test]
    fn window_resets_after_expiry() {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let limiter = RateLimiter::new(3, 3600, clock.clone());

        for _ in 0..3 {
            assert!(limiter.check("k").allowed);
        }
        assert!(!limiter.check("k").allowed);

        clock.advance(3601);
        let fresh = limiter.check("k");
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 2);
    }

    #[test]
    fn reset_time_is_window_end() {
        let start = fixed_start();
        let clock = Arc::new(ManualClock::new(start));
        let limiter = RateLimiter::new(3, 3600, clock);

        let decision = limiter.check("k");
        assert_eq!(decision.reset_time, start + Duration::seconds(3600));
    }

    #[test]
    fn keys_are_independent() {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let limiter = RateLimiter::new(1, 3600, clock);

        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn retry_after_shrinks_as_window_ages() {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let limiter = RateLimiter::new(1, 3600, clock.clone());

        assert!(limiter.check("k").allowed);
        clock.advance(600);
        let denied = limiter.check("k");
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, 3000);
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let limiter = RateLimiter::new(3, 3600, clock.clone());

        limiter.check("old");
        clock.advance(1800);
        limiter.check("newer");
        assert_eq!(limiter.tracked_keys(), 2);

        // "old" expires at +3600, "newer" at +5400
        clock.advance(2000);
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 1);

        clock.advance(2000);
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn expired_entry_still_denied_correctly_without_sweep() {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let limiter = RateLimiter::new(2, 3600, clock.clone());

        assert!(limiter.check("k").allowed);
        assert!(limiter.check("k").allowed);
        assert!(!limiter.check("k").allowed);

        // never swept, but the stale entry is replaced lazily
        clock.advance(7200);
        let fresh = limiter.check("k");
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.2");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn client_key_is_stable_and_opaque() {
        let a = client_key("203.0.113.9");
        let b = client_key("203.0.113.9");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(!a.contains("203"));
    }
}
