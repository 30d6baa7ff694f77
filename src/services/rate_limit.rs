//! Sliding-window rate limiter keyed by client id (or any logical key).
//!
//! In-process only: state resets on restart and is not shared across
//! instances. Enforcement is advisory UI feedback, not a security boundary.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            hits: DashMap::new(),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Prune timestamps older than the window, check the count, record the
    /// call when allowed.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut timestamps = self.hits.entry(key.to_string()).or_default();

        while let Some(front) = timestamps.front() {
            if now.duration_since(*front) > self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_over_limit_is_denied() {
        let limiter = RateLimiter::new(3, 60);

        for _ in 0..3 {
            assert!(limiter.is_allowed("acme"));
        }
        assert!(!limiter.is_allowed("acme"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);

        assert!(limiter.is_allowed("acme"));
        assert!(!limiter.is_allowed("acme"));
        assert!(limiter.is_allowed("globex"));
    }

    #[test]
    fn allowed_again_after_window_elapses() {
        // Sub-second window via Duration directly
        let limiter = RateLimiter {
            max_requests: 2,
            window: Duration::from_millis(50),
            hits: DashMap::new(),
        };

        assert!(limiter.is_allowed("acme"));
        assert!(limiter.is_allowed("acme"));
        assert!(!limiter.is_allowed("acme"));

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.is_allowed("acme"));
    }
}
