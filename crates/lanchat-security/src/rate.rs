//! Per-peer sliding-window rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use crate::SecurityConfig;

/// Tracks message timestamps per peer address over a sliding window.
///
/// Every inbound frame counts as one attempt. A peer that exceeds the
/// configured attempts-per-window is rejected; the relay closes the
/// connection with a policy-violation code.
#[derive(Debug)]
pub struct RateLimiter {
    attempts: HashMap<IpAddr, Vec<Instant>>,
    max_attempts: usize,
    window: std::time::Duration,
}

impl RateLimiter {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts: config.max_attempts_per_window,
            window: config.rate_window,
        }
    }

    /// Records one attempt from `peer` and reports whether it is
    /// within the limit. Entries older than the window are dropped on
    /// the way in, so memory stays bounded by active peers.
    pub fn check(&mut self, peer: IpAddr) -> bool {
        let now = Instant::now();
        let attempts = self.attempts.entry(peer).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);

        if attempts.len() >= self.max_attempts {
            tracing::warn!(%peer, attempts = attempts.len(), "rate limit exceeded");
            return false;
        }

        attempts.push(now);
        true
    }

    /// Forgets a peer entirely. Called when its last connection closes.
    pub fn forget(&mut self, peer: IpAddr) {
        self.attempts.remove(&peer);
    }

    /// Number of peers with recorded attempts.
    pub fn tracked_peers(&self) -> usize {
        self.attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn peer() -> IpAddr {
        "192.168.1.50".parse().unwrap()
    }

    fn limiter(max: usize) -> RateLimiter {
        RateLimiter::new(&SecurityConfig {
            max_attempts_per_window: max,
            ..SecurityConfig::default()
        })
    }

    #[test]
    fn test_allows_up_to_the_limit() {
        let mut limiter = limiter(10);
        for _ in 0..10 {
            assert!(limiter.check(peer()));
        }
    }

    #[test]
    fn test_rejects_past_the_limit() {
        let mut limiter = limiter(10);
        for _ in 0..10 {
            limiter.check(peer());
        }
        assert!(!limiter.check(peer()));
        assert!(!limiter.check(peer()));
    }

    #[test]
    fn test_peers_are_limited_independently() {
        let mut limiter = limiter(2);
        let other: IpAddr = "192.168.1.51".parse().unwrap();
        limiter.check(peer());
        limiter.check(peer());
        assert!(!limiter.check(peer()));
        assert!(limiter.check(other));
    }

    #[test]
    fn test_window_expiry_readmits_the_peer() {
        let mut limiter = RateLimiter::new(&SecurityConfig {
            max_attempts_per_window: 1,
            rate_window: Duration::from_millis(10),
            ..SecurityConfig::default()
        });
        assert!(limiter.check(peer()));
        assert!(!limiter.check(peer()));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check(peer()));
    }

    #[test]
    fn test_forget_clears_tracking() {
        let mut limiter = limiter(10);
        limiter.check(peer());
        assert_eq!(limiter.tracked_peers(), 1);
        limiter.forget(peer());
        assert_eq!(limiter.tracked_peers(), 0);
    }
}
