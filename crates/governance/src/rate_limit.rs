//! Per-session tool-call rate limiting.
//!
//! A sliding window counter keyed by session identifier. The limiter is
//! intentionally shared across concurrent sessions (one instance per
//! deployment) and must support safe concurrent increment/lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Maximum tool calls per window.
    pub max_calls: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_calls: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Sliding-window rate limiter keyed by session id.
pub struct SessionRateLimiter {
    policy: RateLimitPolicy,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SessionRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one call for `session_id` if the window has room.
    ///
    /// Returns `Err(retry_after)` when the window is full; the call is not
    /// recorded in that case.
    pub fn check_and_record(&self, session_id: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        let window = windows.entry(session_id.to_string()).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) > self.policy.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.policy.max_calls as usize {
            let oldest = *window.front().unwrap_or(&now);
            let retry_after = self
                .policy
                .window
                .saturating_sub(now.duration_since(oldest));
            warn!(
                session_id,
                calls = window.len(),
                limit = self.policy.max_calls,
                "Tool-call rate limit exceeded"
            );
            return Err(retry_after);
        }

        window.push_back(now);
        Ok(())
    }

    /// Drop tracking state for a finished session.
    pub fn forget(&self, session_id: &str) {
        self.windows.lock().unwrap().remove(session_id);
    }
}

impl Default for SessionRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit() {
        let limiter = SessionRateLimiter::new(RateLimitPolicy {
            max_calls: 3,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check_and_record("s1").is_ok());
        assert!(limiter.check_and_record("s1").is_ok());
        assert!(limiter.check_and_record("s1").is_ok());
        let retry = limiter.check_and_record("s1").unwrap_err();
        assert!(retry <= Duration::from_secs(60));
    }

    #[test]
    fn sessions_are_independent() {
        let limiter = SessionRateLimiter::new(RateLimitPolicy {
            max_calls: 1,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check_and_record("a").is_ok());
        assert!(limiter.check_and_record("b").is_ok());
        assert!(limiter.check_and_record("a").is_err());
    }

    #[test]
    fn forget_resets_a_session() {
        let limiter = SessionRateLimiter::new(RateLimitPolicy {
            max_calls: 1,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check_and_record("s").is_ok());
        assert!(limiter.check_and_record("s").is_err());
        limiter.forget("s");
        assert!(limiter.check_and_record("s").is_ok());
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = SessionRateLimiter::new(RateLimitPolicy {
            max_calls: 1,
            window: Duration::from_millis(0),
        });

        assert!(limiter.check_and_record("s").is_ok());
        // Zero-length window: the previous entry is already expired.
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.check_and_record("s").is_ok());
    }
}
