//! Rate limiter contract and a sliding-window implementation

use crate::{AtelierError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Pre-dispatch admission check.
pub trait RateLimiter: Send + Sync {
    /// `Ok(())` if the call may proceed, `AtelierError::RateLimited` otherwise.
    /// An allowed call counts against the limit.
    fn check(&self, user_id: &str, endpoint: &str) -> Result<()>;
}

/// Allows `max_requests` per `(user, endpoint)` within a rolling window
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    hits: HashMap<(String, String), VecDeque<Instant>>,
    last_sweep: Instant,
}

impl WindowState {
    /// Drop keys whose newest hit has left the window
    fn sweep(&mut self, now: Instant, window: Duration) {
        self.hits
            .retain(|_, entry| entry.back().is_some_and(|&t| now.duration_since(t) < window));
        self.last_sweep = now;
    }
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(WindowState {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, user_id: &str, endpoint: &str) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // At most one full pass per window
        if now.duration_since(state.last_sweep) >= self.window {
            state.sweep(now, self.window);
        }

        let entry = state
            .hits
            .entry((user_id.to_string(), endpoint.to_string()))
            .or_default();

        while entry
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            entry.pop_front();
        }

        if entry.len() >= self.max_requests {
            return Err(AtelierError::RateLimited(format!(
                "{} requests to '{}' within {:?}",
                self.max_requests, endpoint, self.window
            )));
        }

        entry.push_back(now);
        Ok(())
    }
}
