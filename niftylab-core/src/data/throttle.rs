//! Request throttle for outbound provider calls.
//!
//! Two policies in one shared object:
//! - minimum spacing between consecutive requests
//! - a circuit breaker that refuses all requests for a cooldown after an
//!   immediate trip (HTTP 403) or a streak of failures (HTTP 429 / 5xx)
//!
//! One throttle is built by the caller and shared (`Arc`) by every provider
//! that talks to the same host.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakerState {
    Closed,
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    last_request: Option<Instant>,
}

#[derive(Debug)]
pub struct RequestThrottle {
    inner: Mutex<Inner>,
    min_interval: Duration,
    cooldown: Duration,
    failure_threshold: u32,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_request: None,
            }),
            min_interval,
            cooldown,
            failure_threshold: 3,
        }
    }

    /// 500 ms between requests, 30-minute cooldown after a trip.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30 * 60))
    }

    /// No spacing; the breaker still applies.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO, Duration::from_secs(30 * 60))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether requests are currently allowed. An expired cooldown closes
    /// the breaker again.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Block until the minimum spacing since the previous request has
    /// passed, then claim the slot.
    pub fn wait_turn(&self) {
        let wait = {
            let mut inner = self.lock();
            let now = Instant::now();
            let ready_at = inner
                .last_request
                .map(|last| last + self.min_interval)
                .unwrap_or(now);
            let slot = ready_at.max(now);
            inner.last_request = Some(slot);
            slot - now
        };
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Count a failure; trips the breaker once the threshold is reached.
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
        }
    }

    /// Open the breaker immediately (IP ban).
    pub fn trip(&self) {
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => {
                self.cooldown.saturating_sub(tripped_at.elapsed())
            }
        }
    }
}
