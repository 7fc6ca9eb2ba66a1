//! Admission Limiter: fixed-window request counter per client identity.
//!
//! # Algorithm
//!
//! Each identity owns one window entry `{count, window_start}`:
//!
//! ```text
//!   no entry ──────────────────────────────► {1, now}          Allowed
//!   active, count < limit ─────────────────► {count + 1, start} Allowed
//!   active, count >= limit ────────────────► unchanged          Denied
//!   expired (now - start >= window) ───────► {1, now}          Allowed
//! ```
//!
//! This is a fixed window, not a sliding one: a client can spend `limit`
//! requests at the end of one window and `limit` more right after rollover,
//! so up to `2 * limit` requests can land inside any single window-length
//! span. That burst is a known property of the policy.
//!
//! # Memory
//!
//! Every call first drops all expired entries, so the map only ever holds
//! identities seen within the trailing window. A background task in
//! [`crate::state::AppState`] runs the same sweep when traffic is idle.
//!
//! # Concurrency
//!
//! The sweep, lookup, comparison and update for one call all happen under a
//! single `Mutex` guard. Two concurrent calls for the same identity cannot
//! both observe `count < limit` and both increment past it. The guard is
//! never held across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Source of monotonic time for the limiter.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move time forward. Time never moves backward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error type for limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// Limit value cannot be zero.
    ZeroLimit,
    /// Window length cannot be zero.
    ZeroWindow,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::ZeroLimit => {
                write!(f, "limit must be greater than 0; disable the limiter instead")
            }
            RateLimitError::ZeroWindow => write!(f, "window must be greater than 0"),
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Result of [`AdmissionLimiter::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request admitted and counted.
    Allowed {
        /// Requests still available in the current window.
        remaining: u32,
        /// Time until the current window rolls over.
        reset_after: Duration,
    },
    /// Quota exhausted; nothing was recorded.
    Denied {
        /// Time until the current window rolls over.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Per-identity fixed-window limiter.
pub struct AdmissionLimiter {
    windows: Mutex<HashMap<String, WindowEntry>>,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AdmissionLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl AdmissionLimiter {
    /// Create a limiter on the real monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns an error if `limit` or `window` is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, RateLimitError> {
        Self::with_clock(limit, window, Arc::new(MonotonicClock))
    }

    /// Create a limiter on a caller-supplied clock.
    pub fn with_clock(
        limit: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RateLimitError> {
        if limit == 0 {
            return Err(RateLimitError::ZeroLimit);
        }
        if window.is_zero() {
            return Err(RateLimitError::ZeroWindow);
        }

        Ok(Self {
            windows: Mutex::new(HashMap::new()),
            limit,
            window,
            clock,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject one request for `identity`, recording it if admitted.
    pub fn check_and_record(&self, identity: &str) -> Admission {
        let mut windows = self.lock();
        // Read under the lock so callers see time advance in lock order
        let now = self.clock.now();

        // Anything left after the sweep is inside its window
        Self::sweep_locked(&mut windows, now, self.window);

        match windows.get_mut(identity) {
            Some(entry) => {
                let reset_after = self
                    .window
                    .saturating_sub(now.saturating_duration_since(entry.window_start));

                if entry.count >= self.limit {
                    return Admission::Denied {
                        retry_after: reset_after,
                    };
                }

                entry.count += 1;
                Admission::Allowed {
                    remaining: self.limit - entry.count,
                    reset_after,
                }
            }
            None => {
                windows.insert(
                    identity.to_string(),
                    WindowEntry {
                        count: 1,
                        window_start: now,
                    },
                );
                Admission::Allowed {
                    remaining: self.limit - 1,
                    reset_after: self.window,
                }
            }
        }
    }

    /// Drop every expired window. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut windows = self.lock();
        let now = self.clock.now();
        Self::sweep_locked(&mut windows, now, self.window)
    }

    /// Number of identities currently holding a window.
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    /// Requests recorded for `identity` in its current window, if any.
    pub fn current_count(&self, identity: &str) -> Option<u32> {
        let windows = self.lock();
        let now = self.clock.now();
        windows
            .get(identity)
            .filter(|entry| now.saturating_duration_since(entry.window_start) < self.window)
            .map(|entry| entry.count)
    }

    fn sweep_locked(
        windows: &mut HashMap<String, WindowEntry>,
        now: Instant,
        window: Duration,
    ) -> usize {
        let before = windows.len();
        windows.retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
        before - windows.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WindowEntry>> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock still guards valid data
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
