//! Per-client rate limiting.
//!
//! [`Throttle`] is the pipeline stage: it records a hit for the caller, then
//! asks the [`RateLimiter`] backend whether the caller is still within quota.
//! [`SlidingWindowRateLimiter`] is the in-process backend.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use rpcgate_traits::{Metrics, RateLimiter};
use rpcgate_types::{ErrorKind, Fault};

use crate::metrics::{RATELIMITER_EXCEEDED, RATELIMITER_HIT};

/// Detail of the fault raised for callers over quota.
const TOO_MANY_REQUESTS: &str =
    "The action could not be performed because there were too many requests by the client.";

/// Configuration for [`SlidingWindowRateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Calls admitted per identity within one window.
    pub requests_per_window: u32,
    /// Length of the sliding window.
    pub window_duration: Duration,
}

impl RateLimiterConfig {
    /// Create a new configuration.
    pub const fn new(requests_per_window: u32, window_duration: Duration) -> Self {
        Self { requests_per_window, window_duration }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new(3600, Duration::from_secs(60 * 60))
    }
}

/// Sliding window limiter keyed by caller identity.
///
/// Each identity keeps the instants of its most recent hits inside the window,
/// at most one more than `requests_per_window`. A caller is within quota while
/// it has no more than `requests_per_window` of them. Identities whose window
/// empties are forgotten, and the whole table is swept once per window length.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    config: RateLimiterConfig,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    windows: HashMap<String, VecDeque<Instant>>,
    swept_at: Instant,
}

impl SlidingWindowRateLimiter {
    /// Create a limiter with the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        let state = WindowState { windows: HashMap::new(), swept_at: Instant::now() };
        Self { config, state: Mutex::new(state) }
    }

    /// The active configuration.
    pub const fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Hits of `identity` still inside the window, counted up to one past the
    /// quota.
    pub fn hits(&self, identity: &str) -> usize {
        self.with_window(identity, Instant::now(), |window| window.len())
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock().windows.len()
    }

    /// Forget `identity`.
    pub fn clear(&self, identity: &str) {
        self.lock().windows.remove(identity);
    }

    /// Drop identities without hits inside the window, returning how many
    /// remain tracked.
    pub fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        self.sweep(&mut state, now);
        state.windows.len()
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep(&self, state: &mut WindowState, now: Instant) {
        state.windows.retain(|_, window| {
            self.expire(window, now);
            !window.is_empty()
        });
        state.swept_at = now;
    }

    fn expire(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) < self.config.window_duration {
                break;
            }
            window.pop_front();
        }
    }

    fn with_window<T>(
        &self,
        identity: &str,
        now: Instant,
        f: impl FnOnce(&VecDeque<Instant>) -> T,
    ) -> T {
        let mut state = self.lock();
        let Some(window) = state.windows.get_mut(identity) else {
            return f(&VecDeque::new());
        };
        self.expire(window, now);
        let result = f(window);
        if window.is_empty() {
            state.windows.remove(identity);
        }
        result
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn hit(&self, identity: &str) {
        let now = Instant::now();
        let capacity = self.config.requests_per_window as usize + 1;
        let mut state = self.lock();
        if now.duration_since(state.swept_at) >= self.config.window_duration {
            self.sweep(&mut state, now);
        }
        let window = state.windows.entry(identity.to_string()).or_default();
        self.expire(window, now);
        window.push_back(now);
        while window.len() > capacity {
            window.pop_front();
        }
    }

    fn test(&self, identity: &str) -> bool {
        let limit = self.config.requests_per_window as usize;
        self.with_window(identity, Instant::now(), |window| window.len() <= limit)
    }

    fn resets_in(&self, identity: &str) -> Option<Duration> {
        let limit = self.config.requests_per_window as usize;
        let now = Instant::now();
        let window_duration = self.config.window_duration;
        self.with_window(identity, now, |window| {
            if window.len() < limit {
                return None;
            }
            let oldest = *window.front()?;
            Some((oldest + window_duration).saturating_duration_since(now))
        })
    }
}

/// Backend that never limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn hit(&self, _identity: &str) {}

    fn test(&self, _identity: &str) -> bool {
        true
    }

    fn resets_in(&self, _identity: &str) -> Option<Duration> {
        None
    }
}

/// Rate limiting stage of the call pipeline.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<dyn RateLimiter>,
    metrics: Arc<dyn Metrics>,
}

impl Throttle {
    /// Create the stage over a limiter backend.
    pub fn new(limiter: Arc<dyn RateLimiter>, metrics: Arc<dyn Metrics>) -> Self {
        Self { limiter, metrics }
    }

    /// Record a hit for `identity` and admit or reject the call.
    ///
    /// The hit is recorded first and unconditionally, so rejected calls count
    /// against the quota too.
    pub fn admit(&self, identity: &str) -> Result<(), Fault> {
        self.limiter.hit(identity);

        if self.limiter.test(identity) {
            self.metrics.increment(RATELIMITER_HIT, &[]);
            return Ok(());
        }

        self.metrics.increment(RATELIMITER_EXCEEDED, &[]);
        let mut message = TOO_MANY_REQUESTS.to_string();
        if let Some(resets_in) = self.limiter.resets_in(identity) {
            message.push_str(&format!(" Limit may reset in {} seconds.", reset_seconds(resets_in)));
        }
        debug!(caller = identity, "rate limit exceeded");
        Err(Fault::wrapped(ErrorKind::TooManyRequests, message))
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").finish_non_exhaustive()
    }
}

/// Whole seconds until reset, rounded up and never below one.
fn reset_seconds(resets_in: Duration) -> u64 {
    let secs = resets_in.as_secs() + u64::from(resets_in.subsec_nanos() > 0);
    secs.max(1)
}
