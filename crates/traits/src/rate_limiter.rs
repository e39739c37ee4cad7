//! Rate limiter backend trait.

use std::time::Duration;

/// Per-identity quota tracking.
///
/// The gateway always records a hit before testing, so `test` answers for the
/// quota including the current call.
pub trait RateLimiter: Send + Sync + 'static {
    /// Record one hit for `identity`.
    fn hit(&self, identity: &str);

    /// Whether `identity` is still within its quota.
    fn test(&self, identity: &str) -> bool;

    /// Time until the quota for `identity` frees up, once it is used up.
    fn resets_in(&self, identity: &str) -> Option<Duration>;
}
