//! Per-source request throttling.
//!
//! Every source owns its own [`RateLimiter`]. A call waits for the limiter
//! before it is sent and is never rejected, so a throttled source slows down
//! instead of failing. Only the send is gated: the limiter does not hold
//! anything while a response is in flight, so a slow server never blocks
//! the next token.

use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};
use nonzero_ext::nonzero;

/// Upper bound on the number of calls that may be sent back to back.
const MAX_BURST: u32 = 2;

/// A calls-per-time ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    /// Minimum spacing between two calls in the long run
    period: Duration,
}

impl RateLimit {
    /// At most `calls` per second.
    pub fn per_second(calls: NonZeroU32) -> Self {
        Self {
            period: Duration::from_secs(1) / calls.get(),
        }
    }

    /// At most `calls` per minute.
    pub fn per_minute(calls: NonZeroU32) -> Self {
        Self {
            period: Duration::from_secs(60) / calls.get(),
        }
    }

    /// Build a limit from a fractional calls-per-second rate (e.g. `0.5`).
    ///
    /// Returns `None` for rates that are zero, negative or not finite.
    pub fn from_rate(calls_per_second: f64) -> Option<Self> {
        if !calls_per_second.is_finite() || calls_per_second <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / calls_per_second)
            .ok()
            .map(|period| Self { period })
    }

    /// Minimum spacing between two calls
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Calls per second this limit allows
    pub fn calls_per_second(&self) -> f64 {
        if self.period.is_zero() {
            f64::INFINITY
        } else {
            1.0 / self.period.as_secs_f64()
        }
    }

    /// Calls per minute this limit allows
    pub fn calls_per_minute(&self) -> f64 {
        self.calls_per_second() * 60.0
    }

    /// Number of calls that may go out back to back after an idle period.
    ///
    /// Slow limits get a single slot, anything at or above one call per
    /// second gets two.
    pub fn burst(&self) -> NonZeroU32 {
        let slots = (self.calls_per_second().floor().min(f64::from(MAX_BURST)) as u32)
            .saturating_add(1)
            .min(MAX_BURST);
        NonZeroU32::new(slots).unwrap_or(nonzero!(1u32))
    }

    fn quota(&self) -> Quota {
        Quota::with_period(self.period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(self.burst())
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_minute = self.calls_per_minute();
        if per_minute >= 60.0 {
            write!(f, "{:.0}/s", self.calls_per_second())
        } else {
            write!(f, "{:.0}/min", per_minute)
        }
    }
}

/// Delays calls so their long-run rate stays under a [`RateLimit`].
pub struct RateLimiter {
    limit: RateLimit,
    inner: DefaultDirectRateLimiter,
}

impl RateLimiter {
    /// Create a limiter with a full bucket.
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            inner: DefaultDirectRateLimiter::direct(limit.quota()),
        }
    }

    /// The limit this limiter enforces
    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait until one call may be sent.
    pub async fn acquire(&self) {
        if self.inner.check().is_ok() {
            return;
        }
        tracing::trace!(limit = %self.limit, "Waiting for rate limiter");
        self.inner.until_ready().await;
    }

    /// Run `call` once the limiter allows it.
    pub async fn throttle<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        call().await
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.limit)
            .finish()
    }
}
