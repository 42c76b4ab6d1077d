//! Call pacing and fixed-delay retries.
//!
//! Both wrappers are plain values owned by the client. Compose them as
//! `retry.run(|| limiter.run(|| call()), ..)` so every attempt is paced.

use governor::{DefaultDirectRateLimiter, Quota};
use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

/// Enforces a minimum interval between the starts of consecutive wrapped
/// calls, with no burst allowance. Not meant for concurrent callers.
pub struct RateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    /// A rate that is non-positive, non-finite or too high to express as a
    /// period disables pacing.
    pub fn per_second(calls_per_second: f64) -> Self {
        Self {
            limiter: quota_per_second(calls_per_second).map(governor::RateLimiter::direct),
        }
    }

    fn is_pacing(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits until the next call is allowed, then runs `f`.
    pub async fn run<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        f().await
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("pacing", &self.is_pacing())
            .finish()
    }
}

/// One call per `1 / calls_per_second` seconds, burst of one.
fn quota_per_second(calls_per_second: f64) -> Option<Quota> {
    if !(calls_per_second.is_finite() && calls_per_second > 0.0) {
        return None;
    }
    let period = Duration::try_from_secs_f64(1.0 / calls_per_second).ok()?;
    Quota::with_period(period).map(|quota| quota.allow_burst(NonZeroU32::MIN))
}

/// Retries a call a fixed number of times with a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub tries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(tries: u32, delay: Duration) -> Self {
        Self { tries, delay }
    }

    /// Runs `f`, retrying errors accepted by `is_retryable`. The final
    /// attempt is not guarded: its result is returned as is.
    pub async fn run<F, Fut, T, E, P>(&self, mut f: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut tries_left = self.tries.max(1);
        while tries_left > 1 {
            match f().await {
                Err(err) if is_retryable(&err) => {
                    tries_left -= 1;
                    tracing::warn!("Retrying... {} tries left ({})", tries_left, err);
                    tokio::time::sleep(self.delay).await;
                }
                other => return other,
            }
        }
        f().await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(5, Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;
    use std::cell::Cell;
    use std::time::Instant as WallClock;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum Failure {
        Flaky,
        Fatal,
    }

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn flaky_then_ok(calls: &Cell<u32>, failures: u32) -> impl Future<Output = Result<u32, Failure>> {
        let n = calls.get() + 1;
        calls.set(n);
        async move {
            if n <= failures {
                Err(Failure::Flaky)
            } else {
                Ok(n)
            }
        }
    }

    #[test]
    fn quota_allows_one_call_per_period() {
        let clock = FakeRelativeClock::default();
        let limiter =
            governor::RateLimiter::direct_with_clock(quota_per_second(2.0).unwrap(), &clock);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
        clock.advance(Duration::from_millis(499));
        assert!(limiter.check().is_err());
        clock.advance(Duration::from_millis(1));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn unusable_rates_disable_pacing() {
        assert!(quota_per_second(0.0).is_none());
        assert!(quota_per_second(-1.0).is_none());
        assert!(quota_per_second(f64::NAN).is_none());
        assert!(quota_per_second(f64::INFINITY).is_none());
        assert!(!RateLimiter::per_second(0.0).is_pacing());
        assert!(RateLimiter::per_second(1.0).is_pacing());
    }

    #[tokio::test]
    async fn first_call_does_not_wait() {
        let limiter = RateLimiter::per_second(1.0);
        let start = WallClock::now();
        limiter.run(|| async {}).await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced() {
        let limiter = RateLimiter::per_second(20.0);
        let start = WallClock::now();
        for _ in 0..5 {
            limiter.run(|| async {}).await;
        }
        // 4 gaps of 50ms, less scheduling slack
        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn limiters_are_independent() {
        let a = RateLimiter::per_second(1.0);
        let b = RateLimiter::per_second(1.0);
        a.run(|| async {}).await;
        let start = WallClock::now();
        b.run(|| async {}).await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_after_k_failures() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(5, Duration::from_secs(10));
        let start = Instant::now();
        let result = policy
            .run(|| flaky_then_ok(&calls, 3), |e| *e == Failure::Flaky)
            .await;
        assert_eq!(result, Ok(4));
        assert_eq!(calls.get(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_on_last_attempt() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        let result = policy
            .run(|| flaky_then_ok(&calls, 10), |e| *e == Failure::Flaky)
            .await;
        assert_eq!(result, Err(Failure::Flaky));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_propagates_immediately() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), Failure> = policy
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err(Failure::Fatal) }
                },
                |e| *e == Failure::Flaky,
            )
            .await;
        assert_eq!(result, Err(Failure::Fatal));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn rate_limit_applies_to_each_attempt() {
        let limiter = &RateLimiter::per_second(20.0);
        let calls = &Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let start = WallClock::now();
        let result = policy
            .run(
                move || limiter.run(move || flaky_then_ok(calls, 2)),
                |e| *e == Failure::Flaky,
            )
            .await;
        assert_eq!(result, Ok(3));
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
