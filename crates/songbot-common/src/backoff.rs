use std::future::Future;
use std::time::Duration;

/// Global maximum delay for a single backoff step.
const GLOBAL_MAX: Duration = Duration::from_secs(120);

/// An exponential backoff.
pub struct Exponential {
    initial: Duration,
    attempt: u32,
}

impl Exponential {
    /// Construct a new exponential backoff.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            attempt: 0,
        }
    }

    /// Register a failure and get the duration to wait before trying again.
    pub fn failed(&mut self) -> Duration {
        let duration = grow(self.initial, self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        duration
    }

    /// Reset the backoff after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

fn grow(initial: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
    initial.saturating_mul(factor).min(GLOBAL_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Growth {
    Constant,
    Exponential,
}

/// A bounded retry policy.
///
/// Runs an operation up to `attempts` times, waiting between attempts. The
/// delay after the n:th failed attempt (zero-based) is `delay` for a constant
/// policy and `delay * 2^n` for an exponential one. Nothing is slept after
/// the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    attempts: usize,
    delay: Duration,
    growth: Growth,
}

impl Retry {
    /// A policy with the same delay between every attempt.
    pub const fn constant(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            growth: Growth::Constant,
        }
    }

    /// A policy where the delay doubles after every attempt.
    pub const fn exponential(attempts: usize, initial: Duration) -> Self {
        Self {
            attempts,
            delay: initial,
            growth: Growth::Exponential,
        }
    }

    /// The delay following the given zero-based failed attempt.
    pub fn delay(&self, attempt: usize) -> Duration {
        match self.growth {
            Growth::Constant => self.delay,
            Growth::Exponential => {
                grow(self.delay, u32::try_from(attempt).unwrap_or(u32::MAX))
            }
        }
    }

    /// Run `op` until it produces a value that `accept` agrees with.
    ///
    /// Errors and rejected values both count as failed attempts, errors are
    /// logged as warnings. Returns `None` once all attempts are exhausted.
    pub async fn run<T, F, Fut, P>(&self, what: &str, mut op: F, accept: P) -> Option<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        P: Fn(&T) -> bool,
    {
        for attempt in 0..self.attempts {
            match op(attempt).await {
                Ok(value) if accept(&value) => return Some(value),
                Ok(..) => {
                    tracing::trace!(
                        "{} not accepted (attempt {}/{})",
                        what,
                        attempt + 1,
                        self.attempts
                    );
                }
                Err(e) => {
                    log_warn!(
                        e,
                        "{} failed (attempt {}/{})",
                        what,
                        attempt + 1,
                        self.attempts
                    );
                }
            }

            if attempt + 1 < self.attempts {
                tokio::time::sleep(self.delay(attempt)).await;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use anyhow::anyhow;
    use tokio::time::Instant;

    use super::{Exponential, Retry};

    #[test]
    fn test_exponential_doubles_and_caps() {
        let mut backoff = Exponential::new(Duration::from_secs(2));
        assert_eq!(backoff.failed(), Duration::from_secs(2));
        assert_eq!(backoff.failed(), Duration::from_secs(4));
        assert_eq!(backoff.failed(), Duration::from_secs(8));

        for _ in 0..10 {
            backoff.failed();
        }

        assert_eq!(backoff.failed(), Duration::from_secs(120));
        backoff.reset();
        assert_eq!(backoff.failed(), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_delays() {
        let retry = Retry::exponential(5, Duration::from_secs(2));
        let delays = (0..5).map(|n| retry.delay(n).as_secs()).collect::<Vec<_>>();
        assert_eq!(delays, vec![2, 4, 8, 16, 32]);

        let retry = Retry::constant(3, Duration::from_secs(2));
        assert_eq!(retry.delay(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_at_first_accepted() {
        let calls = Cell::new(0);
        let start = Instant::now();

        let out = Retry::constant(3, Duration::from_secs(2))
            .run(
                "counting",
                |attempt| {
                    calls.set(calls.get() + 1);
                    async move { Ok(attempt) }
                },
                |attempt| *attempt == 1,
            )
            .await;

        assert_eq!(out, Some(1));
        assert_eq!(calls.get(), 2);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_without_trailing_sleep() {
        let calls = Cell::new(0);
        let start = Instant::now();

        let out: Option<()> = Retry::exponential(3, Duration::from_secs(1))
            .run(
                "failing",
                |_| {
                    calls.set(calls.get() + 1);
                    async { Err(anyhow!("nope")) }
                },
                |_| true,
            )
            .await;

        assert_eq!(out, None);
        assert_eq!(calls.get(), 3);
        // 1s + 2s between the three attempts, nothing after the last one.
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
