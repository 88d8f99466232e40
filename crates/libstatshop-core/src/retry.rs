//! Fixed-delay bounded retry
//!
//! Used to poll resources on eventually consistent remotes (a freshly
//! requested fork is not immediately readable). Each attempt is preceded by
//! one `interval` sleep; after `max_attempts` failures the last error is
//! returned.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Default delay between readiness probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of readiness probes before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    pub const fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    // A zero budget still makes one attempt
    fn budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Poll state reported to observers on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Attempt `attempt` failed and another one is scheduled
    Pending { attempt: u32 },
    /// Attempt `attempts` succeeded
    Ready { attempts: u32 },
    /// Budget exhausted after `attempts` failures
    GaveUp { attempts: u32 },
}

/// Successful outcome with the number of attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

impl<T> Retried<T> {
    /// Attempts beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E: fmt::Display + fmt::Debug> {
    pub attempts: u32,
    pub last_error: E,
}

/// Run `op` until it succeeds or the policy's budget is spent.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: &RetryPolicy,
    op: F,
) -> Result<Retried<T>, RetryExhausted<E>>
where
    E: fmt::Display + fmt::Debug,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_fixed_observed(policy, op, |_| {}).await
}

/// Like [`retry_fixed`], reporting each state transition to `observe`
pub async fn retry_fixed_observed<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    mut op: F,
    mut observe: O,
) -> Result<Retried<T>, RetryExhausted<E>>
where
    E: fmt::Display + fmt::Debug,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(PollState),
{
    let budget = policy.budget();
    let mut attempt = 0;

    loop {
        attempt += 1;
        tokio::time::sleep(policy.interval).await;

        match op(attempt).await {
            Ok(value) => {
                observe(PollState::Ready { attempts: attempt });
                return Ok(Retried {
                    value,
                    attempts: attempt,
                });
            }
            Err(last_error) if attempt >= budget => {
                observe(PollState::GaveUp { attempts: attempt });
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error,
                });
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "attempt failed, retrying");
                observe(PollState::Pending { attempt });
            }
        }
    }
}
