//! Bounded retry with exponential backoff and jitter for remote calls.
//!
//! Only errors that report themselves as transient are retried. Everything else is returned immediately so that the
//! handler can classify it.
use std::{future::Future, time::Duration};

use log::*;
use rand::Rng;
use store_gateway::GatewayError;
use stripe_tools::PaymentProcessorError;

/// Errors that know whether a later attempt could succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for GatewayError {
    fn is_transient(&self) -> bool {
        GatewayError::is_transient(self)
    }
}

impl Transient for PaymentProcessorError {
    fn is_transient(&self) -> bool {
        PaymentProcessorError::is_transient(self)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero means a single attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the computed delay that is randomised, between 0 and 1.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits. Useful in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, initial_delay: Duration::ZERO, max_delay: Duration::ZERO, multiplier: 1.0, jitter: 0.0 }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// The delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = self.jitter.clamp(0.0, 1.0);
        let delay = if jitter > 0.0 && capped > 0.0 {
            let range = capped * jitter;
            let offset = rand::thread_rng().gen_range(-range..=range);
            (capped + offset).max(0.0)
        } else {
            capped
        };
        Duration::from_secs_f64(delay)
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error, or the retry budget is spent.
    pub async fn run<F, Fut, T, E>(&self, label: &str, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay_for_attempt(attempt);
                    attempt += 1;
                    warn!("🔄️ {label} failed ({e}). Retry {attempt}/{} in {delay:?}", self.max_retries);
                    tokio::time::sleep(delay).await;
                },
                Err(e) => {
                    if attempt > 0 {
                        debug!("🔄️ {label} gave up after {} attempts", attempt + 1);
                    }
                    return Err(e);
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);
        let result = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(GatewayError::RemoteApi { status: 503, messages: vec![] })
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_user_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);
        let result: Result<(), _> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::UserErrors { messages: vec!["bad".into()] })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(2);
        let result: Result<(), _> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PaymentProcessorError::Transport { message: "reset".into(), timed_out: false })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delays_grow_and_are_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            multiplier: 2.0,
            jitter: 0.0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        let jittered = RetryPolicy { jitter: 0.5, ..policy };
        for _ in 0..20 {
            let d = jittered.delay_for_attempt(0);
            assert!(d >= Duration::from_millis(49) && d <= Duration::from_millis(151));
        }
    }
}
