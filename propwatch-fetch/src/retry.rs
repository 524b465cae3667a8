//! Bounded retry for transient failures
//!
//! Each attempt runs under its own timeout. Transient failures back off
//! exponentially (with jitter) and retry; anything else returns at once.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FetchError;

/// Fraction of the backoff added at random
const MAX_JITTER: f64 = 0.25;

/// Retry tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (ms)
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay (ms)
    pub max_backoff_ms: u64,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Randomise delays by up to 25%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 5_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let ms = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(ms.min(self.max_backoff_ms as f64) as u64)
    }

    fn delay(&self, retry: u32) -> Duration {
        let base = self.backoff(retry);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let factor = 1.0 + rand::thread_rng().gen_range(0.0..MAX_JITTER);
        base.mul_f64(factor)
    }

    /// Worst-case wall time of `run` for a given per-attempt timeout
    pub fn worst_case(&self, attempt_timeout: Duration) -> Duration {
        let attempts = attempt_timeout.saturating_mul(self.max_retries + 1);
        let backoff: Duration = (1..=self.max_retries)
            .map(|r| self.backoff(r).mul_f64(1.0 + MAX_JITTER))
            .sum();
        attempts + backoff
    }

    /// Run `op` until it succeeds, fails non-transiently, or retries run out.
    ///
    /// `op` receives the zero-based attempt number. An attempt that exceeds
    /// `attempt_timeout` is dropped and counts as a transient failure.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        attempt_timeout: Duration,
        mut op: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(attempt_timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(attempt_timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay(attempt);
                    debug!(
                        "{} attempt {} failed ({}), retrying in {:?}",
                        name, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
