//! Retry policy with exponential backoff on the context clock.

use roverlink_env::{cancellable_sleep, AbortSignal, EnvError, RoverContext};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single backoff delay
    pub max_delay: Duration,

    pub backoff_multiplier: f64,

    /// Scale each delay by a random factor in [0.5, 1.5)
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Delay before retry number `attempt` (0-based).
///
/// `jitter_sample` is a uniform draw in [0, 1); it is ignored when the
/// policy has jitter disabled.
pub fn compute_backoff_delay(policy: &RetryPolicy, attempt: u32, jitter_sample: f64) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let raw = policy.base_delay.as_secs_f64() * policy.backoff_multiplier.powi(exponent);
    let scaled = if policy.jitter {
        raw * (0.5 + jitter_sample.clamp(0.0, 1.0))
    } else {
        raw
    };
    let capped = scaled.min(policy.max_delay.as_secs_f64());
    if capped.is_finite() && capped > 0.0 {
        Duration::from_secs_f64(capped)
    } else {
        Duration::ZERO
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or the retry budget is spent.
///
/// Backoff sleeps run on `ctx` and end early with `EnvError::Cancelled`
/// when `abort` fires. The last error is returned on exhaustion.
pub async fn retry_async<Ctx, T, Op, Fut>(
    ctx: &Ctx,
    policy: &RetryPolicy,
    abort: &AbortSignal,
    mut operation: Op,
) -> Result<T, EnvError>
where
    Ctx: RoverContext + ?Sized,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EnvError>>,
{
    let mut attempt = 0u32;

    loop {
        if abort.is_aborted() {
            return Err(EnvError::Cancelled);
        }

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if !error.is_retryable() || attempt >= policy.max_retries {
                    return Err(error);
                }

                let delay = compute_backoff_delay(policy, attempt, ctx.random_unit());
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after transient failure"
                );

                cancellable_sleep(ctx, delay, abort).await?;
                attempt += 1;
            }
        }
    }
}
