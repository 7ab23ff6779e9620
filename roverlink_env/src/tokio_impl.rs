//! Production implementation of RoverContext using Tokio.

use crate::RoverContext;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Production context backed by Tokio and the thread-local RNG.
///
/// Time comes from the system clock, so simulated link delays really
/// suspend the calling task.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoverContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn next_u64(&self) -> u64 {
        rand::thread_rng().gen()
    }

    fn seed(&self) -> u64 {
        // Production is not seeded
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cancellable_sleep, AbortController, EnvError};

    #[tokio::test]
    async fn test_tokio_context_time() {
        let ctx = TokioContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert!(t2 - t1 >= Duration::from_millis(10));
    }

    #[test]
    fn test_tokio_context_seed() {
        let ctx = TokioContext::new();
        assert_eq!(ctx.seed(), 0);
    }

    #[test]
    fn test_random_helpers_stay_in_range() {
        let ctx = TokioContext::new();
        for _ in 0..1000 {
            let u = ctx.random_unit();
            assert!((0.0..1.0).contains(&u));

            let d = ctx.random_delay(5, 25);
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(25));
        }
        assert!(!ctx.chance(0.0));
        assert!(ctx.chance(1.0));
        assert_eq!(ctx.random_delay(30, 10), Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_cancellable_sleep_interrupted() {
        let ctx = TokioContext::new();
        let controller = AbortController::new();
        let signal = controller.signal();

        let handle = tokio::spawn(async move {
            cancellable_sleep(&ctx, Duration::from_secs(10), &signal).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.abort();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sleep should be interrupted")
            .expect("task should not panic");
        assert_eq!(result, Err(EnvError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancellable_sleep_completes() {
        let ctx = TokioContext::new();
        let signal = AbortController::new().signal();
        let result = cancellable_sleep(&ctx, Duration::from_millis(5), &signal).await;
        assert!(result.is_ok());
    }
}
