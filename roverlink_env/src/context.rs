//! Core environment context trait for RoverLink services.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::EnvError;
use crate::signal::AbortSignal;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the "real world" so that the rover communication
/// layer can run against a real clock (tokio) or a seeded virtual clock.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, thread RNG
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// For simulation runs, every source of non-determinism the link uses
/// (network delay, injected failures, backoff jitter, command ids) is drawn
/// from this trait, so a seed reproduces a run.
#[async_trait]
pub trait RoverContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for session timestamps and response timing.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);

    /// Draws the next raw 64-bit random value.
    fn next_u64(&self) -> u64;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;

    /// Uniform sample in `[0, 1)`.
    fn random_unit(&self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Returns true with the given probability (clamped to `[0, 1]`).
    fn chance(&self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.random_unit() < probability
    }

    /// Uniform duration between `min` and `max` inclusive (milliseconds).
    fn random_delay(&self, min_ms: u64, max_ms: u64) -> Duration {
        if max_ms <= min_ms {
            return Duration::from_millis(min_ms);
        }
        let span = max_ms - min_ms + 1;
        Duration::from_millis(min_ms + self.next_u64() % span)
    }

    /// Milliseconds since context creation, for timestamps.
    fn now_ms(&self) -> u64 {
        self.now().as_millis() as u64
    }
}

/// Sleeps on the context clock unless the signal fires first.
///
/// Returns `EnvError::Cancelled` if the signal was already raised or is
/// raised while sleeping.
pub async fn cancellable_sleep<Ctx>(
    ctx: &Ctx,
    duration: Duration,
    abort: &AbortSignal,
) -> Result<(), EnvError>
where
    Ctx: RoverContext + ?Sized,
{
    if abort.is_aborted() {
        return Err(EnvError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = abort.aborted() => Err(EnvError::Cancelled),
        _ = ctx.sleep(duration) => Ok(()),
    }
}
