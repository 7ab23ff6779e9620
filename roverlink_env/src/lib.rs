//! RoverLink Environment Abstraction Layer
//!
//! This crate provides the abstraction allowing the rover communication
//! layer to run against a **Production** clock (tokio) or a seeded
//! **Simulation** clock.
//!
//! # Core Concept
//!
//! Everything the link does that is not deterministic goes through
//! [`RoverContext`]:
//! - Time (`now()`, `sleep()`)
//! - Randomness (`next_u64()` and the helpers built on it)
//!
//! Cancellation is explicit: every suspension point takes an
//! [`AbortSignal`] so an aborted batch can still report how far it got.
//!
//! # Example
//!
//! ```ignore
//! use roverlink_env::{cancellable_sleep, AbortController, RoverContext, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let abort = AbortController::new();
//! cancellable_sleep(ctx.as_ref(), ctx.random_delay(5, 25), &abort.signal()).await?;
//! ```

mod context;
mod error;
mod signal;
mod tokio_impl;
mod types;

pub use context::{cancellable_sleep, RoverContext};
pub use error::EnvError;
pub use signal::{AbortController, AbortSignal};
pub use tokio_impl::TokioContext;
pub use types::CommandId;
