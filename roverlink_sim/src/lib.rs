//! RoverLink simulation harness
//!
//! Runs rover missions over a simulated, fault-injecting communication
//! link and checks the results.
//!
//! # Core Principle
//!
//! Every source of non-determinism goes through a [`RoverContext`]:
//! - **Time**: link delays and retry backoff sleep on the context clock,
//!   which [`SimContext`] advances virtually
//! - **Randomness**: delays, injected failures and jitter all draw from
//!   one seeded RNG
//!
//! One seed therefore reproduces a whole mission, faults included.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  run_mission (parse → connect → execute → disconnect)  │
//! │       │                                                │
//! │  ┌────▼────────────────┐   retry_async + RetryPolicy   │
//! │  │ ResilientController │──────────────────────────┐    │
//! │  └────┬────────────────┘                          │    │
//! │       │ RoverLink                                 │    │
//! │  ┌────▼────┐   SessionRegistry   ┌────────────┐   │    │
//! │  │ SimLink │────────────────────►│  Sessions  │   │    │
//! │  └────┬────┘                     └────────────┘   │    │
//! │       │ delay / faults / RNG                      │    │
//! │  ┌────▼───────────────────────────────────────────▼─┐  │
//! │  │        SimContext (virtual clock + ChaCha8)      │  │
//! │  └──────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use roverlink_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Classic).await;
//! assert_eq!(result.lines, ["1 1 E", "3 3 N LOST", "2 3 S"]);
//! ```
//!
//! [`RoverContext`]: roverlink_env::RoverContext

mod config;
mod context;
mod controller;
mod exporter;
mod mission;
mod network;
mod retry;
mod runner;
mod session;
pub mod scenarios;

pub use config::SimConfig;
pub use context::SimContext;
pub use controller::ResilientController;
pub use exporter::{ExportError, MissionExport};
pub use mission::{rover_id, run_mission, MissionReport, RoverOutcome};
pub use network::{LinkConfig, SimLink, DEFAULT_UNSTABLE_THRESHOLD};
pub use retry::{compute_backoff_delay, retry_async, RetryPolicy};
pub use runner::{simulate, ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use session::{BatchGuard, SessionRegistry};
