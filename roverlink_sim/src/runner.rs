//! Scenario runner - executes missions against the simulated link and
//! checks the results.

use crate::config::SimConfig;
use crate::context::SimContext;
use crate::controller::ResilientController;
use crate::mission::{run_mission, MissionReport};
use crate::network::SimLink;
use crate::scenarios::ScenarioId;

use roverlink_core::{parse_mission, CommandStatus, MissionInput};
use roverlink_env::{AbortSignal, EnvError, RoverContext, TokioContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Result lines, one per rover
    pub lines: Vec<String>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Full mission outcome
    pub report: MissionReport,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub rovers: usize,

    /// Responses per status
    pub commands_executed: usize,
    pub commands_failed: usize,
    pub commands_timed_out: usize,

    pub rovers_lost: usize,

    /// Rovers that could not be driven at all
    pub rover_errors: usize,

    pub scents: usize,

    /// Context clock at the end of the run (ms)
    pub elapsed_ms: u64,
}

impl ScenarioMetrics {
    pub fn from_report(report: &MissionReport, elapsed_ms: u64) -> Self {
        Self {
            rovers: report.outcomes.len(),
            commands_executed: report.executed_count(),
            commands_failed: report.failed_count(),
            commands_timed_out: report.timed_out_count(),
            rovers_lost: report.lost_count(),
            rover_errors: report.error_count(),
            scents: report.scents.len(),
            elapsed_ms,
        }
    }
}

/// Runs a parsed mission on a fresh simulated link.
///
/// With `real_time` the link sleeps on the tokio clock; otherwise on a
/// seeded virtual clock. Returns the report and the elapsed context time.
pub async fn simulate(
    config: &SimConfig,
    mission: &MissionInput,
    real_time: bool,
    abort: &AbortSignal,
) -> Result<(MissionReport, u64), EnvError> {
    if real_time {
        simulate_with(TokioContext::shared(), config, mission, abort).await
    } else {
        simulate_with(SimContext::shared(config.seed), config, mission, abort).await
    }
}

async fn simulate_with<Ctx: RoverContext>(
    context: Arc<Ctx>,
    config: &SimConfig,
    mission: &MissionInput,
    abort: &AbortSignal,
) -> Result<(MissionReport, u64), EnvError> {
    let start = context.now_ms();
    let link = SimLink::shared(Arc::clone(&context), config.link.clone());
    let controller = ResilientController::new(link, Arc::clone(&context), config.retry.clone());
    let report = run_mission(&controller, mission, abort).await?;
    Ok((report, context.now_ms().saturating_sub(start)))
}

/// Runs built-in scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Sleep on the tokio clock instead of the virtual one
    real_time: bool,

    /// Base configuration; each scenario supplies its own fault rates
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            real_time: false,
            config: SimConfig::new(seed),
        }
    }

    pub fn with_real_time(mut self, real_time: bool) -> Self {
        self.real_time = real_time;
        self
    }

    /// Base configuration. Scenarios keep its latency and retry policy but
    /// bring their own fault rates.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config.with_seed(self.seed);
        self
    }

    /// Runs a scenario and returns the result.
    pub async fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!(scenario = scenario.name(), seed = self.seed, "Starting scenario");

        let link = scenario
            .link_config()
            .with_latency(self.config.link.min_latency_ms, self.config.link.max_latency_ms);
        let config = self.config.clone().with_link(link);
        let outcome = match parse_mission(scenario.mission()) {
            Ok(mission) => simulate(&config, &mission, self.real_time, &AbortSignal::never())
                .await
                .map(|(report, elapsed)| (mission, report, elapsed))
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let (mission, report, elapsed_ms) = match outcome {
            Ok(done) => done,
            Err(reason) => {
                return ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    lines: Vec::new(),
                    failure_reason: Some(reason),
                    metrics: ScenarioMetrics::default(),
                    report: MissionReport::default(),
                }
            }
        };

        let failure_reason = verify(scenario, &config, &mission, &report).err();
        let metrics = ScenarioMetrics::from_report(&report, elapsed_ms);
        debug!(?metrics, "Scenario metrics");

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            lines: report.lines(),
            failure_reason,
            metrics,
            report,
        }
    }
}

/// Checks a finished mission against the scenario's expectations.
fn verify(
    scenario: ScenarioId,
    config: &SimConfig,
    mission: &MissionInput,
    report: &MissionReport,
) -> Result<(), String> {
    if let Some(expected) = scenario.expected_lines() {
        let lines = report.lines();
        if lines != expected {
            return Err(format!("Expected {:?}, got {:?}", expected, lines));
        }
    }

    check_batch_rules(mission, report)?;

    if scenario == ScenarioId::Blackout {
        let halt_after = config.link.unstable_threshold as usize + 1;
        for outcome in &report.outcomes {
            let all_failed = outcome
                .responses
                .iter()
                .all(|r| r.status == CommandStatus::Failed);
            if outcome.responses.len() != halt_after || !all_failed {
                return Err(format!(
                    "{}: expected {} failed responses, got {:?}",
                    outcome.rover_id,
                    halt_after,
                    outcome.responses.iter().map(|r| r.status).collect::<Vec<_>>()
                ));
            }
        }
    }

    Ok(())
}

/// Structural checks that hold for any seed and fault rate.
fn check_batch_rules(mission: &MissionInput, report: &MissionReport) -> Result<(), String> {
    for (plan, outcome) in mission.rovers.iter().zip(&report.outcomes) {
        let id = &outcome.rover_id;
        let responses = &outcome.responses;

        if responses.len() > plan.instructions.trim().len().max(1) {
            return Err(format!("{id}: {} responses for {:?}", responses.len(), plan.instructions));
        }

        for (i, response) in responses.iter().enumerate() {
            let is_last = i + 1 == responses.len();
            let halts = response.is_lost
                || response.status == CommandStatus::TimedOut
                || response.error.as_deref().is_some_and(is_refusal);
            if halts && !is_last {
                return Err(format!("{id}: response {} should have ended the batch", i + 1));
            }
        }

        if let Some(report) = outcome.report {
            if report.lost && !mission.grid.has_scent(report.position) {
                return Err(format!("{id}: lost at {} without scent", report.position));
            }
            let last_executed = responses.iter().rev().find(|r| r.is_executed());
            if let Some(last) = last_executed {
                if last.is_lost != report.lost || last.position != Some(report.position) {
                    return Err(format!("{id}: final state {report} disagrees with responses"));
                }
            }
        }
    }
    Ok(())
}

/// Errors the link reports when it refuses an instruction, which end a batch.
fn is_refusal(error: &str) -> bool {
    error.starts_with("Connection state")
        || error == "Rover not connected"
        || error.ends_with("is outside the grid")
}
