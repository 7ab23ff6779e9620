//! Mission driver: runs every rover of a parsed mission through a
//! controller and collects the result lines.
//!
//! Rovers run one after another in input order on the same grid, so a
//! scent left by an earlier rover protects every later one.

use crate::controller::ResilientController;
use roverlink_core::{
    CommandResponse, CommandStatus, MissionInput, Position, RoverLink, RoverPlan, RoverReport,
};
use roverlink_env::{AbortSignal, EnvError, RoverContext};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What happened to one rover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoverOutcome {
    pub rover_id: String,

    /// Final state, absent when the rover never connected
    pub report: Option<RoverReport>,

    pub responses: Vec<CommandResponse>,

    /// Why the rover could not be driven
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoverOutcome {
    fn failed(rover_id: String, error: impl std::fmt::Display) -> Self {
        Self {
            rover_id,
            report: None,
            responses: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Result line for this rover.
    pub fn line(&self) -> String {
        match (&self.report, &self.error) {
            (Some(report), _) => report.to_string(),
            (None, Some(error)) => format!("ERROR {}: {}", self.rover_id, error),
            (None, None) => format!("ERROR {}", self.rover_id),
        }
    }

    pub fn is_lost(&self) -> bool {
        self.report.map(|r| r.lost).unwrap_or(false)
    }
}

/// Outcome of a whole mission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionReport {
    pub outcomes: Vec<RoverOutcome>,

    /// Scented cells at the end of the mission, sorted
    pub scents: Vec<Position>,
}

impl MissionReport {
    /// One result line per rover, in input order.
    pub fn lines(&self) -> Vec<String> {
        self.outcomes.iter().map(RoverOutcome::line).collect()
    }

    pub fn lost_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_lost()).count()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }

    fn count_status(&self, status: CommandStatus) -> usize {
        self.outcomes
            .iter()
            .flat_map(|o| &o.responses)
            .filter(|r| r.status == status)
            .count()
    }

    pub fn executed_count(&self) -> usize {
        self.count_status(CommandStatus::Executed)
    }

    pub fn failed_count(&self) -> usize {
        self.count_status(CommandStatus::Failed)
    }

    pub fn timed_out_count(&self) -> usize {
        self.count_status(CommandStatus::TimedOut)
    }
}

/// Id assigned to the `index`-th rover (0-based) of a mission.
pub fn rover_id(index: usize) -> String {
    format!("rover-{}", index + 1)
}

/// Runs a mission to completion.
///
/// A rover that fails validation or cannot be connected is recorded with
/// an error and the mission moves on.
///
/// # Errors
/// * `EnvError::Cancelled` - `abort` fired; rovers already finished are discarded
pub async fn run_mission<L: RoverLink, Ctx: RoverContext>(
    controller: &ResilientController<L, Ctx>,
    mission: &MissionInput,
    abort: &AbortSignal,
) -> Result<MissionReport, EnvError> {
    info!(
        rovers = mission.rovers.len(),
        max_x = mission.grid.max_x(),
        max_y = mission.grid.max_y(),
        "Starting mission"
    );

    let mut report = MissionReport::default();
    for (index, plan) in mission.rovers.iter().enumerate() {
        let outcome = run_rover(controller, mission, rover_id(index), plan, abort).await?;
        report.outcomes.push(outcome);
    }
    report.scents = mission.grid.scented_positions();

    info!(
        lost = report.lost_count(),
        errors = report.error_count(),
        scents = report.scents.len(),
        "Mission complete"
    );
    Ok(report)
}

async fn run_rover<L: RoverLink, Ctx: RoverContext>(
    controller: &ResilientController<L, Ctx>,
    mission: &MissionInput,
    rover_id: String,
    plan: &RoverPlan,
    abort: &AbortSignal,
) -> Result<RoverOutcome, EnvError> {
    match controller
        .connect_rover(&rover_id, plan.position, plan.orientation, &mission.grid, abort)
        .await
    {
        Ok(_) => {}
        Err(EnvError::Cancelled) => return Err(EnvError::Cancelled),
        Err(err) => {
            warn!(rover_id, error = %err, "Rover could not be connected");
            return Ok(RoverOutcome::failed(rover_id, err));
        }
    }

    let responses = if plan.instructions.trim().is_empty() {
        Vec::new()
    } else {
        controller
            .execute_instruction_sequence(&rover_id, &plan.instructions, &mission.grid, abort)
            .await?
    };

    let report = controller
        .rover_status(&rover_id)
        .map(|s| RoverReport::new(s.position, s.orientation, s.is_lost))
        .unwrap_or_else(|| RoverReport::new(plan.position, plan.orientation, false));

    match controller.disconnect_rover(&rover_id, abort).await {
        Ok(()) => {}
        Err(EnvError::Cancelled) => return Err(EnvError::Cancelled),
        Err(err) => warn!(rover_id, error = %err, "Disconnect failed"),
    }

    info!(rover_id, result = %report, "Rover finished");
    Ok(RoverOutcome {
        rover_id,
        report: Some(report),
        responses,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use crate::network::{LinkConfig, SimLink};
    use crate::retry::RetryPolicy;
    use roverlink_core::parse_mission;
    use roverlink_env::AbortController;
    use std::sync::Arc;

    const CLASSIC: &str = "5 3\n1 1 E\nRFRFRFRF\n\n3 2 N\nFRRFLLFFRRFLL\n\n0 3 W\nLLFFFLFLFL\n";

    fn controller(config: LinkConfig) -> ResilientController<SimLink<SimContext>, SimContext> {
        let ctx = SimContext::shared(42);
        let link = SimLink::shared(Arc::clone(&ctx), config);
        ResilientController::new(link, ctx, RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_classic_mission() {
        let mission = parse_mission(CLASSIC).unwrap();
        let controller = controller(LinkConfig::default());
        let report = run_mission(&controller, &mission, &AbortSignal::never()).await.unwrap();

        assert_eq!(report.lines(), vec!["1 1 E", "3 3 N LOST", "2 3 S"]);
        assert_eq!(report.scents, vec![Position::new(3, 3)]);
        assert_eq!(report.lost_count(), 1);
        assert_eq!(report.outcomes[1].responses.len(), 8);
        assert_eq!(report.outcomes[2].rover_id, "rover-3");
    }

    #[tokio::test]
    async fn test_sessions_released() {
        let controller = controller(LinkConfig::ideal());
        let mission = parse_mission(CLASSIC).unwrap();
        run_mission(&controller, &mission, &AbortSignal::never()).await.unwrap();
        assert!(controller.link().registry().is_empty());
    }

    #[tokio::test]
    async fn test_scent_guard_mission() {
        let mission = parse_mission("1 1\n1 1 N\nF\n1 1 N\nF\n").unwrap();
        let report = run_mission(&controller(LinkConfig::ideal()), &mission, &AbortSignal::never())
            .await
            .unwrap();
        assert_eq!(report.lines(), vec!["1 1 N LOST", "1 1 N"]);
    }

    #[tokio::test]
    async fn test_empty_instruction_line() {
        let mission = parse_mission("5 5\n2 2 W\n\n").unwrap();
        let report = run_mission(&controller(LinkConfig::ideal()), &mission, &AbortSignal::never())
            .await
            .unwrap();
        assert_eq!(report.lines(), vec!["2 2 W"]);
        assert!(report.outcomes[0].responses.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_bounds_rover_is_skipped() {
        let mission = parse_mission("2 2\n3 0 N\nF\n1 1 N\nF\n").unwrap();
        let report = run_mission(&controller(LinkConfig::ideal()), &mission, &AbortSignal::never())
            .await
            .unwrap();

        assert_eq!(report.error_count(), 1);
        assert!(report.outcomes[0].report.is_none());
        assert!(report.lines()[0].starts_with("ERROR rover-1: Validation error"));
        assert_eq!(report.lines()[1], "1 2 N");
    }

    #[tokio::test]
    async fn test_unreachable_rovers_do_not_stop_mission() {
        let controller = controller(LinkConfig::ideal().with_connect_failure_rate(1.0));
        let mission = parse_mission(CLASSIC).unwrap();
        let report = run_mission(&controller, &mission, &AbortSignal::never()).await.unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.error_count(), 3);
        assert!(report.outcomes.iter().all(|o| o.responses.is_empty()));
        assert!(report.scents.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_mission() {
        let abort = AbortController::new();
        abort.abort();
        let mission = parse_mission(CLASSIC).unwrap();

        let err = run_mission(&controller(LinkConfig::default()), &mission, &abort.signal())
            .await
            .unwrap_err();
        assert_eq!(err, EnvError::Cancelled);
    }

    #[tokio::test]
    async fn test_report_counters() {
        let controller = controller(LinkConfig::ideal().with_command_failure_rate(1.0));
        let mission = parse_mission("5 5\n1 1 N\nFFFFFF\n").unwrap();
        let report = run_mission(&controller, &mission, &AbortSignal::never()).await.unwrap();

        assert_eq!(report.failed_count(), 4);
        assert_eq!(report.executed_count(), 0);
        assert_eq!(report.timed_out_count(), 0);
        assert_eq!(report.lines(), vec!["1 1 N"]);
    }
}
