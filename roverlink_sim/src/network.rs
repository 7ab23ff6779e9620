//! Simulated rover link with fault injection.

use crate::session::SessionRegistry;
use async_trait::async_trait;
use roverlink_core::{
    command_for, parse_instructions, CommandResponse, ConnectionState, Grid, Instruction,
    Orientation, Position, Rover, RoverLink, Session,
};
use roverlink_env::{cancellable_sleep, AbortSignal, CommandId, EnvError, RoverContext};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Consecutive command failures before a session turns Unstable.
pub const DEFAULT_UNSTABLE_THRESHOLD: u32 = 3;

/// Fault-injection settings for a simulated link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// Lower bound of the per-operation delay (ms)
    pub min_latency_ms: u64,

    /// Upper bound of the per-operation delay (ms)
    pub max_latency_ms: u64,

    /// Probability a connect attempt drops (0.0 - 1.0)
    pub connect_failure_rate: f64,

    /// Probability a single command fails (0.0 - 1.0)
    pub command_failure_rate: f64,

    /// Probability, per instruction, that the whole batch call fails with a
    /// network error (0.0 - 1.0)
    pub link_drop_rate: f64,

    /// Consecutive command failures before Unstable
    pub unstable_threshold: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            min_latency_ms: 5,
            max_latency_ms: 25,
            connect_failure_rate: 0.0,
            command_failure_rate: 0.0,
            link_drop_rate: 0.0,
            unstable_threshold: DEFAULT_UNSTABLE_THRESHOLD,
        }
    }
}

impl LinkConfig {
    /// A link with no delay and no faults.
    pub fn ideal() -> Self {
        Self {
            min_latency_ms: 0,
            max_latency_ms: 0,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_latency_ms = min_ms;
        self.max_latency_ms = max_ms.max(min_ms);
        self
    }

    pub fn with_connect_failure_rate(mut self, rate: f64) -> Self {
        self.connect_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_command_failure_rate(mut self, rate: f64) -> Self {
        self.command_failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_link_drop_rate(mut self, rate: f64) -> Self {
        self.link_drop_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_unstable_threshold(mut self, threshold: u32) -> Self {
        self.unstable_threshold = threshold.max(1);
        self
    }
}

/// The simulated communication service.
///
/// Holds the session registry and executes command batches against it,
/// injecting delay and failures drawn from the context RNG.
pub struct SimLink<Ctx: RoverContext> {
    context: Arc<Ctx>,

    registry: SessionRegistry,

    /// Fault settings, adjustable while running
    config: Mutex<LinkConfig>,

    /// Runs between the state check and the commit of each instruction
    #[cfg(test)]
    before_commit: Mutex<Option<Box<dyn Fn(&SessionRegistry) + Send + Sync>>>,
}

/// How one instruction of a batch ended.
enum Step {
    Continue,
    Halt,
}

impl<Ctx: RoverContext> SimLink<Ctx> {
    pub fn new(context: Arc<Ctx>, config: LinkConfig) -> Self {
        Self {
            context,
            registry: SessionRegistry::new(),
            config: Mutex::new(config),
            #[cfg(test)]
            before_commit: Mutex::new(None),
        }
    }

    /// Creates an Arc-wrapped link for sharing across tasks.
    pub fn shared(context: Arc<Ctx>, config: LinkConfig) -> Arc<Self> {
        Arc::new(Self::new(context, config))
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Current fault settings.
    pub fn config(&self) -> LinkConfig {
        self.settings().clone()
    }

    /// Sets the per-operation delay range.
    pub fn set_latency(&self, min_ms: u64, max_ms: u64) {
        let mut config = self.settings();
        config.min_latency_ms = min_ms;
        config.max_latency_ms = max_ms.max(min_ms);
    }

    pub fn set_connect_failure_rate(&self, rate: f64) {
        self.settings().connect_failure_rate = rate.clamp(0.0, 1.0);
    }

    pub fn set_command_failure_rate(&self, rate: f64) {
        self.settings().command_failure_rate = rate.clamp(0.0, 1.0);
    }

    pub fn set_link_drop_rate(&self, rate: f64) {
        self.settings().link_drop_rate = rate.clamp(0.0, 1.0);
    }

    fn settings(&self) -> MutexGuard<'_, LinkConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_command_id(&self) -> CommandId {
        CommandId::from_seed(self.context.next_u64())
    }

    async fn simulate_delay(&self, abort: &AbortSignal) -> Result<(), EnvError> {
        let (min, max) = {
            let config = self.settings();
            (config.min_latency_ms, config.max_latency_ms)
        };
        let delay = self.context.random_delay(min, max);
        cancellable_sleep(self.context.as_ref(), delay, abort).await
    }

    /// Applies one instruction to the session and commits the result.
    fn apply_instruction(
        &self,
        rover_id: &str,
        session: &Session,
        instruction: Instruction,
        grid: &Grid,
    ) -> Result<Rover, EnvError> {
        let mut rover = session.rover();
        let outcome = command_for(instruction).execute(&mut rover, grid);
        debug!(rover_id, %instruction, ?outcome, "Instruction applied");

        #[cfg(test)]
        {
            let hook = self.before_commit.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(hook) = hook.as_ref() {
                hook(&self.registry);
            }
        }

        let now = self.context.now_ms();
        self.registry
            .update(rover_id, |s| s.record_success(&rover, now))
            .ok_or_else(|| {
                EnvError::CommandExecution(format!("Session for {rover_id} vanished mid-command"))
            })?;
        Ok(rover)
    }

    /// Runs one instruction of a batch, appending its response.
    async fn run_step(
        &self,
        rover_id: &str,
        instruction: Instruction,
        grid: &Grid,
        abort: &AbortSignal,
        responses: &mut Vec<CommandResponse>,
    ) -> Result<Step, EnvError> {
        let command_id = self.next_command_id();
        let sent_at = self.context.now_ms();

        if let Err(err) = self.simulate_delay(abort).await {
            debug_assert!(err.is_cancelled());
            info!(rover_id, %command_id, "Batch cancelled");
            responses.push(CommandResponse::timed_out(
                command_id,
                rover_id,
                instruction,
                sent_at,
                self.context.now_ms(),
            ));
            return Ok(Step::Halt);
        }

        let config = self.config();
        if self.context.chance(config.link_drop_rate) {
            warn!(rover_id, %command_id, "Link dropped mid-batch");
            return Err(EnvError::network(format!(
                "Link to {rover_id} dropped after {} instruction(s)",
                responses.len()
            )));
        }

        let session = match self.registry.get(rover_id) {
            Some(s) if s.connection_state != ConnectionState::Connected => {
                Err(format!("Connection state is {:?}", s.connection_state))
            }
            Some(s) if !grid.is_valid_position(s.position) => {
                Err(format!("Rover position {} is outside the grid", s.position))
            }
            Some(s) => Ok(s),
            None => Err("Rover not connected".to_string()),
        };
        let session = match session {
            Ok(session) => session,
            Err(reason) => {
                warn!(rover_id, %reason, "Command refused");
                responses.push(CommandResponse::failed(
                    command_id,
                    rover_id,
                    Some(instruction),
                    reason,
                    sent_at,
                    self.context.now_ms(),
                ));
                return Ok(Step::Halt);
            }
        };

        if self.context.chance(config.command_failure_rate) {
            let now = self.context.now_ms();
            let state = self
                .registry
                .update(rover_id, |s| s.record_failure(config.unstable_threshold, now));
            warn!(rover_id, %command_id, ?state, "Simulated command failure");
            responses.push(CommandResponse::failed(
                command_id,
                rover_id,
                Some(instruction),
                "Simulated command failure",
                sent_at,
                now,
            ));
            return Ok(Step::Continue);
        }

        match self.apply_instruction(rover_id, &session, instruction, grid) {
            Ok(rover) => {
                responses.push(CommandResponse::executed(
                    command_id,
                    rover_id,
                    instruction,
                    &rover,
                    sent_at,
                    self.context.now_ms(),
                ));
                if rover.is_lost() {
                    let Position { x, y } = rover.position();
                    info!(rover_id, x, y, "Rover lost, halting batch");
                    return Ok(Step::Halt);
                }
                Ok(Step::Continue)
            }
            Err(err) => {
                warn!(rover_id, %command_id, error = %err, "Command execution failed");
                responses.push(CommandResponse::failed(
                    command_id,
                    rover_id,
                    Some(instruction),
                    err.to_string(),
                    sent_at,
                    self.context.now_ms(),
                ));
                Ok(Step::Continue)
            }
        }
    }
}

#[async_trait]
impl<Ctx: RoverContext> RoverLink for SimLink<Ctx> {
    async fn connect(
        &self,
        rover_id: &str,
        position: Position,
        orientation: Orientation,
        abort: &AbortSignal,
    ) -> Result<bool, EnvError> {
        self.simulate_delay(abort).await?;

        if self.context.chance(self.settings().connect_failure_rate) {
            warn!(rover_id, "Simulated connection failure");
            return Ok(false);
        }

        let session = Session::connected(rover_id, position, orientation, self.context.now_ms());
        if self.registry.insert(session).is_some() {
            debug!(rover_id, "Existing session replaced");
        }
        info!(rover_id, x = position.x, y = position.y, %orientation, "Rover connected");
        Ok(true)
    }

    async fn disconnect(&self, rover_id: &str, abort: &AbortSignal) -> Result<(), EnvError> {
        self.simulate_delay(abort).await?;
        if self.registry.remove(rover_id).is_some() {
            info!(rover_id, "Rover disconnected");
        }
        Ok(())
    }

    async fn ping(&self, rover_id: &str, abort: &AbortSignal) -> Result<bool, EnvError> {
        self.simulate_delay(abort).await?;
        Ok(self.registry.connection_state(rover_id) == ConnectionState::Connected)
    }

    async fn send_command_batch(
        &self,
        rover_id: &str,
        instructions: &str,
        grid: &Grid,
        abort: &AbortSignal,
    ) -> Result<Vec<CommandResponse>, EnvError> {
        let steps = parse_instructions(instructions)?;
        let _batch = self.registry.batch_guard(rover_id).await;

        if !self.registry.contains(rover_id) {
            let now = self.context.now_ms();
            return Ok(vec![CommandResponse::failed(
                self.next_command_id(),
                rover_id,
                None,
                "Rover not connected",
                now,
                now,
            )]);
        }

        debug!(rover_id, count = steps.len(), "Sending command batch");
        let mut responses = Vec::with_capacity(steps.len());
        for instruction in steps {
            match self.run_step(rover_id, instruction, grid, abort, &mut responses).await? {
                Step::Continue => {}
                Step::Halt => break,
            }
        }
        Ok(responses)
    }

    fn session(&self, rover_id: &str) -> Option<Session> {
        self.registry.get(rover_id)
    }
}
