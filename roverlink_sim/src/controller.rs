//! Resilient controller: retry-wrapped access to a [`RoverLink`].

use crate::retry::{retry_async, RetryPolicy};
use roverlink_core::{
    parse_instructions, CommandResponse, Grid, Orientation, Position, RoverLink, Session,
};
use roverlink_env::{AbortSignal, CommandId, EnvError, RoverContext};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Drives rovers through a link, masking transient failures with a
/// [`RetryPolicy`].
///
/// Validation problems are reported immediately and never retried.
/// Cancellation always surfaces as `EnvError::Cancelled`.
pub struct ResilientController<L: RoverLink, Ctx: RoverContext> {
    link: Arc<L>,
    context: Arc<Ctx>,
    policy: RetryPolicy,
}

impl<L: RoverLink, Ctx: RoverContext> ResilientController<L, Ctx> {
    pub fn new(link: Arc<L>, context: Arc<Ctx>, policy: RetryPolicy) -> Self {
        Self {
            link,
            context,
            policy,
        }
    }

    pub fn link(&self) -> &Arc<L> {
        &self.link
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Connects a rover, retrying dropped attempts.
    ///
    /// The start position is checked against `grid` before the first attempt.
    ///
    /// # Errors
    /// * `EnvError::Validation` - empty id or start position off the grid
    /// * `EnvError::Connection` - every attempt dropped
    /// * `EnvError::Cancelled` - `abort` fired
    pub async fn connect_rover(
        &self,
        rover_id: &str,
        position: Position,
        orientation: Orientation,
        grid: &Grid,
        abort: &AbortSignal,
    ) -> Result<bool, EnvError> {
        require_id(rover_id)?;
        grid.validate_initial_position(position)?;
        let link = self.link.as_ref();

        retry_async(self.context.as_ref(), &self.policy, abort, || async move {
            if link.connect(rover_id, position, orientation, abort).await? {
                Ok(true)
            } else {
                Err(EnvError::connection(format!("Failed to connect to {rover_id}")))
            }
        })
        .instrument(info_span!("connect_rover", rover_id))
        .await
    }

    /// Sends `instructions` as one batch, retrying the whole batch on
    /// transient errors.
    ///
    /// A retried batch starts again from the session's current state, so
    /// instructions committed before a dropped link are not replayed from
    /// the starting position.
    ///
    /// # Errors
    /// * `EnvError::Validation` - empty id, empty or malformed instructions
    /// * `EnvError::Cancelled` - `abort` fired
    ///
    /// Any other exhausted failure is folded into a single Failed response.
    pub async fn execute_instruction_sequence(
        &self,
        rover_id: &str,
        instructions: &str,
        grid: &Grid,
        abort: &AbortSignal,
    ) -> Result<Vec<CommandResponse>, EnvError> {
        require_id(rover_id)?;
        if instructions.trim().is_empty() {
            return Err(EnvError::validation("Instructions cannot be empty"));
        }
        parse_instructions(instructions)?;

        let link = self.link.as_ref();
        let result = retry_async(self.context.as_ref(), &self.policy, abort, || {
            link.send_command_batch(rover_id, instructions, grid, abort)
        })
        .instrument(info_span!("execute_instruction_sequence", rover_id))
        .await;

        match result {
            Ok(responses) => Ok(responses),
            Err(err) if err.is_cancelled() => Err(err),
            Err(EnvError::Validation(msg)) => Err(EnvError::Validation(msg)),
            Err(err) => {
                warn!(rover_id, error = %err, "Instruction sequence failed after retries");
                let now = self.context.now_ms();
                Ok(vec![CommandResponse::failed(
                    CommandId::from_seed(self.context.next_u64()),
                    rover_id,
                    None,
                    err.to_string(),
                    now,
                    now,
                )])
            }
        }
    }

    /// True iff the rover answers as Connected. Never fails.
    pub async fn health_check_rover(&self, rover_id: &str, abort: &AbortSignal) -> bool {
        let link = self.link.as_ref();
        let result = retry_async(self.context.as_ref(), &self.policy, abort, || {
            link.ping(rover_id, abort)
        })
        .await;

        match result {
            Ok(healthy) => healthy,
            Err(err) => {
                warn!(rover_id, error = %err, "Health check failed");
                false
            }
        }
    }

    /// Closes the rover's session.
    pub async fn disconnect_rover(
        &self,
        rover_id: &str,
        abort: &AbortSignal,
    ) -> Result<(), EnvError> {
        require_id(rover_id)?;
        let link = self.link.as_ref();
        retry_async(self.context.as_ref(), &self.policy, abort, || {
            link.disconnect(rover_id, abort)
        })
        .await?;
        info!(rover_id, "Rover released");
        Ok(())
    }

    /// Current session snapshot, if connected.
    pub fn rover_status(&self, rover_id: &str) -> Option<Session> {
        self.link.session(rover_id)
    }
}

fn require_id(rover_id: &str) -> Result<(), EnvError> {
    if rover_id.trim().is_empty() {
        Err(EnvError::validation("Rover id cannot be empty"))
    } else {
        Ok(())
    }
}
