//! Remote-command contract between controllers and rovers.
//!
//! # Batch flow
//!
//! ```text
//! Controller                   RoverLink                      Session
//!   |                             |                              |
//!   |-- send_command_batch ------>|                              |
//!   |                             |-- [delay] -- state check --->|
//!   |                             |-- [failure roll] ----------->|  counter++ / Unstable
//!   |                             |-- apply command ------------>|  commit state
//!   |<-- Vec<CommandResponse> ----|                              |
//! ```

use crate::rover_grid::{Grid, Position};
use crate::rover_motion::Instruction;
use crate::rover_state::{Orientation, Rover};
use async_trait::async_trait;
use roverlink_env::{AbortSignal, CommandId, EnvError};
use serde::{Deserialize, Serialize};

/// Link state of a rover session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Too many consecutive command failures; commands halt until a success.
    Unstable,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandStatus {
    Executed,
    Failed,
    TimedOut,
}

/// Outcome of one attempted instruction. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub command_id: CommandId,
    pub rover_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<Instruction>,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub is_lost: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Context clock when the instruction was issued (ms)
    pub sent_at_ms: u64,
    /// Context clock when the outcome was known (ms)
    pub completed_at_ms: u64,
}

impl CommandResponse {
    /// A successfully applied instruction and the resulting rover state.
    pub fn executed(
        command_id: CommandId,
        rover_id: impl Into<String>,
        instruction: Instruction,
        rover: &Rover,
        sent_at_ms: u64,
        completed_at_ms: u64,
    ) -> Self {
        Self {
            command_id,
            rover_id: rover_id.into(),
            instruction: Some(instruction),
            status: CommandStatus::Executed,
            position: Some(rover.position()),
            orientation: Some(rover.orientation()),
            is_lost: rover.is_lost(),
            error: None,
            sent_at_ms,
            completed_at_ms,
        }
    }

    pub fn failed(
        command_id: CommandId,
        rover_id: impl Into<String>,
        instruction: Option<Instruction>,
        error: impl Into<String>,
        sent_at_ms: u64,
        completed_at_ms: u64,
    ) -> Self {
        Self {
            command_id,
            rover_id: rover_id.into(),
            instruction,
            status: CommandStatus::Failed,
            position: None,
            orientation: None,
            is_lost: false,
            error: Some(error.into()),
            sent_at_ms,
            completed_at_ms,
        }
    }

    pub fn timed_out(
        command_id: CommandId,
        rover_id: impl Into<String>,
        instruction: Instruction,
        sent_at_ms: u64,
        completed_at_ms: u64,
    ) -> Self {
        Self {
            status: CommandStatus::TimedOut,
            error: Some("Operation cancelled".to_string()),
            ..Self::failed(command_id, rover_id, Some(instruction), "", sent_at_ms, completed_at_ms)
        }
    }

    pub fn is_executed(&self) -> bool {
        self.status == CommandStatus::Executed
    }
}

/// The link's record of a connected rover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub rover_id: String,
    pub position: Position,
    pub orientation: Orientation,
    pub is_lost: bool,
    pub connection_state: ConnectionState,
    /// Context clock of the last exchange (ms)
    pub last_communication_ms: u64,
    pub consecutive_failures: u32,
}

impl Session {
    /// A freshly connected session.
    pub fn connected(
        rover_id: impl Into<String>,
        position: Position,
        orientation: Orientation,
        now_ms: u64,
    ) -> Self {
        Self {
            rover_id: rover_id.into(),
            position,
            orientation,
            is_lost: false,
            connection_state: ConnectionState::Connected,
            last_communication_ms: now_ms,
            consecutive_failures: 0,
        }
    }

    /// Transient rover seeded from this session.
    pub fn rover(&self) -> Rover {
        Rover::restore(self.position, self.orientation, self.is_lost)
    }

    /// Records a simulated command failure. Returns the resulting state.
    ///
    /// Reaching `unstable_threshold` consecutive failures moves a
    /// Connected session to Unstable.
    pub fn record_failure(&mut self, unstable_threshold: u32, now_ms: u64) -> ConnectionState {
        self.consecutive_failures += 1;
        self.last_communication_ms = now_ms;
        if self.consecutive_failures >= unstable_threshold
            && self.connection_state == ConnectionState::Connected
        {
            self.connection_state = ConnectionState::Unstable;
        }
        self.connection_state
    }

    /// Commits a successfully applied command.
    pub fn record_success(&mut self, rover: &Rover, now_ms: u64) {
        self.position = rover.position();
        self.orientation = rover.orientation();
        self.is_lost = rover.is_lost();
        self.consecutive_failures = 0;
        self.connection_state = ConnectionState::Connected;
        self.last_communication_ms = now_ms;
    }
}

/// Remote control channel to a set of rovers.
///
/// Every operation may suspend on the (simulated) network and observes
/// `abort` at each suspension point.
#[async_trait]
pub trait RoverLink: Send + Sync + 'static {
    /// Opens a session at the given state.
    ///
    /// # Returns
    /// * `Ok(true)` - session created (an existing one for `rover_id` is replaced)
    /// * `Ok(false)` - the connection attempt dropped; no session
    async fn connect(
        &self,
        rover_id: &str,
        position: Position,
        orientation: Orientation,
        abort: &AbortSignal,
    ) -> Result<bool, EnvError>;

    /// Closes a session. Absent sessions are not an error.
    async fn disconnect(&self, rover_id: &str, abort: &AbortSignal) -> Result<(), EnvError>;

    /// True iff a session exists and is Connected.
    async fn ping(&self, rover_id: &str, abort: &AbortSignal) -> Result<bool, EnvError>;

    /// Executes `instructions` in order against the session.
    ///
    /// One response per attempted instruction; the list stops early on a
    /// halting condition, so it may be shorter than `instructions`.
    ///
    /// # Errors
    /// * `EnvError::Validation` - bad alphabet or length, before any network activity
    async fn send_command_batch(
        &self,
        rover_id: &str,
        instructions: &str,
        grid: &Grid,
        abort: &AbortSignal,
    ) -> Result<Vec<CommandResponse>, EnvError>;

    /// Snapshot of a session, if connected.
    fn session(&self, rover_id: &str) -> Option<Session>;
}
