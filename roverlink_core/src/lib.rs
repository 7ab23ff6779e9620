//! RoverLink Core - grid, rover state machine and remote-command contract
//!
//! This library models rovers driving on a bounded grid:
//! 1. **Grid & Scent**: fixed bounds plus a grow-only set of cells rovers were lost from
//! 2. **Rover**: position/orientation state machine that freezes once lost
//! 3. **Motion**: stateless turn/move commands with an injected boundary policy
//! 4. **Link**: the async contract a communication layer implements to drive
//!    rovers remotely, with sessions and per-instruction responses

pub mod link;
pub mod rover_grid;
pub mod rover_motion;
pub mod rover_state;
pub mod rover_text;
pub mod validation;

// Re-export key types for convenience
pub use link::{CommandResponse, CommandStatus, ConnectionState, RoverLink, Session};
pub use rover_grid::{Grid, Position};
pub use rover_motion::{
    command_for, drive, Command, CommandOutcome, Instruction, MoveForward, MovementPolicy,
    ScentPolicy, TurnLeft, TurnRight,
};
pub use rover_state::{Orientation, Rover, RoverStatus};
pub use rover_text::{
    format_report, parse_grid_line, parse_instructions, parse_mission, parse_report,
    parse_rover_line, MissionInput, RoverPlan, RoverReport,
};
pub use validation::{ValidationError, MAX_GRID_COORDINATE, MAX_INSTRUCTION_LENGTH};
