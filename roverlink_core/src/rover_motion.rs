//! Commands and the movement policy applied when a rover would leave the grid.
//!
//! # Boundary rule
//!
//! ```text
//! forward move target
//!        │
//!   inside grid? ──yes──► commit move
//!        │ no
//!   scent at current cell? ──yes──► ignore move (rover stays, still active)
//!        │ no
//!   leave scent, mark rover lost (frozen at current cell)
//! ```
//!
//! Scent is keyed by the rover's *current* cell only. It marks a cell as
//! dangerous to leave, whichever edge the move would cross.

use crate::rover_grid::{Grid, Position};
use crate::rover_state::{Orientation, Rover};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One remote instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    Left,
    Right,
    Forward,
}

impl Instruction {
    pub fn code(self) -> char {
        match self {
            Instruction::Left => 'L',
            Instruction::Right => 'R',
            Instruction::Forward => 'F',
        }
    }

    pub fn from_code(code: char) -> Result<Self, ValidationError> {
        match code {
            'L' => Ok(Instruction::Left),
            'R' => Ok(Instruction::Right),
            'F' => Ok(Instruction::Forward),
            other => Err(ValidationError::InvalidInstruction(other)),
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// What a command did to the rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Orientation changed.
    Turned(Orientation),
    /// Forward move committed.
    Moved(Position),
    /// Rover left the grid; it is now lost at this (last valid) cell.
    FellOff(Position),
    /// Move off the grid refused because the cell is scented.
    Guarded(Position),
    /// Rover was already lost; nothing changed.
    Frozen,
}

/// Decides what happens when a forward move would leave the grid.
pub trait MovementPolicy: Send + Sync {
    fn on_boundary(&self, rover: &mut Rover, grid: &Grid) -> CommandOutcome;
}

/// Default policy: the first rover to leave a cell is lost and scents it,
/// later rovers on that cell ignore the move.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScentPolicy;

impl MovementPolicy for ScentPolicy {
    fn on_boundary(&self, rover: &mut Rover, grid: &Grid) -> CommandOutcome {
        let here = rover.position();

        // Insert-if-absent is a single call: two rovers racing on the same
        // cell cannot both be lost.
        if grid.add_scent(here) {
            rover.mark_lost();
            info!(x = here.x, y = here.y, "Rover lost, scent left");
            CommandOutcome::FellOff(here)
        } else {
            debug!(x = here.x, y = here.y, "Move off grid ignored: cell is scented");
            CommandOutcome::Guarded(here)
        }
    }
}

/// A stateless operation on a rover.
pub trait Command: Send + Sync {
    fn execute(&self, rover: &mut Rover, grid: &Grid) -> CommandOutcome;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TurnLeft;

impl Command for TurnLeft {
    fn execute(&self, rover: &mut Rover, _grid: &Grid) -> CommandOutcome {
        if rover.is_lost() {
            return CommandOutcome::Frozen;
        }
        rover.turn_left();
        CommandOutcome::Turned(rover.orientation())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TurnRight;

impl Command for TurnRight {
    fn execute(&self, rover: &mut Rover, _grid: &Grid) -> CommandOutcome {
        if rover.is_lost() {
            return CommandOutcome::Frozen;
        }
        rover.turn_right();
        CommandOutcome::Turned(rover.orientation())
    }
}

/// Forward move with an injected boundary policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveForward<P = ScentPolicy> {
    policy: P,
}

impl<P: MovementPolicy> MoveForward<P> {
    pub const fn new(policy: P) -> Self {
        Self { policy }
    }
}

impl<P: MovementPolicy> Command for MoveForward<P> {
    fn execute(&self, rover: &mut Rover, grid: &Grid) -> CommandOutcome {
        let Some(target) = rover.try_move_forward() else {
            return CommandOutcome::Frozen;
        };

        if grid.is_valid_position(target) {
            rover.update_position(target);
            CommandOutcome::Moved(target)
        } else {
            self.policy.on_boundary(rover, grid)
        }
    }
}

static TURN_LEFT: TurnLeft = TurnLeft;
static TURN_RIGHT: TurnRight = TurnRight;
static MOVE_FORWARD: MoveForward<ScentPolicy> = MoveForward::new(ScentPolicy);

/// Shared command for an instruction (scent policy for forward moves).
pub fn command_for(instruction: Instruction) -> &'static dyn Command {
    match instruction {
        Instruction::Left => &TURN_LEFT,
        Instruction::Right => &TURN_RIGHT,
        Instruction::Forward => &MOVE_FORWARD,
    }
}

/// Applies instructions in order, stopping once the rover is lost.
///
/// Returns the number of instructions applied.
pub fn drive(rover: &mut Rover, grid: &Grid, instructions: &[Instruction]) -> usize {
    let mut applied = 0;
    for instruction in instructions {
        if rover.is_lost() {
            break;
        }
        command_for(*instruction).execute(rover, grid);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rover_text::parse_instructions;
    use proptest::prelude::*;

    fn run(grid: &Grid, x: i32, y: i32, o: Orientation, instructions: &str) -> Rover {
        let mut rover = Rover::deploy(Position::new(x, y), o, grid).unwrap();
        let steps = parse_instructions(instructions).unwrap();
        drive(&mut rover, grid, &steps);
        rover
    }

    #[test]
    fn test_instruction_codes() {
        assert_eq!(Instruction::from_code('L'), Ok(Instruction::Left));
        assert_eq!(Instruction::from_code('R'), Ok(Instruction::Right));
        assert_eq!(Instruction::from_code('F'), Ok(Instruction::Forward));
        assert_eq!(
            Instruction::from_code('f'),
            Err(ValidationError::InvalidInstruction('f'))
        );
    }

    #[test]
    fn test_sample_missions_on_shared_grid() {
        let grid = Grid::new(5, 3).unwrap();

        let a = run(&grid, 1, 1, Orientation::East, "RFRFRFRF");
        assert_eq!(
            (a.position(), a.orientation(), a.is_lost()),
            (Position::new(1, 1), Orientation::East, false)
        );

        let b = run(&grid, 3, 2, Orientation::North, "FRRFLLFFRRFLL");
        assert_eq!(
            (b.position(), b.orientation(), b.is_lost()),
            (Position::new(3, 3), Orientation::North, true)
        );
        assert!(grid.has_scent(Position::new(3, 3)));

        let c = run(&grid, 0, 3, Orientation::West, "LLFFFLFLFL");
        assert_eq!(
            (c.position(), c.orientation(), c.is_lost()),
            (Position::new(2, 3), Orientation::South, false)
        );
    }

    #[test]
    fn test_second_rover_saved_by_scent() {
        let grid = Grid::new(1, 1).unwrap();

        let first = run(&grid, 1, 1, Orientation::North, "F");
        assert!(first.is_lost());
        assert_eq!(first.position(), Position::new(1, 1));

        let second = run(&grid, 1, 1, Orientation::North, "F");
        assert!(!second.is_lost());
        assert_eq!(second.position(), Position::new(1, 1));
        assert_eq!(second.orientation(), Orientation::North);
    }

    #[test]
    fn test_scent_guards_any_direction_from_cell() {
        // Corner (1,1): a loss heading north also protects a rover heading east.
        let grid = Grid::new(1, 1).unwrap();
        assert!(run(&grid, 1, 1, Orientation::North, "F").is_lost());

        let east = run(&grid, 1, 1, Orientation::East, "F");
        assert!(!east.is_lost());
        assert_eq!(grid.scent_count(), 1);
    }

    #[test]
    fn test_outcomes() {
        let grid = Grid::new(1, 1).unwrap();
        let mut rover = Rover::deploy(Position::new(0, 0), Orientation::South, &grid).unwrap();

        assert_eq!(
            command_for(Instruction::Left).execute(&mut rover, &grid),
            CommandOutcome::Turned(Orientation::East)
        );
        assert_eq!(
            command_for(Instruction::Forward).execute(&mut rover, &grid),
            CommandOutcome::Moved(Position::new(1, 0))
        );
        assert_eq!(
            command_for(Instruction::Forward).execute(&mut rover, &grid),
            CommandOutcome::FellOff(Position::new(1, 0))
        );
        assert_eq!(
            command_for(Instruction::Right).execute(&mut rover, &grid),
            CommandOutcome::Frozen
        );
        assert_eq!(
            command_for(Instruction::Forward).execute(&mut rover, &grid),
            CommandOutcome::Frozen
        );
    }

    #[test]
    fn test_custom_policy_is_injected() {
        struct Wall;
        impl MovementPolicy for Wall {
            fn on_boundary(&self, rover: &mut Rover, _grid: &Grid) -> CommandOutcome {
                CommandOutcome::Guarded(rover.position())
            }
        }

        let grid = Grid::new(0, 0).unwrap();
        let mut rover = Rover::deploy(Position::new(0, 0), Orientation::West, &grid).unwrap();
        let outcome = MoveForward::new(Wall).execute(&mut rover, &grid);

        assert_eq!(outcome, CommandOutcome::Guarded(Position::new(0, 0)));
        assert!(!rover.is_lost());
        assert_eq!(grid.scent_count(), 0);
    }

    fn orientation() -> impl Strategy<Value = Orientation> {
        prop::sample::select(Orientation::ALL.to_vec())
    }

    fn instruction() -> impl Strategy<Value = Instruction> {
        prop::sample::select(vec![Instruction::Left, Instruction::Right, Instruction::Forward])
    }

    proptest! {
        #[test]
        fn prop_lost_rover_never_changes(
            start in orientation(),
            steps in prop::collection::vec(instruction(), 0..60),
        ) {
            let grid = Grid::new(0, 0).unwrap();
            let mut rover = Rover::deploy(Position::new(0, 0), start, &grid).unwrap();
            command_for(Instruction::Forward).execute(&mut rover, &grid);
            prop_assert!(rover.is_lost());

            let frozen = rover.clone();
            for step in steps {
                let outcome = command_for(step).execute(&mut rover, &grid);
                prop_assert_eq!(outcome, CommandOutcome::Frozen);
                prop_assert_eq!(&rover, &frozen);
            }
        }

        #[test]
        fn prop_scent_protects_later_rover(
            max_x in 0i32..=6,
            max_y in 0i32..=6,
            along in 0i32..=6,
            first in orientation(),
            pick in 0usize..4,
        ) {
            let grid = Grid::new(max_x, max_y).unwrap();
            // Start on the edge `first` faces, so the first forward move leaves the grid.
            let start = match first {
                Orientation::North => Position::new(along.min(max_x), max_y),
                Orientation::South => Position::new(along.min(max_x), 0),
                Orientation::East => Position::new(max_x, along.min(max_y)),
                Orientation::West => Position::new(0, along.min(max_y)),
            };

            let mut lost = Rover::deploy(start, first, &grid).unwrap();
            let outcome = command_for(Instruction::Forward).execute(&mut lost, &grid);
            prop_assert_eq!(outcome, CommandOutcome::FellOff(start));

            let exits: Vec<Orientation> = Orientation::ALL
                .into_iter()
                .filter(|o| !grid.is_valid_position(start.offset(o.delta())))
                .collect();
            let second = exits[pick % exits.len()];

            let mut later = Rover::deploy(start, second, &grid).unwrap();
            command_for(Instruction::Forward).execute(&mut later, &grid);

            prop_assert!(!later.is_lost());
            prop_assert_eq!(later.position(), start);
            prop_assert_eq!(later.orientation(), second);
        }
    }
}
