//! Line formats for grids, rovers, instructions and results.
//!
//! ```text
//! 5 3            grid: upper-right corner (each 0..=50)
//! 1 1 E          rover: x y orientation
//! RFRFRFRF       instructions: L/R/F, fewer than 100
//!
//! 1 1 E          result
//! 3 3 N LOST     result of a lost rover
//! ```

use crate::rover_grid::{Grid, Position};
use crate::rover_motion::Instruction;
use crate::rover_state::{Orientation, Rover};
use crate::validation::{ValidationError, MAX_INSTRUCTION_LENGTH};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const LOST_MARKER: &str = "LOST";

fn parse_coordinate(token: &str, kind: &'static str, line: &str) -> Result<i32, ValidationError> {
    // Digits only: rejects signs and whitespace that `i32::from_str` would accept or choke on.
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::malformed(kind, line));
    }
    token
        .parse::<i32>()
        .map_err(|_| ValidationError::malformed(kind, line))
}

/// Parses `"<maxX> <maxY>"` into a fresh grid.
pub fn parse_grid_line(line: &str) -> Result<Grid, ValidationError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [x, y] = tokens.as_slice() else {
        return Err(ValidationError::malformed("grid", line));
    };
    Grid::new(
        parse_coordinate(x, "grid", line)?,
        parse_coordinate(y, "grid", line)?,
    )
}

/// Parses `"<x> <y> <O>"`. Bounds are checked separately, at deployment.
pub fn parse_rover_line(line: &str) -> Result<(Position, Orientation), ValidationError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [x, y, o] = tokens.as_slice() else {
        return Err(ValidationError::malformed("rover", line));
    };
    let position = Position::new(
        parse_coordinate(x, "rover", line)?,
        parse_coordinate(y, "rover", line)?,
    );
    Ok((position, o.parse()?))
}

/// Parses an instruction line over `{L, R, F}` with fewer than 100 characters.
pub fn parse_instructions(line: &str) -> Result<Vec<Instruction>, ValidationError> {
    let line = line.trim();
    let len = line.chars().count();
    if len >= MAX_INSTRUCTION_LENGTH {
        return Err(ValidationError::InstructionsTooLong(len));
    }
    line.chars().map(Instruction::from_code).collect()
}

/// Final state of a rover as printed in a result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoverReport {
    pub position: Position,
    pub orientation: Orientation,
    pub lost: bool,
}

impl RoverReport {
    pub fn new(position: Position, orientation: Orientation, lost: bool) -> Self {
        Self {
            position,
            orientation,
            lost,
        }
    }
}

impl From<&Rover> for RoverReport {
    fn from(rover: &Rover) -> Self {
        Self::new(rover.position(), rover.orientation(), rover.is_lost())
    }
}

impl std::fmt::Display for RoverReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.position, self.orientation)?;
        if self.lost {
            write!(f, " {}", LOST_MARKER)?;
        }
        Ok(())
    }
}

impl FromStr for RoverReport {
    type Err = ValidationError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (rover, lost) = match tokens.as_slice() {
            [_, _, _] => (line, false),
            [x, y, o, marker] if *marker == LOST_MARKER => {
                return Ok(Self::new(
                    Position::new(
                        parse_coordinate(x, "result", line)?,
                        parse_coordinate(y, "result", line)?,
                    ),
                    o.parse()?,
                    true,
                ));
            }
            _ => return Err(ValidationError::malformed("result", line)),
        };
        let (position, orientation) = parse_rover_line(rover)?;
        Ok(Self::new(position, orientation, lost))
    }
}

/// Formats a rover as a result line.
pub fn format_report(rover: &Rover) -> String {
    RoverReport::from(rover).to_string()
}

/// Parses a result line back into its state.
pub fn parse_report(line: &str) -> Result<RoverReport, ValidationError> {
    line.parse()
}

/// One rover of a mission input: start state plus its instruction line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoverPlan {
    pub position: Position,
    pub orientation: Orientation,
    pub instructions: String,
}

/// A full mission input: the grid followed by rover/instruction line pairs.
#[derive(Debug)]
pub struct MissionInput {
    pub grid: Grid,
    pub rovers: Vec<RoverPlan>,
}

/// Parses a mission.
///
/// Blank lines are ignored except directly after a rover line, where an
/// empty instruction line is allowed. A trailing rover line without
/// instructions gets an empty sequence.
pub fn parse_mission(input: &str) -> Result<MissionInput, ValidationError> {
    let mut lines = input.lines().map(str::trim);

    let grid_line = lines
        .by_ref()
        .find(|l| !l.is_empty())
        .ok_or(ValidationError::Empty("mission input"))?;
    let grid = parse_grid_line(grid_line)?;

    let mut rovers = Vec::new();
    while let Some(rover_line) = lines.by_ref().find(|l| !l.is_empty()) {
        let (position, orientation) = parse_rover_line(rover_line)?;
        let instructions = lines.next().unwrap_or_default();
        parse_instructions(instructions)?;
        rovers.push(RoverPlan {
            position,
            orientation,
            instructions: instructions.to_string(),
        });
    }

    Ok(MissionInput { grid, rovers })
}
