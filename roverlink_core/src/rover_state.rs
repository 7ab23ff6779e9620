//! Orientation and the rover state machine.

use crate::rover_grid::{Grid, Position};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Compass heading of a rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    /// 90 degrees counter-clockwise.
    pub fn turn_left(self) -> Self {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    /// 90 degrees clockwise.
    pub fn turn_right(self) -> Self {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    /// Unit step `(dx, dy)` for one forward move.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, 1),
            Orientation::East => (1, 0),
            Orientation::South => (0, -1),
            Orientation::West => (-1, 0),
        }
    }

    pub fn code(self) -> char {
        match self {
            Orientation::North => 'N',
            Orientation::East => 'E',
            Orientation::South => 'S',
            Orientation::West => 'W',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'N' => Some(Orientation::North),
            'E' => Some(Orientation::East),
            'S' => Some(Orientation::South),
            'W' => Some(Orientation::West),
            _ => None,
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Orientation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let orientation = match (chars.next(), chars.next()) {
            (Some(c), None) => Orientation::from_code(c),
            _ => None,
        };
        orientation.ok_or_else(|| ValidationError::InvalidOrientation(s.to_string()))
    }
}

/// Lifecycle of a rover. `Lost` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoverStatus {
    Active,
    Lost,
}

/// A rover on the grid.
///
/// Once lost, position and orientation are frozen: every mutating call
/// becomes a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rover {
    position: Position,
    orientation: Orientation,
    status: RoverStatus,
}

impl Rover {
    /// Places a new rover on the grid, checking its starting cell.
    pub fn deploy(
        position: Position,
        orientation: Orientation,
        grid: &Grid,
    ) -> Result<Self, ValidationError> {
        grid.validate_initial_position(position)?;
        Ok(Self::restore(position, orientation, false))
    }

    /// Rebuilds a rover from previously recorded state. No bounds check.
    pub fn restore(position: Position, orientation: Orientation, lost: bool) -> Self {
        Self {
            position,
            orientation,
            status: if lost { RoverStatus::Lost } else { RoverStatus::Active },
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn status(&self) -> RoverStatus {
        self.status
    }

    pub fn is_lost(&self) -> bool {
        self.status == RoverStatus::Lost
    }

    pub fn turn_left(&mut self) {
        if !self.is_lost() {
            self.orientation = self.orientation.turn_left();
        }
    }

    pub fn turn_right(&mut self) {
        if !self.is_lost() {
            self.orientation = self.orientation.turn_right();
        }
    }

    /// The cell one step ahead, without moving. `None` once lost.
    pub fn try_move_forward(&self) -> Option<Position> {
        if self.is_lost() {
            return None;
        }
        Some(self.position.offset(self.orientation.delta()))
    }

    pub fn update_position(&mut self, position: Position) {
        if !self.is_lost() {
            self.position = position;
        }
    }

    pub fn mark_lost(&mut self) {
        self.status = RoverStatus::Lost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_are_cyclic() {
        for o in Orientation::ALL {
            assert_eq!(o.turn_left().turn_left().turn_left().turn_left(), o);
            assert_eq!(o.turn_right().turn_right().turn_right().turn_right(), o);
            assert_eq!(o.turn_left().turn_right(), o);
        }
        assert_eq!(Orientation::North.turn_left(), Orientation::West);
        assert_eq!(Orientation::North.turn_right(), Orientation::East);
    }

    #[test]
    fn test_orientation_codes() {
        for o in Orientation::ALL {
            assert_eq!(Orientation::from_code(o.code()), Some(o));
            assert_eq!(o.to_string().parse::<Orientation>(), Ok(o));
        }
        assert!("X".parse::<Orientation>().is_err());
        assert!("NE".parse::<Orientation>().is_err());
        assert!("".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_try_move_forward_does_not_mutate() {
        let rover = Rover::restore(Position::new(1, 1), Orientation::East, false);
        assert_eq!(rover.try_move_forward(), Some(Position::new(2, 1)));
        assert_eq!(rover.position(), Position::new(1, 1));
    }

    #[test]
    fn test_deploy_checks_bounds() {
        let grid = Grid::new(5, 3).unwrap();
        assert!(Rover::deploy(Position::new(5, 3), Orientation::North, &grid).is_ok());
        assert!(matches!(
            Rover::deploy(Position::new(5, 4), Orientation::North, &grid),
            Err(ValidationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_lost_rover_is_frozen() {
        let mut rover = Rover::restore(Position::new(3, 3), Orientation::North, false);
        rover.mark_lost();

        rover.turn_left();
        rover.turn_right();
        rover.turn_right();
        rover.update_position(Position::new(0, 0));

        assert!(rover.is_lost());
        assert_eq!(rover.status(), RoverStatus::Lost);
        assert_eq!(rover.position(), Position::new(3, 3));
        assert_eq!(rover.orientation(), Orientation::North);
        assert_eq!(rover.try_move_forward(), None);
    }
}
