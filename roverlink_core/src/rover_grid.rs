//! The grid rovers drive on, and the scent left by rovers lost leaving it.
//!
//! Bounds are fixed at construction. The scent set only ever grows: a scented
//! cell is one some rover fell off from, and later rovers refuse to leave the
//! grid from it.

use crate::validation::{ValidationError, MAX_GRID_COORDINATE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cell coordinate. Valid grid cells have `x, y >= 0`; a prospective
/// move may produce negative values which are never committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by `(dx, dy)`, clamped at the `i32` range.
    pub fn offset(self, (dx, dy): (i32, i32)) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Rectangular grid `[0, max_x] x [0, max_y]` with its scent markers.
///
/// The scent set sits behind a mutex so one grid can be shared (`Arc<Grid>`)
/// by concurrent batches; every insert is a single lock-held operation.
#[derive(Debug)]
pub struct Grid {
    max_x: i32,
    max_y: i32,
    scents: Mutex<HashSet<Position>>,
}

impl Grid {
    /// Creates a grid with the given upper-right corner.
    pub fn new(max_x: i32, max_y: i32) -> Result<Self, ValidationError> {
        for value in [max_x, max_y] {
            if !(0..=MAX_GRID_COORDINATE).contains(&value) {
                return Err(ValidationError::GridDimension {
                    value: value as i64,
                });
            }
        }

        Ok(Self {
            max_x,
            max_y,
            scents: Mutex::new(HashSet::new()),
        })
    }

    /// Creates an Arc-wrapped grid for sharing across tasks.
    pub fn shared(max_x: i32, max_y: i32) -> Result<Arc<Self>, ValidationError> {
        Self::new(max_x, max_y).map(Arc::new)
    }

    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn is_valid_position(&self, position: Position) -> bool {
        (0..=self.max_x).contains(&position.x) && (0..=self.max_y).contains(&position.y)
    }

    pub fn has_scent(&self, position: Position) -> bool {
        self.scents().contains(&position)
    }

    /// Marks `position` as scented.
    ///
    /// Returns true only for the call that actually inserted the marker;
    /// repeated calls for the same cell are no-ops returning false.
    pub fn add_scent(&self, position: Position) -> bool {
        self.scents().insert(position)
    }

    /// Checks a rover's starting cell. Called once per rover, at deployment.
    pub fn validate_initial_position(&self, position: Position) -> Result<(), ValidationError> {
        if self.is_valid_position(position) {
            Ok(())
        } else {
            Err(ValidationError::OutOfBounds {
                x: position.x,
                y: position.y,
                max_x: self.max_x,
                max_y: self.max_y,
            })
        }
    }

    pub fn scent_count(&self) -> usize {
        self.scents().len()
    }

    /// Snapshot of every scented cell, sorted by (x, y).
    pub fn scented_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.scents().iter().copied().collect();
        positions.sort();
        positions
    }

    fn scents(&self) -> MutexGuard<'_, HashSet<Position>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.scents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grid_bounds() {
        let grid = Grid::new(5, 3).unwrap();
        assert!(grid.is_valid_position(Position::new(0, 0)));
        assert!(grid.is_valid_position(Position::new(5, 3)));
        assert!(!grid.is_valid_position(Position::new(6, 3)));
        assert!(!grid.is_valid_position(Position::new(5, 4)));
        assert!(!grid.is_valid_position(Position::new(-1, 0)));
        assert!(!grid.is_valid_position(Position::new(0, -1)));
    }

    #[test]
    fn test_grid_dimension_limits() {
        assert!(Grid::new(0, 0).is_ok());
        assert!(Grid::new(50, 50).is_ok());
        assert_eq!(
            Grid::new(51, 3).unwrap_err(),
            ValidationError::GridDimension { value: 51 }
        );
        assert_eq!(
            Grid::new(5, -1).unwrap_err(),
            ValidationError::GridDimension { value: -1 }
        );
    }

    #[test]
    fn test_add_scent_is_idempotent() {
        let grid = Grid::new(5, 3).unwrap();
        let p = Position::new(3, 3);

        assert!(!grid.has_scent(p));
        assert!(grid.add_scent(p));
        assert!(grid.has_scent(p));

        assert!(!grid.add_scent(p));
        assert_eq!(grid.scent_count(), 1);
    }

    #[test]
    fn test_validate_initial_position() {
        let grid = Grid::new(5, 3).unwrap();
        assert!(grid.validate_initial_position(Position::new(1, 1)).is_ok());
        assert_eq!(
            grid.validate_initial_position(Position::new(6, 1)),
            Err(ValidationError::OutOfBounds { x: 6, y: 1, max_x: 5, max_y: 3 })
        );
    }

    #[test]
    fn test_offset_saturates_at_edges() {
        let far = Position::new(i32::MAX, i32::MIN);
        assert_eq!(far.offset((1, -1)), far);
        assert_eq!(Position::new(2, 2).offset((-1, 1)), Position::new(1, 3));
        assert!(!Grid::new(5, 3).unwrap().is_valid_position(far.offset((1, 0))));
    }

    #[test]
    fn test_concurrent_scent_insert_has_single_winner() {
        let grid = Grid::shared(10, 10).unwrap();
        let p = Position::new(4, 4);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let grid = Arc::clone(&grid);
                std::thread::spawn(move || grid.add_scent(p))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(grid.scent_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_scent_set_only_grows(cells in prop::collection::vec((0i32..=5, 0i32..=3), 0..40)) {
            let grid = Grid::new(5, 3).unwrap();
            let mut previous: Vec<Position> = Vec::new();

            for (x, y) in cells {
                grid.add_scent(Position::new(x, y));
                let current = grid.scented_positions();
                for p in &previous {
                    prop_assert!(current.contains(p));
                }
                prop_assert!(current.len() >= previous.len());
                previous = current;
            }
        }
    }
}
