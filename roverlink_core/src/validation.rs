//! Validation errors for grid, rover and instruction input.
//!
//! These are raised synchronously, before any simulated network activity,
//! and are never retried.

use roverlink_env::EnvError;
use thiserror::Error;

/// Largest coordinate accepted for either grid dimension.
pub const MAX_GRID_COORDINATE: i32 = 50;

/// Instruction sequences must be strictly shorter than this.
pub const MAX_INSTRUCTION_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Grid dimension {value} outside [0, {max}]", max = MAX_GRID_COORDINATE)]
    GridDimension { value: i64 },

    #[error("Position ({x}, {y}) outside grid bounds (0..={max_x}, 0..={max_y})")]
    OutOfBounds { x: i32, y: i32, max_x: i32, max_y: i32 },

    #[error("Invalid orientation: '{0}'")]
    InvalidOrientation(String),

    #[error("Invalid instruction '{0}' (expected L, R or F)")]
    InvalidInstruction(char),

    #[error("Instruction sequence too long: {0} (must be < {max})", max = MAX_INSTRUCTION_LENGTH)]
    InstructionsTooLong(usize),

    #[error("Malformed {kind} line: '{line}'")]
    Malformed { kind: &'static str, line: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl ValidationError {
    pub fn malformed(kind: &'static str, line: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            line: line.into(),
        }
    }
}

impl From<ValidationError> for EnvError {
    fn from(err: ValidationError) -> Self {
        EnvError::Validation(err.to_string())
    }
}
