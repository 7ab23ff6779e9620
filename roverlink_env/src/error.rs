//! Error types for the RoverLink environment abstraction.

use thiserror::Error;

/// Errors that can occur while talking to a rover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// Malformed input or out-of-bounds state (never retried)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Simulated connection drop while connecting
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single command could not be executed
    #[error("Command execution error: {0}")]
    CommandExecution(String),

    /// No session exists for the rover
    #[error("Rover not connected: {0}")]
    NotConnected(String),

    /// Link dropped mid-operation
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Caller aborted the operation
    #[error("Operation cancelled")]
    Cancelled,
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a not-connected error.
    pub fn not_connected(rover_id: impl std::fmt::Display) -> Self {
        Self::NotConnected(rover_id.to_string())
    }

    /// Whether a retry policy may re-attempt the failed operation.
    ///
    /// Timeouts and cancellations always propagate. Validation failures are
    /// deterministic, so another attempt cannot succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Timeout(_) | Self::Cancelled | Self::Validation(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(EnvError::connection("drop").is_retryable());
        assert!(EnvError::network("reset").is_retryable());
        assert!(EnvError::not_connected("rover-1").is_retryable());
        assert!(EnvError::CommandExecution("boom".into()).is_retryable());

        assert!(!EnvError::Timeout(500).is_retryable());
        assert!(!EnvError::Cancelled.is_retryable());
        assert!(!EnvError::validation("bad").is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(EnvError::Timeout(250).to_string(), "Timeout after 250ms");
        assert_eq!(
            EnvError::not_connected("rover-7").to_string(),
            "Rover not connected: rover-7"
        );
    }
}
