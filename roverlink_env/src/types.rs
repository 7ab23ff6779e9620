//! Common types for the RoverLink environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a single command sent over the link.
///
/// Derived from a context RNG draw, so simulated runs repeat their ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub Uuid);

impl CommandId {
    /// Creates a deterministic CommandId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id_from_seed_is_deterministic() {
        assert_eq!(CommandId::from_seed(7), CommandId::from_seed(7));
        assert_ne!(CommandId::from_seed(7), CommandId::from_seed(8));
    }

    #[test]
    fn test_command_id_display_is_short() {
        let id = CommandId::from_seed(u64::MAX);
        assert_eq!(id.to_string().len(), 8);
    }
}
