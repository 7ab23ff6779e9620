//! Simulation configuration.

use crate::network::LinkConfig;
use crate::retry::RetryPolicy;

/// Everything needed to build a deterministic simulated mission.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Master seed for the context RNG
    pub seed: u64,

    /// Link delay and fault injection
    pub link: LinkConfig,

    /// Controller retry behaviour
    pub retry: RetryPolicy,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            link: LinkConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SimConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
