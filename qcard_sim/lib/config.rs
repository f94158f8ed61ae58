//! Tunable parameters for a [`QuantumCardService`][crate::service::QuantumCardService].

use rand::{ rngs::StdRng, SeedableRng };

/// Engine-wide settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of cards dealt to each player.
    pub hand_size: usize,
    /// Number of times target generation may restart after a collision before
    /// giving up.
    pub target_retry_limit: usize,
    /// Seed for the master random number generator; `None` seeds from system
    /// entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hand_size: 7,
            target_retry_limit: 64,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_hand_size(mut self, hand_size: usize) -> Self {
        self.hand_size = hand_size;
        self
    }

    pub fn with_target_retry_limit(mut self, limit: usize) -> Self {
        self.target_retry_limit = limit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the master generator described by `self.seed`.
    pub fn rng(&self) -> StdRng {
        self.seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy)
    }
}
