//! Everything one encounter is built from.
//!
//! A scenario is read-only once built. Batch workers share it behind an
//! `Arc` and each constructs its own simulation from it.
use sim_content::{MonkSetup, default_rotation};
use sim_core::{RotationConfig, SimConfig};

/// Encounter parameters, character and rotation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scenario {
    pub config: SimConfig,
    pub setup: MonkSetup,
    pub rotation: RotationConfig,
}

impl Scenario {
    pub fn new(config: SimConfig, setup: MonkSetup, rotation: RotationConfig) -> Self {
        Self {
            config,
            setup,
            rotation,
        }
    }

    /// Default encounter with the built-in priority list for `setup`.
    pub fn with_default_rotation(config: SimConfig, setup: MonkSetup) -> Self {
        Self::new(config, setup, default_rotation())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Copy of this scenario for one batch iteration.
    pub fn for_iteration(&self, iteration: u32) -> Self {
        let seed = iteration_seed(self.config.seed, iteration);
        self.clone().with_seed(seed)
    }
}

/// Seed of the `iteration`-th run of a batch. Depends only on the base seed
/// and the iteration index, never on how iterations are spread over workers.
pub fn iteration_seed(base: u64, iteration: u32) -> u64 {
    base.wrapping_add(u64::from(iteration))
}
