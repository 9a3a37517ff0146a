use crate::error::{KernelFault, SimResult};
use crate::time::SimDuration;

/// Encounter-wide simulation parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Hard cutoff for the encounter. Actions scheduled later never run.
    pub duration: SimDuration,
    /// Run seed. Every random stream derives from it.
    pub seed: u64,
    /// Number of enemy targets in the encounter.
    pub num_targets: u32,
    /// Delay a player needs to react to a state change (e.g. channel end).
    pub reaction_time: SimDuration,
    /// GCD extension applied when a channel is clipped early.
    pub channel_clip_delay: SimDuration,
    /// Floor for hasted global cooldowns.
    pub min_gcd: SimDuration,
    /// Interval at which an idle unit re-evaluates its rotation.
    pub decision_poll_interval: SimDuration,
    /// Distance between the player and its targets, in yards.
    pub target_distance: f64,
}

impl SimConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum number of enemy targets in one encounter.
    pub const MAX_TARGETS: usize = 20;
    /// Maximum number of decision points a unit may take at the same instant
    /// before the runner falls back to polling.
    pub const MAX_DECISIONS_PER_INSTANT: u32 = 16;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_DURATION: SimDuration = SimDuration::from_secs(180);
    pub const DEFAULT_SEED: u64 = 0x5eed;
    pub const DEFAULT_NUM_TARGETS: u32 = 1;
    pub const DEFAULT_REACTION_TIME: SimDuration = SimDuration::from_millis(100);
    pub const DEFAULT_CHANNEL_CLIP_DELAY: SimDuration = SimDuration::from_millis(100);
    pub const DEFAULT_MIN_GCD: SimDuration = SimDuration::from_secs(1);
    pub const DEFAULT_DECISION_POLL_INTERVAL: SimDuration = SimDuration::from_millis(100);
    pub const DEFAULT_TARGET_DISTANCE: f64 = 5.0;

    pub fn new() -> Self {
        Self {
            duration: Self::DEFAULT_DURATION,
            seed: Self::DEFAULT_SEED,
            num_targets: Self::DEFAULT_NUM_TARGETS,
            reaction_time: Self::DEFAULT_REACTION_TIME,
            channel_clip_delay: Self::DEFAULT_CHANNEL_CLIP_DELAY,
            min_gcd: Self::DEFAULT_MIN_GCD,
            decision_poll_interval: Self::DEFAULT_DECISION_POLL_INTERVAL,
            target_distance: Self::DEFAULT_TARGET_DISTANCE,
        }
    }

    pub fn with_duration(mut self, duration: SimDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the target count, clamped to `1..=MAX_TARGETS`.
    pub fn with_num_targets(mut self, num_targets: u32) -> Self {
        self.num_targets = num_targets.clamp(1, Self::MAX_TARGETS as u32);
        self
    }

    pub fn with_reaction_time(mut self, reaction_time: SimDuration) -> Self {
        self.reaction_time = reaction_time;
        self
    }

    pub fn with_channel_clip_delay(mut self, delay: SimDuration) -> Self {
        self.channel_clip_delay = delay;
        self
    }

    pub fn with_min_gcd(mut self, min_gcd: SimDuration) -> Self {
        self.min_gcd = min_gcd;
        self
    }

    pub fn with_decision_poll_interval(mut self, interval: SimDuration) -> Self {
        self.decision_poll_interval = interval;
        self
    }

    pub fn with_target_distance(mut self, distance: f64) -> Self {
        self.target_distance = distance;
        self
    }

    /// Checks the target count and the intervals the clock needs to move
    /// forward.
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |reason: String| KernelFault::InvalidConfig { reason };
        if self.num_targets == 0 || self.num_targets as usize > Self::MAX_TARGETS {
            return Err(invalid(format!(
                "num_targets must be between 1 and {}, got {}",
                Self::MAX_TARGETS,
                self.num_targets
            )));
        }
        if self.decision_poll_interval.is_zero() {
            return Err(invalid("decision_poll_interval must be positive".into()));
        }
        if self.min_gcd.is_zero() {
            return Err(invalid("min_gcd must be positive".into()));
        }
        Ok(())
    }

    /// Target count after clamping, as used by encounter setup.
    pub fn target_count(&self) -> usize {
        (self.num_targets as usize).clamp(1, Self::MAX_TARGETS)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
