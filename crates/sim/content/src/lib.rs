//! Class content and data loaders for the rotation simulator.
//!
//! This crate houses the leaf content built on `sim-core`:
//! - The monk class kit (strikes, channel, talents)
//! - Built-in rotations
//! - Loaders for simulation config (TOML), character setup (TOML) and
//!   rotations (RON)
//!
//! Content registers spells and auras on a [`sim_core::Simulation`]; it owns
//! no encounter state of its own.

pub mod monk;
pub mod presets;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use monk::{Monk, MonkSetup, MonkTalents, Stance, labels};
pub use presets::{channel_rotation, default_rotation, idle_rotation};

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, LoadResult, RotationLoader, SetupLoader};
