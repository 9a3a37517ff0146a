//! Encounter orchestration for the rotation simulator.
//!
//! This crate drives `sim-core` encounters with `sim-content` characters:
//! - [`rotation`] compiles declarative rules into a behavior tree, with
//!   construction-time diagnostics
//! - [`encounter`] runs one encounter to its end
//! - [`batch`] runs independent iterations on blocking tokio workers
//! - [`report`] turns kernel metrics into serializable reports
pub mod batch;
pub mod encounter;
pub mod error;
pub mod report;
pub mod rotation;
pub mod scenario;

pub use batch::{BatchConfig, BatchRunner};
pub use encounter::{Encounter, TARGET_HEALTH, run_encounter};
pub use error::{Result, RuntimeError};
pub use report::{ActionRow, BatchReport, EncounterReport, IterationSummary};
pub use rotation::{Choice, Rotation, RotationContext};
pub use scenario::{Scenario, iteration_seed};
