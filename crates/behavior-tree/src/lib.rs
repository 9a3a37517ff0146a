//! Small behavior tree library for rotation decisions.
//!
//! A rotation is a priority list: at each decision point the tree is ticked
//! once against a mutable context and either some leaf acts or nothing does.
//! Trees are immutable after construction and evaluation never blocks, so
//! one tree can be shared by every encounter that uses the same rules.
//!
//! - **No Running state**: a tick either succeeds or fails right away.
//!   Casts that take time are the simulation's business, not the tree's.
//! - **Empty composites are legal**: a rotation whose rules were all
//!   rejected still builds, it just never acts.
//!
//! # Architecture
//!
//! - [`Behavior`]: the node trait, generic over the context
//! - [`Status`]: Success or Failure
//! - Composites: [`Sequence`], [`Selector`]
//! - Leaves: [`Condition`], [`Action`]

pub mod behavior;
pub mod builder;
pub mod composite;
pub mod leaf;
pub mod status;

pub use behavior::Behavior;
pub use composite::{Selector, Sequence};
pub use leaf::{Action, Condition};
pub use status::Status;
