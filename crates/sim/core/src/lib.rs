//! Deterministic rotation simulation kernel.
//!
//! `sim-core` owns the mechanics of one simulated encounter: the clock and
//! pending-action queue, resource pools, auras, spells with their cooldowns
//! and charges, periodic effects and the decision-value layer rotations read.
//! All state lives in [`Simulation`]; class content and the rotation driver
//! are separate crates built on the APIs re-exported here.
pub mod apl;
pub mod aura;
pub mod autoattack;
pub mod config;
pub mod cooldown;
pub mod dot;
pub mod engine;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod periodic;
pub mod resource;
pub mod spell;
pub mod time;
pub mod unit;

pub use apl::{
    APLValue, ActionConfig, CompareOp, Diagnostic, DiagnosticSeverity, Literal, MathOp,
    RotationConfig, RuleConfig, UnitReference, ValueBuilder, ValueConfig, ValueType,
};
pub use aura::{AuraConfig, AuraDuration, Reactivation};
pub use config::SimConfig;
pub use cooldown::{ChargeTracker, Cooldown};
pub use dot::{DotConfig, DotState};
pub use engine::{ActionHandle, ActionPriority, Simulation, Step};
pub use error::{ErrorSeverity, KernelFault, SimError, SimResult};
pub use ids::{ActionId, AuraId, DotId, PeriodicId, SpellId, UnitId};
pub use metrics::{ActionTotals, MetricEvent, MetricKind, MetricsLog, MetricsSummary};
pub use periodic::PeriodicActionOptions;
pub use resource::{ResourceError, ResourceKind, ResourcePool, ResourceSet};
pub use spell::{
    CastModel, CastOutcome, CastRefusal, CooldownPolicy, SpellConfig, SpellCost, SpellFlags,
    SpellResult,
};
pub use time::{SimDuration, SimTime};
pub use unit::{AutoAttackConfig, CastState, TargetList, Unit, UnitKind};
