//! Common error infrastructure for sim-core.
//!
//! Two families of failure exist in the kernel:
//!
//! - **Refusals** ([`crate::CastRefusal`], [`crate::ResourceError::Insufficient`])
//!   are normal control flow. A rotation asks, the kernel says no.
//! - **Faults** ([`KernelFault`]) are invariant violations. They abort the
//!   encounter: the failing callback returns `Err`, [`crate::Simulation::advance`]
//!   propagates it and the runner reports it.

use crate::ids::{AuraId, UnitId};
use crate::resource::{ResourceError, ResourceKind};
use crate::time::SimTime;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the request was refused, another choice may succeed
/// - **Validation**: malformed input that should not be retried unchanged
/// - **Internal**: a kernel bookkeeping inconsistency
/// - **Fatal**: the encounter state can no longer be trusted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all sim-core errors.
pub trait SimError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Stable across releases; used in logs, reports and tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Invariant violation inside the kernel. Always aborts the encounter.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum KernelFault {
    #[error("action scheduled at {at} but the clock already reads {now}")]
    ScheduledInPast { at: SimTime, now: SimTime },

    #[error("invalid {resource} amount {amount} passed to {operation}")]
    InvalidAmount {
        resource: ResourceKind,
        operation: &'static str,
        amount: f64,
    },

    #[error("unit {unit} has no {resource} pool")]
    MissingResource { unit: UnitId, resource: ResourceKind },

    #[error("{resource} spend of {cost} committed with only {current} available")]
    Overspend {
        resource: ResourceKind,
        cost: f64,
        current: f64,
    },

    #[error("aura '{label}' ({aura}) activated twice")]
    DoubleActivation { aura: AuraId, label: String },

    #[error("stack change on inactive aura '{label}' ({aura})")]
    InactiveAura { aura: AuraId, label: String },

    #[error("aura '{label}' registered twice on unit {unit}")]
    DuplicateAura { unit: UnitId, label: String },

    #[error("spell '{label}' registered twice on unit {unit}")]
    DuplicateSpell { unit: UnitId, label: String },

    #[error("dot '{label}' deactivated from inside its own tick")]
    ReentrantDotMutation { label: String },

    #[error("unknown {kind} id {id}")]
    UnknownId { kind: &'static str, id: u32 },

    #[error("encounter supports at most {max} targets")]
    TooManyTargets { max: usize },

    #[error("effect '{label}' failed: {reason}")]
    EffectFailed { label: String, reason: String },

    #[error("invalid simulation config: {reason}")]
    InvalidConfig { reason: String },
}

impl SimError for KernelFault {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownId { .. }
            | Self::TooManyTargets { .. }
            | Self::DuplicateAura { .. }
            | Self::DuplicateSpell { .. } => ErrorSeverity::Internal,
            Self::InvalidConfig { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ScheduledInPast { .. } => "SCHEDULED_IN_PAST",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::MissingResource { .. } => "MISSING_RESOURCE",
            Self::Overspend { .. } => "OVERSPEND",
            Self::DoubleActivation { .. } => "DOUBLE_ACTIVATION",
            Self::InactiveAura { .. } => "INACTIVE_AURA",
            Self::DuplicateAura { .. } => "DUPLICATE_AURA",
            Self::DuplicateSpell { .. } => "DUPLICATE_SPELL",
            Self::ReentrantDotMutation { .. } => "REENTRANT_DOT_MUTATION",
            Self::UnknownId { .. } => "UNKNOWN_ID",
            Self::TooManyTargets { .. } => "TOO_MANY_TARGETS",
            Self::EffectFailed { .. } => "EFFECT_FAILED",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }
}

impl From<ResourceError> for KernelFault {
    /// Promotes a resource error raised where the caller had already checked
    /// affordability; at that point any failure is a broken invariant.
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Insufficient {
                resource,
                cost,
                current,
            } => Self::Overspend {
                resource,
                cost,
                current,
            },
            ResourceError::InvalidAmount {
                resource,
                operation,
                amount,
            } => Self::InvalidAmount {
                resource,
                operation,
                amount,
            },
            ResourceError::Missing { unit, resource } => Self::MissingResource { unit, resource },
        }
    }
}

/// Result alias for kernel operations that can fault.
pub type SimResult<T> = Result<T, KernelFault>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_resource_promotes_to_overspend() {
        let fault: KernelFault = ResourceError::Insufficient {
            resource: ResourceKind::Energy,
            cost: 20.0,
            current: 15.0,
        }
        .into();
        assert_eq!(fault.error_code(), "OVERSPEND");
        assert_eq!(fault.severity(), ErrorSeverity::Fatal);
    }

    #[test]
    fn unknown_ids_are_internal() {
        let fault = KernelFault::UnknownId { kind: "aura", id: 9 };
        assert!(fault.severity().is_internal());
        assert!(!fault.severity().is_recoverable());
        assert_eq!(fault.to_string(), "unknown aura id 9");
    }
}
