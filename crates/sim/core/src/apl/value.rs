//! Typed decision-value trees.
//!
//! An [`APLValue`] is built once by the [`super::ValueBuilder`], which
//! resolves labels to ids and rejects capability mismatches. Evaluation is a
//! pure read of the simulation.
use std::fmt;
use std::sync::Arc;

use crate::engine::Simulation;
use crate::ids::{AuraId, SpellId, UnitId};
use crate::resource::ResourceKind;
use crate::time::{SimDuration, SimTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueType {
    Float,
    Int,
    Bool,
    Duration,
    String,
}

/// A constant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Literal {
    Float(f64),
    Int(i64),
    Bool(bool),
    Duration(SimDuration),
    String(String),
}

impl Literal {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Float(_) => ValueType::Float,
            Self::Int(_) => ValueType::Int,
            Self::Bool(_) => ValueType::Bool,
            Self::Duration(_) => ValueType::Duration,
            Self::String(_) => ValueType::String,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn apply<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MathOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl MathOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div if rhs == 0.0 => 0.0,
            Self::Div => lhs / rhs,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// Result type of `lhs op rhs`.
    pub(crate) fn result_type(self, lhs: ValueType, rhs: ValueType) -> ValueType {
        use ValueType::*;
        match (self, lhs, rhs) {
            (Self::Add | Self::Sub, Duration, Duration) => Duration,
            (Self::Mul, Duration, Float | Int) | (Self::Mul, Float | Int, Duration) => Duration,
            (Self::Div, Duration, Float | Int) => Duration,
            (Self::Add | Self::Sub | Self::Mul, Int, Int) => Int,
            _ => Float,
        }
    }
}

/// A unit resolved at evaluation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitSelector {
    Fixed(UnitId),
    /// Whatever the given unit is targeting when the value is read.
    TargetOf(UnitId),
}

impl UnitSelector {
    pub fn resolve(self, sim: &Simulation) -> Option<UnitId> {
        match self {
            Self::Fixed(unit) => Some(unit),
            Self::TargetOf(unit) => sim.unit(unit).ok()?.current_target(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuraSelector {
    Fixed(AuraId),
    /// Looked up by label on the selected unit at read time.
    ByLabel { unit: UnitSelector, label: Arc<str> },
}

impl AuraSelector {
    pub fn resolve(&self, sim: &Simulation) -> Option<AuraId> {
        match self {
            Self::Fixed(aura) => Some(*aura),
            Self::ByLabel { unit, label } => sim.aura_by_label(unit.resolve(sim)?, label),
        }
    }
}

/// Decision-value node.
#[derive(Clone, Debug, PartialEq)]
pub enum APLValue {
    Const(Literal),
    CurrentTime,
    RemainingTime,
    CurrentResource {
        unit: UnitSelector,
        kind: ResourceKind,
    },
    /// Fraction of max, in `[0, 1]`.
    CurrentResourcePercent {
        unit: UnitSelector,
        kind: ResourceKind,
    },
    /// Max value captured when the node was built.
    MaxResourceSnapshot {
        kind: ResourceKind,
        max: f64,
    },
    AuraActive(AuraSelector),
    AuraStacks(AuraSelector),
    AuraRemainingTime(AuraSelector),
    SpellIsReady(SpellId),
    SpellCanCast(SpellId),
    SpellCooldownRemaining(SpellId),
    SpellCharges(SpellId),
    SpellTimeToNextCharge(SpellId),
    /// The spell's dot on the caster's current target.
    DotIsActive(SpellId),
    DotRemainingTicks(SpellId),
    Compare {
        op: CompareOp,
        lhs: Box<APLValue>,
        rhs: Box<APLValue>,
    },
    Math {
        op: MathOp,
        lhs: Box<APLValue>,
        rhs: Box<APLValue>,
    },
    And(Vec<APLValue>),
    Or(Vec<APLValue>),
    Not(Box<APLValue>),
    Min(Vec<APLValue>),
    Max(Vec<APLValue>),
}

impl APLValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Const(literal) => literal.value_type(),
            Self::CurrentResource { kind, .. } | Self::MaxResourceSnapshot { kind, .. } => {
                if kind.is_discrete() {
                    ValueType::Int
                } else {
                    ValueType::Float
                }
            }
            Self::CurrentResourcePercent { .. } => ValueType::Float,
            Self::CurrentTime
            | Self::RemainingTime
            | Self::AuraRemainingTime(_)
            | Self::SpellCooldownRemaining(_)
            | Self::SpellTimeToNextCharge(_) => ValueType::Duration,
            Self::AuraStacks(_) | Self::SpellCharges(_) | Self::DotRemainingTicks(_) => ValueType::Int,
            Self::AuraActive(_)
            | Self::SpellIsReady(_)
            | Self::SpellCanCast(_)
            | Self::DotIsActive(_)
            | Self::Compare { .. }
            | Self::And(_)
            | Self::Or(_)
            | Self::Not(_) => ValueType::Bool,
            Self::Math { op, lhs, rhs } => op.result_type(lhs.value_type(), rhs.value_type()),
            Self::Min(values) | Self::Max(values) => {
                let mut types = values.iter().map(APLValue::value_type);
                let first = types.next().unwrap_or(ValueType::Float);
                if types.all(|ty| ty == first) {
                    first
                } else {
                    ValueType::Float
                }
            }
        }
    }

    pub fn get_float(&self, sim: &Simulation) -> f64 {
        match self {
            Self::Const(Literal::Float(value)) => *value,
            Self::Const(Literal::Int(value)) => *value as f64,
            Self::Const(Literal::Bool(value)) => f64::from(u8::from(*value)),
            Self::Const(Literal::Duration(value)) => value.as_secs_f64(),
            Self::Const(Literal::String(value)) => value.parse().unwrap_or(0.0),
            Self::CurrentResource { unit, kind } => unit
                .resolve(sim)
                .and_then(|unit| sim.current_resource(unit, *kind))
                .unwrap_or(0.0),
            Self::CurrentResourcePercent { unit, kind } => unit
                .resolve(sim)
                .and_then(|unit| sim.resource_percent(unit, *kind))
                .unwrap_or(0.0),
            Self::MaxResourceSnapshot { max, .. } => *max,
            Self::Math { op, lhs, rhs } => op.apply(lhs.get_float(sim), rhs.get_float(sim)),
            Self::Min(values) => values
                .iter()
                .map(|value| value.get_float(sim))
                .reduce(f64::min)
                .unwrap_or(0.0),
            Self::Max(values) => values
                .iter()
                .map(|value| value.get_float(sim))
                .reduce(f64::max)
                .unwrap_or(0.0),
            _ => match self.value_type() {
                ValueType::Duration => duration_secs(self.get_duration(sim)),
                ValueType::Int => self.get_int(sim) as f64,
                ValueType::Bool => f64::from(u8::from(self.get_bool(sim))),
                ValueType::Float | ValueType::String => 0.0,
            },
        }
    }

    pub fn get_int(&self, sim: &Simulation) -> i64 {
        match self {
            Self::Const(Literal::Int(value)) => *value,
            Self::CurrentResource { .. } | Self::MaxResourceSnapshot { .. } => {
                self.get_float(sim).floor() as i64
            }
            Self::AuraStacks(aura) => aura
                .resolve(sim)
                .map_or(0, |aura| i64::from(sim.aura_stacks(aura))),
            Self::SpellCharges(spell) => i64::from(sim.spell_charges(*spell)),
            Self::DotRemainingTicks(spell) => target_dot(sim, *spell)
                .map_or(0, |dot| i64::from(sim.dot_remaining_ticks(dot))),
            _ => self.get_float(sim) as i64,
        }
    }

    pub fn get_bool(&self, sim: &Simulation) -> bool {
        match self {
            Self::Const(Literal::Bool(value)) => *value,
            Self::AuraActive(aura) => aura.resolve(sim).is_some_and(|aura| sim.is_aura_active(aura)),
            Self::SpellIsReady(spell) => sim.is_spell_ready(*spell),
            Self::SpellCanCast(spell) => sim
                .spell(*spell)
                .ok()
                .and_then(|spell_ref| sim.unit(spell_ref.caster()).ok()?.current_target())
                .is_some_and(|target| sim.can_cast(*spell, target).is_ok()),
            Self::DotIsActive(spell) => target_dot(sim, *spell).is_some_and(|dot| sim.is_dot_active(dot)),
            Self::Compare { op, lhs, rhs } => compare(*op, lhs, rhs, sim),
            Self::And(values) => values.iter().all(|value| value.get_bool(sim)),
            Self::Or(values) => values.iter().any(|value| value.get_bool(sim)),
            Self::Not(value) => !value.get_bool(sim),
            _ => self.get_float(sim) != 0.0,
        }
    }

    pub fn get_duration(&self, sim: &Simulation) -> SimDuration {
        match self {
            Self::Const(Literal::Duration(value)) => *value,
            Self::CurrentTime => sim.current_time() - SimTime::ZERO,
            Self::RemainingTime => sim.remaining_time(),
            Self::AuraRemainingTime(aura) => aura
                .resolve(sim)
                .map_or(SimDuration::ZERO, |aura| sim.aura_remaining(aura)),
            Self::SpellCooldownRemaining(spell) => sim.spell_cooldown_remaining(*spell),
            Self::SpellTimeToNextCharge(spell) => sim.time_to_next_recharge(*spell),
            Self::Min(values) if self.value_type() == ValueType::Duration => values
                .iter()
                .map(|value| value.get_duration(sim))
                .min()
                .unwrap_or(SimDuration::ZERO),
            Self::Max(values) if self.value_type() == ValueType::Duration => values
                .iter()
                .map(|value| value.get_duration(sim))
                .max()
                .unwrap_or(SimDuration::ZERO),
            _ => SimDuration::from_secs_f64(self.get_float(sim)),
        }
    }

    pub fn get_string(&self, sim: &Simulation) -> String {
        match self {
            Self::Const(Literal::String(value)) => value.clone(),
            _ => match self.value_type() {
                ValueType::Bool => self.get_bool(sim).to_string(),
                ValueType::Int => self.get_int(sim).to_string(),
                ValueType::Duration => self.get_duration(sim).to_string(),
                ValueType::Float | ValueType::String => self.get_float(sim).to_string(),
            },
        }
    }
}

/// Seconds, with `NEVER` mapped to infinity so comparisons stay meaningful.
fn duration_secs(duration: SimDuration) -> f64 {
    if duration == SimDuration::NEVER {
        f64::INFINITY
    } else {
        duration.as_secs_f64()
    }
}

fn target_dot(sim: &Simulation, spell: SpellId) -> Option<crate::ids::DotId> {
    let caster = sim.spell(spell).ok()?.caster();
    match sim.aoe_dot(spell) {
        Some(dot) => Some(dot),
        None => sim.dot_for(spell, sim.unit(caster).ok()?.current_target()?),
    }
}

fn compare(op: CompareOp, lhs: &APLValue, rhs: &APLValue, sim: &Simulation) -> bool {
    match (lhs.value_type(), rhs.value_type()) {
        (ValueType::String, ValueType::String) => op.apply(lhs.get_string(sim), rhs.get_string(sim)),
        (ValueType::Bool, ValueType::Bool) => op.apply(lhs.get_bool(sim), rhs.get_bool(sim)),
        (ValueType::Int, ValueType::Int) => op.apply(lhs.get_int(sim), rhs.get_int(sim)),
        (ValueType::Duration, ValueType::Duration) => {
            op.apply(lhs.get_duration(sim), rhs.get_duration(sim))
        }
        _ => op.apply(lhs.get_float(sim), rhs.get_float(sim)),
    }
}

impl fmt::Display for APLValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, name: &str, values: &[APLValue]) -> fmt::Result {
            write!(f, "{name}(")?;
            for (index, value) in values.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::Const(Literal::Float(value)) => write!(f, "{value}"),
            Self::Const(Literal::Int(value)) => write!(f, "{value}"),
            Self::Const(Literal::Bool(value)) => write!(f, "{value}"),
            Self::Const(Literal::Duration(value)) => write!(f, "{value}"),
            Self::Const(Literal::String(value)) => write!(f, "{value:?}"),
            Self::CurrentTime => f.write_str("Current Time"),
            Self::RemainingTime => f.write_str("Remaining Time"),
            Self::CurrentResource { kind, .. } => write!(f, "Current {}", kind.display_name()),
            Self::CurrentResourcePercent { kind, .. } => write!(f, "Current {} %", kind.display_name()),
            Self::MaxResourceSnapshot { kind, max } => write!(f, "Max {}({max})", kind.display_name()),
            Self::AuraActive(aura) => write!(f, "Aura Active({aura})"),
            Self::AuraStacks(aura) => write!(f, "Aura Stacks({aura})"),
            Self::AuraRemainingTime(aura) => write!(f, "Aura Remaining({aura})"),
            Self::SpellIsReady(spell) => write!(f, "Spell Ready({spell})"),
            Self::SpellCanCast(spell) => write!(f, "Can Cast({spell})"),
            Self::SpellCooldownRemaining(spell) => write!(f, "Cooldown Remaining({spell})"),
            Self::SpellCharges(spell) => write!(f, "Charges({spell})"),
            Self::SpellTimeToNextCharge(spell) => write!(f, "Time To Next Charge({spell})"),
            Self::DotIsActive(spell) => write!(f, "Dot Active({spell})"),
            Self::DotRemainingTicks(spell) => write!(f, "Dot Remaining Ticks({spell})"),
            Self::Compare { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Math { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::And(values) => list(f, "And", values),
            Self::Or(values) => list(f, "Or", values),
            Self::Not(value) => write!(f, "Not({value})"),
            Self::Min(values) => list(f, "Min", values),
            Self::Max(values) => list(f, "Max", values),
        }
    }
}

impl fmt::Display for AuraSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(aura) => write!(f, "{aura}"),
            Self::ByLabel { label, .. } => write!(f, "target:{label}"),
        }
    }
}
