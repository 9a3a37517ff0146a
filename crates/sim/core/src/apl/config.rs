//! Declarative rotation description, as loaded from rotation files.
use super::value::{CompareOp, Literal, MathOp};

/// Which unit a value reads, relative to the rotation's owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnitReference {
    #[default]
    Player,
    CurrentTarget,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueConfig {
    Const(Literal),
    CurrentTime,
    RemainingTime,
    CurrentHealth {
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    CurrentHealthPercent {
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    CurrentMana {
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    CurrentManaPercent {
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    CurrentRage,
    CurrentFocus,
    CurrentEnergy,
    CurrentComboPoints,
    CurrentRunicPower,
    CurrentChi,
    MaxRunicPower,
    AuraIsActive {
        aura: String,
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    AuraNumStacks {
        aura: String,
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    AuraRemainingTime {
        aura: String,
        #[cfg_attr(feature = "serde", serde(default))]
        unit: UnitReference,
    },
    SpellIsReady {
        spell: String,
    },
    SpellCanCast {
        spell: String,
    },
    SpellCooldownRemaining {
        spell: String,
    },
    SpellCharges {
        spell: String,
    },
    SpellTimeToNextCharge {
        spell: String,
    },
    DotIsActive {
        spell: String,
    },
    DotRemainingTicks {
        spell: String,
    },
    Cmp {
        op: CompareOp,
        lhs: Box<ValueConfig>,
        rhs: Box<ValueConfig>,
    },
    Math {
        op: MathOp,
        lhs: Box<ValueConfig>,
        rhs: Box<ValueConfig>,
    },
    And(Vec<ValueConfig>),
    Or(Vec<ValueConfig>),
    Not(Box<ValueConfig>),
    Min(Vec<ValueConfig>),
    Max(Vec<ValueConfig>),
}

impl ValueConfig {
    pub fn cmp(op: CompareOp, lhs: ValueConfig, rhs: ValueConfig) -> Self {
        Self::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn float(value: f64) -> Self {
        Self::Const(Literal::Float(value))
    }

    pub fn int(value: i64) -> Self {
        Self::Const(Literal::Int(value))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionConfig {
    CastSpell {
        spell: String,
        #[cfg_attr(feature = "serde", serde(default = "default_cast_target"))]
        target: UnitReference,
    },
    /// Idle for the given duration before deciding again.
    Wait { duration: ValueConfig },
}

#[cfg(feature = "serde")]
fn default_cast_target() -> UnitReference {
    UnitReference::CurrentTarget
}

/// One priority-list entry: do `action` when `condition` holds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleConfig {
    pub id: String,
    pub action: ActionConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub condition: Option<ValueConfig>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub disabled: bool,
}

impl RuleConfig {
    pub fn cast(id: impl Into<String>, spell: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: ActionConfig::CastSpell {
                spell: spell.into(),
                target: UnitReference::CurrentTarget,
            },
            condition: None,
            disabled: false,
        }
    }

    pub fn when(mut self, condition: ValueConfig) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Rules in priority order; the first rule whose condition holds and whose
/// action succeeds wins.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RotationConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<RuleConfig>,
}

impl RotationConfig {
    pub fn new(rules: Vec<RuleConfig>) -> Self {
        Self { rules }
    }
}
