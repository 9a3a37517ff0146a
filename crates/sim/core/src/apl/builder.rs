//! Construction and validation of decision values.
//!
//! Values are checked against the owner's capabilities once, here. A
//! `Warning` drops the value (inside `And`/`Or`/`Min`/`Max` only the failing
//! child is dropped and the warning is kept in [`ValueBuilder::dropped`]); an
//! `Error` disables the rule being built.
use std::sync::Arc;

use crate::engine::Simulation;
use crate::ids::{SpellId, UnitId};
use crate::resource::ResourceKind;

use super::config::{UnitReference, ValueConfig};
use super::diagnostic::Diagnostic;
use super::value::{APLValue, AuraSelector, UnitSelector, ValueType};

pub struct ValueBuilder<'a> {
    sim: &'a Simulation,
    owner: UnitId,
    rule: Option<String>,
    dropped: Vec<Diagnostic>,
}

impl<'a> ValueBuilder<'a> {
    pub fn new(sim: &'a Simulation, owner: UnitId) -> Self {
        Self {
            sim,
            owner,
            rule: None,
            dropped: Vec::new(),
        }
    }

    /// Stamps subsequent diagnostics with `rule`.
    pub fn for_rule(&mut self, rule: impl Into<String>) -> &mut Self {
        self.rule = Some(rule.into());
        self
    }

    /// Warnings for children dropped from composite values.
    pub fn dropped(&self) -> &[Diagnostic] {
        &self.dropped
    }

    pub fn take_dropped(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.dropped)
    }

    pub fn build(&mut self, config: &ValueConfig) -> Result<APLValue, Diagnostic> {
        self.build_node(config).map_err(|diagnostic| match &self.rule {
            Some(rule) if diagnostic.rule.is_none() => diagnostic.in_rule(rule.clone()),
            _ => diagnostic,
        })
    }

    fn build_node(&mut self, config: &ValueConfig) -> Result<APLValue, Diagnostic> {
        Ok(match config {
            ValueConfig::Const(literal) => APLValue::Const(literal.clone()),
            ValueConfig::CurrentTime => APLValue::CurrentTime,
            ValueConfig::RemainingTime => APLValue::RemainingTime,
            ValueConfig::CurrentHealth { unit } => APLValue::CurrentResource {
                unit: self.resource_unit(*unit, ResourceKind::Health)?,
                kind: ResourceKind::Health,
            },
            ValueConfig::CurrentHealthPercent { unit } => APLValue::CurrentResourcePercent {
                unit: self.resource_unit(*unit, ResourceKind::Health)?,
                kind: ResourceKind::Health,
            },
            ValueConfig::CurrentMana { unit } => APLValue::CurrentResource {
                unit: self.resource_unit(*unit, ResourceKind::Mana)?,
                kind: ResourceKind::Mana,
            },
            ValueConfig::CurrentManaPercent { unit } => APLValue::CurrentResourcePercent {
                unit: self.resource_unit(*unit, ResourceKind::Mana)?,
                kind: ResourceKind::Mana,
            },
            ValueConfig::AuraIsActive { aura, unit } => APLValue::AuraActive(self.aura(aura, *unit)?),
            ValueConfig::AuraNumStacks { aura, unit } => APLValue::AuraStacks(self.aura(aura, *unit)?),
            ValueConfig::AuraRemainingTime { aura, unit } => {
                APLValue::AuraRemainingTime(self.aura(aura, *unit)?)
            }
            ValueConfig::SpellIsReady { spell } => APLValue::SpellIsReady(self.spell(spell)?),
            ValueConfig::SpellCanCast { spell } => APLValue::SpellCanCast(self.spell(spell)?),
            ValueConfig::SpellCooldownRemaining { spell } => {
                APLValue::SpellCooldownRemaining(self.spell(spell)?)
            }
            ValueConfig::SpellCharges { spell } => APLValue::SpellCharges(self.charged_spell(spell)?),
            ValueConfig::SpellTimeToNextCharge { spell } => {
                APLValue::SpellTimeToNextCharge(self.charged_spell(spell)?)
            }
            ValueConfig::DotIsActive { spell } => APLValue::DotIsActive(self.dot_spell(spell)?),
            ValueConfig::DotRemainingTicks { spell } => {
                APLValue::DotRemainingTicks(self.dot_spell(spell)?)
            }
            ValueConfig::Cmp { op, lhs, rhs } => {
                let lhs = self.build_node(lhs)?;
                let rhs = self.build_node(rhs)?;
                let strings = [lhs.value_type(), rhs.value_type()]
                    .iter()
                    .filter(|ty| **ty == ValueType::String)
                    .count();
                if strings == 1 {
                    return Err(Diagnostic::warning(format!(
                        "cannot compare {lhs} with {rhs}"
                    )));
                }
                APLValue::Compare {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
            ValueConfig::Math { op, lhs, rhs } => APLValue::Math {
                op: *op,
                lhs: Box::new(self.build_node(lhs)?),
                rhs: Box::new(self.build_node(rhs)?),
            },
            ValueConfig::Not(inner) => APLValue::Not(Box::new(self.build_node(inner)?)),
            ValueConfig::And(children) => APLValue::And(self.build_children("And", children)?),
            ValueConfig::Or(children) => APLValue::Or(self.build_children("Or", children)?),
            ValueConfig::Min(children) => APLValue::Min(self.build_children("Min", children)?),
            ValueConfig::Max(children) => APLValue::Max(self.build_children("Max", children)?),
            ValueConfig::CurrentRage => self.player_resource(config, ResourceKind::Rage)?,
            ValueConfig::CurrentFocus => self.player_resource(config, ResourceKind::Focus)?,
            ValueConfig::CurrentEnergy => self.player_resource(config, ResourceKind::Energy)?,
            ValueConfig::CurrentComboPoints => self.player_resource(config, ResourceKind::ComboPoints)?,
            ValueConfig::CurrentRunicPower | ValueConfig::MaxRunicPower => {
                self.player_resource(config, ResourceKind::RunicPower)?
            }
            ValueConfig::CurrentChi => self.player_resource(config, ResourceKind::Chi)?,
        })
    }

    /// Builds every child, dropping the ones that only warn.
    fn build_children(&mut self, name: &str, children: &[ValueConfig]) -> Result<Vec<APLValue>, Diagnostic> {
        let mut built = Vec::with_capacity(children.len());
        for child in children {
            match self.build_node(child) {
                Ok(value) => built.push(value),
                Err(diagnostic) if diagnostic.is_error() => return Err(diagnostic),
                Err(diagnostic) => {
                    let diagnostic = match &self.rule {
                        Some(rule) => diagnostic.in_rule(rule.clone()),
                        None => diagnostic,
                    };
                    self.dropped.push(diagnostic);
                }
            }
        }
        if built.is_empty() {
            return Err(Diagnostic::warning(format!("{name} has no valid operands")));
        }
        Ok(built)
    }

    fn player_resource(&self, config: &ValueConfig, kind: ResourceKind) -> Result<APLValue, Diagnostic> {
        let unit = self.sim.unit(self.owner).map_err(|err| Diagnostic::error(err.to_string()))?;
        if !unit.has_resource(kind) {
            let message = format!("{} does not use {}", unit.label(), kind.display_name());
            // The snapshot has nothing to capture; the rule cannot work.
            return Err(if matches!(config, ValueConfig::MaxRunicPower) {
                Diagnostic::error(message)
            } else {
                Diagnostic::warning(message)
            });
        }
        Ok(match config {
            ValueConfig::MaxRunicPower => APLValue::MaxResourceSnapshot {
                kind,
                max: self.sim.max_resource(self.owner, kind).unwrap_or(0.0),
            },
            _ => APLValue::CurrentResource {
                unit: UnitSelector::Fixed(self.owner),
                kind,
            },
        })
    }

    fn selector(&self, unit: UnitReference) -> UnitSelector {
        match unit {
            UnitReference::Player => UnitSelector::Fixed(self.owner),
            UnitReference::CurrentTarget => UnitSelector::TargetOf(self.owner),
        }
    }

    /// Resolves the reference as it stands now and checks the capability.
    fn resource_unit(&self, unit: UnitReference, kind: ResourceKind) -> Result<UnitSelector, Diagnostic> {
        let selector = self.selector(unit);
        let Some(resolved) = selector.resolve(self.sim) else {
            return Err(Diagnostic::warning("no current target"));
        };
        let unit = self.sim.unit(resolved).map_err(|err| Diagnostic::warning(err.to_string()))?;
        if !unit.has_resource(kind) {
            return Err(Diagnostic::warning(format!(
                "{} does not use {}",
                unit.label(),
                kind.display_name()
            )));
        }
        Ok(selector)
    }

    fn aura(&self, label: &str, unit: UnitReference) -> Result<AuraSelector, Diagnostic> {
        let selector = self.selector(unit);
        let holder = selector
            .resolve(self.sim)
            .ok_or_else(|| Diagnostic::warning("no current target"))?;
        let Some(aura) = self.sim.aura_by_label(holder, label) else {
            return Err(Diagnostic::warning(format!("no aura named '{label}'")));
        };
        Ok(match selector {
            UnitSelector::Fixed(_) => AuraSelector::Fixed(aura),
            UnitSelector::TargetOf(_) => AuraSelector::ByLabel {
                unit: selector,
                label: Arc::from(label),
            },
        })
    }

    fn spell(&self, label: &str) -> Result<SpellId, Diagnostic> {
        self.sim
            .spell_by_label(self.owner, label)
            .ok_or_else(|| Diagnostic::warning(format!("no spell named '{label}'")))
    }

    fn charged_spell(&self, label: &str) -> Result<SpellId, Diagnostic> {
        let spell = self.spell(label)?;
        if self.sim.charge_tracker(spell).is_none() {
            return Err(Diagnostic::warning(format!("'{label}' has no charges")));
        }
        Ok(spell)
    }

    fn dot_spell(&self, label: &str) -> Result<SpellId, Diagnostic> {
        let spell = self.spell(label)?;
        let has_dot = self
            .sim
            .spell(spell)
            .is_ok_and(|spell_ref| spell_ref.config().dot.is_some());
        if !has_dot {
            return Err(Diagnostic::warning(format!("'{label}' has no periodic effect")));
        }
        Ok(spell)
    }
}
