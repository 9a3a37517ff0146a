//! Combatants and their per-unit state.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arrayvec::ArrayVec;
use tracing::trace;

use crate::config::SimConfig;
use crate::engine::{ActionHandle, Simulation};
use crate::error::{KernelFault, SimResult};
use crate::ids::{ActionId, AuraId, SpellId, UnitId};
use crate::metrics::MetricKind;
use crate::resource::{ResourceError, ResourceKind, ResourcePool, ResourceSet};
use crate::time::{SimDuration, SimTime};

/// Bounded list of encounter targets.
pub type TargetList = ArrayVec<UnitId, { SimConfig::MAX_TARGETS }>;

/// Invoked with `(old_cast_speed, new_cast_speed)` after a haste change.
pub type CastSpeedListener =
    Arc<dyn Fn(&mut Simulation, UnitId, f64, f64) -> SimResult<()> + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    Player,
    Enemy,
}

/// What the unit is doing with its hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastState {
    Idle,
    Casting {
        spell: SpellId,
        completes_at: SimTime,
    },
    Channeling {
        spell: SpellId,
    },
}

impl CastState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Passive melee swing parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoAttackConfig {
    pub action_id: ActionId,
    /// Unhasted time between swings.
    pub swing_speed: SimDuration,
    /// Damage per swing before crits.
    pub damage: f64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct AutoAttackState {
    pub(crate) config: AutoAttackConfig,
    /// False while suppressed by `stop_melee_until`.
    pub(crate) swinging: bool,
    pub(crate) next_swing_at: SimTime,
    /// Pending swing while swinging, pending resume otherwise.
    pub(crate) pending: Option<ActionHandle>,
}

pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) label: String,
    pub(crate) kind: UnitKind,
    pub(crate) resources: ResourceSet,
    pub(crate) auras: BTreeMap<String, AuraId>,
    pub(crate) spells: BTreeMap<String, SpellId>,
    /// Haste multiplier; cast speed is its inverse.
    pub(crate) haste: f64,
    pub(crate) crit_chance: f64,
    pub(crate) attack_power: f64,
    /// Yards per second.
    pub(crate) movement_speed: f64,
    pub(crate) distance: Option<f64>,
    pub(crate) gcd_ready_at: SimTime,
    pub(crate) cast_state: CastState,
    pub(crate) moving_until: SimTime,
    pub(crate) current_target: Option<UnitId>,
    pub(crate) auto_attacks: Option<AutoAttackState>,
    pub(crate) cast_speed_listeners: Vec<CastSpeedListener>,
    pub(crate) decision: Option<ActionHandle>,
}

impl Unit {
    pub const DEFAULT_MOVEMENT_SPEED: f64 = 7.0;

    pub fn new(kind: UnitKind, label: impl Into<String>) -> Self {
        Self {
            id: UnitId(u32::MAX),
            label: label.into(),
            kind,
            resources: ResourceSet::new(),
            auras: BTreeMap::new(),
            spells: BTreeMap::new(),
            haste: 1.0,
            crit_chance: 0.0,
            attack_power: 0.0,
            movement_speed: Self::DEFAULT_MOVEMENT_SPEED,
            distance: None,
            gcd_ready_at: SimTime::ZERO,
            cast_state: CastState::Idle,
            moving_until: SimTime::ZERO,
            current_target: None,
            auto_attacks: None,
            cast_speed_listeners: Vec::new(),
            decision: None,
        }
    }

    pub fn player(label: impl Into<String>) -> Self {
        Self::new(UnitKind::Player, label)
    }

    pub fn enemy(label: impl Into<String>) -> Self {
        Self::new(UnitKind::Enemy, label)
    }

    pub fn with_resource(mut self, pool: ResourcePool) -> Self {
        self.resources.insert(pool);
        self
    }

    pub fn with_haste(mut self, haste: f64) -> Self {
        if haste.is_finite() && haste > 0.0 {
            self.haste = haste;
        }
        self
    }

    pub fn with_crit_chance(mut self, crit_chance: f64) -> Self {
        self.crit_chance = crit_chance.clamp(0.0, 1.0);
        self
    }

    pub fn with_attack_power(mut self, attack_power: f64) -> Self {
        self.attack_power = attack_power.max(0.0);
        self
    }

    pub fn with_movement_speed(mut self, yards_per_second: f64) -> Self {
        if yards_per_second.is_finite() && yards_per_second > 0.0 {
            self.movement_speed = yards_per_second;
        }
        self
    }

    pub fn with_distance(mut self, yards: f64) -> Self {
        self.distance = Some(yards.max(0.0));
        self
    }

    pub fn with_auto_attacks(mut self, config: AutoAttackConfig) -> Self {
        self.auto_attacks = Some(AutoAttackState {
            config,
            swinging: false,
            next_swing_at: SimTime::ZERO,
            pending: None,
        });
        self
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn has_resource(&self, kind: ResourceKind) -> bool {
        self.resources.has(kind)
    }

    pub fn haste(&self) -> f64 {
        self.haste
    }

    /// Multiplier applied to cast times, GCDs and hasted tick lengths.
    pub fn cast_speed(&self) -> f64 {
        1.0 / self.haste
    }

    pub fn crit_chance(&self) -> f64 {
        self.crit_chance
    }

    pub fn attack_power(&self) -> f64 {
        self.attack_power
    }

    pub fn movement_speed(&self) -> f64 {
        self.movement_speed
    }

    pub fn cast_state(&self) -> CastState {
        self.cast_state
    }

    pub fn gcd_ready_at(&self) -> SimTime {
        self.gcd_ready_at
    }

    pub fn current_target(&self) -> Option<UnitId> {
        self.current_target
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("resources", &self.resources)
            .field("haste", &self.haste)
            .field("cast_state", &self.cast_state)
            .field("gcd_ready_at", &self.gcd_ready_at)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Adds a unit and returns its id. Players get the first enemy as their
    /// current target once one exists.
    pub fn add_unit(&mut self, mut unit: Unit) -> SimResult<UnitId> {
        if unit.kind == UnitKind::Enemy && self.enemies().is_full() {
            return Err(KernelFault::TooManyTargets {
                max: SimConfig::MAX_TARGETS,
            });
        }
        let id = UnitId(self.units.len() as u32);
        unit.id = id;
        self.units.push(unit);

        if self.units[id.index()].kind == UnitKind::Enemy {
            for other in &mut self.units {
                if other.kind == UnitKind::Player && other.current_target.is_none() {
                    other.current_target = Some(id);
                }
            }
        } else if let Some(first) = self.enemies().first().copied() {
            self.units[id.index()].current_target = Some(first);
        }
        Ok(id)
    }

    pub fn unit(&self, id: UnitId) -> SimResult<&Unit> {
        self.units.get(id.index()).ok_or(KernelFault::UnknownId {
            kind: "unit",
            id: id.0,
        })
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> SimResult<&mut Unit> {
        self.units.get_mut(id.index()).ok_or(KernelFault::UnknownId {
            kind: "unit",
            id: id.0,
        })
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Enemy units in id order.
    pub fn enemies(&self) -> TargetList {
        self.units
            .iter()
            .filter(|unit| unit.kind == UnitKind::Enemy)
            .map(|unit| unit.id)
            .take(SimConfig::MAX_TARGETS)
            .collect()
    }

    /// The enemy after `after` in id order, wrapping around.
    pub fn next_target(&self, after: UnitId) -> Option<UnitId> {
        let enemies = self.enemies();
        let position = enemies.iter().position(|&id| id == after);
        match position {
            Some(index) => enemies.get((index + 1) % enemies.len()).copied(),
            None => enemies.first().copied(),
        }
    }

    pub fn set_current_target(&mut self, unit: UnitId, target: UnitId) -> SimResult<()> {
        self.unit(target)?;
        self.unit_mut(unit)?.current_target = Some(target);
        Ok(())
    }

    /// Distance from `unit` to its targets, falling back to the encounter
    /// default.
    pub fn unit_distance(&self, unit: UnitId) -> f64 {
        self.units
            .get(unit.index())
            .and_then(|unit| unit.distance)
            .unwrap_or(self.config.target_distance)
    }

    // ========================================================================
    // Resource capability queries
    // ========================================================================

    pub fn has_resource(&self, unit: UnitId, kind: ResourceKind) -> bool {
        self.units
            .get(unit.index())
            .is_some_and(|unit| unit.resources.has(kind))
    }

    fn pool(&self, unit: UnitId, kind: ResourceKind) -> Option<&ResourcePool> {
        self.units.get(unit.index())?.resources.get(kind)
    }

    fn pool_mut(&mut self, unit: UnitId, kind: ResourceKind) -> Result<&mut ResourcePool, ResourceError> {
        self.units
            .get_mut(unit.index())
            .and_then(|u| u.resources.get_mut(kind))
            .ok_or(ResourceError::Missing {
                unit,
                resource: kind,
            })
    }

    pub fn current_resource(&self, unit: UnitId, kind: ResourceKind) -> Option<f64> {
        self.pool(unit, kind).map(|pool| pool.current_at(self.now))
    }

    pub fn max_resource(&self, unit: UnitId, kind: ResourceKind) -> Option<f64> {
        self.pool(unit, kind).map(ResourcePool::max)
    }

    /// Current value as a fraction of max, in `[0, 1]`.
    pub fn resource_percent(&self, unit: UnitId, kind: ResourceKind) -> Option<f64> {
        self.pool(unit, kind).map(|pool| pool.fraction_at(self.now))
    }

    pub fn can_afford(&self, unit: UnitId, kind: ResourceKind, cost: f64) -> bool {
        self.pool(unit, kind)
            .is_some_and(|pool| pool.can_afford(cost, self.now))
    }

    /// Time until `unit` regenerates to `amount` of `kind`.
    pub fn time_until_resource(&self, unit: UnitId, kind: ResourceKind, amount: f64) -> Option<SimDuration> {
        self.pool(unit, kind)?.time_until(amount, self.now)
    }

    // ========================================================================
    // Resource mutation (metric-recording)
    // ========================================================================

    /// Spends `cost`. Rejected spends leave the pool untouched and record
    /// nothing.
    pub fn spend(
        &mut self,
        unit: UnitId,
        kind: ResourceKind,
        cost: f64,
        action: ActionId,
    ) -> Result<f64, ResourceError> {
        let now = self.now;
        let remaining = self.pool_mut(unit, kind)?.spend(cost, now)?;
        self.record_metric(
            unit,
            action,
            MetricKind::ResourceSpend {
                resource: kind,
                amount: cost,
            },
        );
        Ok(remaining)
    }

    /// Gains up to `amount`, clamped to max. Returns the amount actually
    /// gained; the metric records both.
    pub fn gain(
        &mut self,
        unit: UnitId,
        kind: ResourceKind,
        amount: f64,
        action: ActionId,
    ) -> Result<f64, ResourceError> {
        let now = self.now;
        let actual = self.pool_mut(unit, kind)?.gain(amount, now)?;
        self.record_metric(
            unit,
            action,
            MetricKind::ResourceGain {
                resource: kind,
                requested: amount,
                actual,
            },
        );
        Ok(actual)
    }

    pub(crate) fn drain(&mut self, unit: UnitId, kind: ResourceKind, amount: f64) -> SimResult<f64> {
        let now = self.now;
        match self.pool_mut(unit, kind) {
            Ok(pool) => Ok(pool.drain(amount, now)?),
            Err(ResourceError::Missing { .. }) => Ok(0.0),
            Err(err) => Err(err.into()),
        }
    }

    pub fn set_max_resource(&mut self, unit: UnitId, kind: ResourceKind, max: f64) -> SimResult<()> {
        let now = self.now;
        self.pool_mut(unit, kind)?.set_max(max, now)?;
        Ok(())
    }

    pub fn multiply_resource_regen(&mut self, unit: UnitId, kind: ResourceKind, factor: f64) -> SimResult<()> {
        let now = self.now;
        self.pool_mut(unit, kind)?.multiply_regen(factor, now)?;
        Ok(())
    }

    // ========================================================================
    // Haste, GCD, movement
    // ========================================================================

    pub fn cast_speed(&self, unit: UnitId) -> f64 {
        self.units
            .get(unit.index())
            .map_or(1.0, Unit::cast_speed)
    }

    /// Scales `duration` by the unit's cast speed.
    pub fn apply_cast_speed(&self, unit: UnitId, duration: SimDuration) -> SimDuration {
        duration.mul_f64(self.cast_speed(unit))
    }

    /// Registers a listener fired after every change of `unit`'s cast speed.
    pub fn on_cast_speed_changed(
        &mut self,
        unit: UnitId,
        listener: impl Fn(&mut Simulation, UnitId, f64, f64) -> SimResult<()> + Send + Sync + 'static,
    ) -> SimResult<()> {
        self.unit_mut(unit)?.cast_speed_listeners.push(Arc::new(listener));
        Ok(())
    }

    /// Multiplies haste by `factor`; apply `1.0 / factor` to revert.
    pub fn multiply_haste(&mut self, unit: UnitId, factor: f64) -> SimResult<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(KernelFault::EffectFailed {
                label: "haste".into(),
                reason: format!("invalid haste factor {factor}"),
            });
        }
        let (old, new, listeners) = {
            let unit_ref = self.unit_mut(unit)?;
            let old = unit_ref.cast_speed();
            unit_ref.haste *= factor;
            (old, unit_ref.cast_speed(), unit_ref.cast_speed_listeners.clone())
        };
        trace!(target: "sim_core::unit", unit = %unit, old, new, "cast speed changed");
        for listener in listeners {
            listener(self, unit, old, new)?;
        }
        Ok(())
    }

    pub fn is_gcd_ready(&self, unit: UnitId) -> bool {
        self.units
            .get(unit.index())
            .is_some_and(|unit| unit.gcd_ready_at <= self.now)
    }

    pub fn gcd_ready_at(&self, unit: UnitId) -> SimTime {
        self.units
            .get(unit.index())
            .map_or(SimTime::ZERO, |unit| unit.gcd_ready_at)
    }

    /// Pushes the GCD out to `until`; never shortens it.
    pub fn extend_gcd_until(&mut self, unit: UnitId, until: SimTime) -> SimResult<()> {
        let unit = self.unit_mut(unit)?;
        if until > unit.gcd_ready_at {
            unit.gcd_ready_at = until;
        }
        Ok(())
    }

    /// Starts moving for `duration`. Hard casts are refused until it ends.
    pub fn move_for(&mut self, unit: UnitId, duration: SimDuration) -> SimResult<SimTime> {
        let until = self.now + duration;
        let unit = self.unit_mut(unit)?;
        if until > unit.moving_until {
            unit.moving_until = until;
        }
        Ok(unit.moving_until)
    }

    pub fn is_moving(&self, unit: UnitId) -> bool {
        self.units
            .get(unit.index())
            .is_some_and(|unit| unit.moving_until > self.now)
    }

    // ========================================================================
    // Decision points
    // ========================================================================

    /// Ensures a decision point for `unit` is pending at or before `at`.
    pub fn request_decision(&mut self, unit: UnitId, at: SimTime) -> SimResult<()> {
        let at = at.max(self.now);
        let existing = self.unit(unit)?.decision;
        if let Some(handle) = existing {
            if self.queue.contains(handle) && handle.fire_at() <= at {
                return Ok(());
            }
            self.queue.cancel(handle);
        }
        let handle = self.schedule_decision(unit, at);
        self.unit_mut(unit)?.decision = Some(handle);
        Ok(())
    }

    /// When an idle unit should next re-evaluate its rotation: the end of its
    /// GCD or the next poll, whichever is sooner. `None` while casting or
    /// channeling; completion wakes the unit instead.
    pub fn next_decision_time(&self, unit: UnitId) -> Option<SimTime> {
        let unit = self.units.get(unit.index())?;
        if !unit.cast_state.is_idle() {
            return None;
        }
        let poll = self.now + self.config.decision_poll_interval;
        if unit.gcd_ready_at > self.now {
            Some(unit.gcd_ready_at.min(poll))
        } else {
            Some(poll)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sim() -> Simulation {
        Simulation::new(SimConfig::default())
    }

    #[test]
    fn players_target_first_enemy() {
        let mut sim = sim();
        let player = sim.add_unit(Unit::player("Monk")).unwrap();
        let boss = sim.add_unit(Unit::enemy("Boss")).unwrap();
        let add = sim.add_unit(Unit::enemy("Add")).unwrap();
        assert_eq!(sim.unit(player).unwrap().current_target(), Some(boss));
        assert_eq!(sim.next_target(boss), Some(add));
        assert_eq!(sim.next_target(add), Some(boss));
    }

    #[test]
    fn enemy_count_is_bounded() {
        let mut sim = sim();
        for i in 0..SimConfig::MAX_TARGETS {
            sim.add_unit(Unit::enemy(format!("Target {i}"))).unwrap();
        }
        let err = sim.add_unit(Unit::enemy("One too many")).unwrap_err();
        assert!(matches!(err, KernelFault::TooManyTargets { .. }));
    }

    #[test]
    fn capability_queries_are_map_lookups() {
        let mut sim = sim();
        let unit = sim
            .add_unit(
                Unit::player("Monk")
                    .with_resource(ResourcePool::new(ResourceKind::Energy, 50.0, 100.0)),
            )
            .unwrap();
        assert!(sim.has_resource(unit, ResourceKind::Energy));
        assert_eq!(sim.current_resource(unit, ResourceKind::Mana), None);
        assert_eq!(sim.resource_percent(unit, ResourceKind::Energy), Some(0.5));
    }

    #[test]
    fn spend_records_metric_only_on_success() {
        let mut sim = sim();
        let unit = sim
            .add_unit(Unit::player("Monk").with_resource(ResourcePool::new(ResourceKind::Chi, 1.0, 4.0)))
            .unwrap();
        let action = ActionId::spell(1);
        assert!(sim.spend(unit, ResourceKind::Chi, 2.0, action).is_err());
        assert!(sim.metrics().is_empty());
        sim.spend(unit, ResourceKind::Chi, 1.0, action).unwrap();
        assert_eq!(sim.metrics().len(), 1);
        assert_eq!(sim.current_resource(unit, ResourceKind::Chi), Some(0.0));
    }

    #[test]
    fn haste_listeners_see_old_and_new_cast_speed() {
        let mut sim = sim();
        let unit = sim.add_unit(Unit::player("Monk")).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        sim.on_cast_speed_changed(unit, move |_, _, old, new| {
            assert_eq!(old, 1.0);
            assert!((new - 0.8).abs() < 1e-12);
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        sim.multiply_haste(unit, 1.25).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            sim.apply_cast_speed(unit, SimDuration::from_secs(1)),
            SimDuration::from_millis(800)
        );
    }

    #[test]
    fn gcd_extension_never_shortens() {
        let mut sim = sim();
        let unit = sim.add_unit(Unit::player("Monk")).unwrap();
        sim.extend_gcd_until(unit, SimTime::from_secs(2)).unwrap();
        sim.extend_gcd_until(unit, SimTime::from_secs(1)).unwrap();
        assert_eq!(sim.gcd_ready_at(unit), SimTime::from_secs(2));
        assert_eq!(sim.next_decision_time(unit), Some(SimTime::from_millis(100)));
    }
}
