//! Periodic effects (damage/healing over time, channels).
//!
//! A dot belongs to one spell and either one target or, for AoE effects, the
//! whole encounter. Applying it schedules the first tick one period out; each
//! tick reschedules the next until the tick budget is spent. Ending a dot is
//! always deferred to a zero-delay follow-up when requested from a tick, and
//! a synchronous deactivation from inside its own tick is a fault.
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::aura::AuraConfig;
use crate::engine::{ActionHandle, ActionPriority, Simulation};
use crate::error::{KernelFault, SimResult};
use crate::ids::{AuraId, DotId, SpellId, UnitId};
use crate::spell::SpellCost;
use crate::time::{SimDuration, SimTime};

/// Invoked once per tick per affected target.
pub type TickFn = Arc<dyn Fn(&mut Simulation, DotId, UnitId) -> SimResult<()> + Send + Sync>;
/// Cost charged to the caster before each tick; an unaffordable tick ends
/// the dot.
pub type TickCostFn = Arc<dyn Fn(&Simulation, DotId) -> Option<SpellCost> + Send + Sync>;

#[derive(Clone)]
pub struct DotConfig {
    pub label: String,
    pub number_of_ticks: u32,
    pub tick_length: SimDuration,
    /// Scale the tick length by the caster's cast speed.
    pub affected_by_cast_speed: bool,
    /// With cast-speed scaling: keep the tick count and shorten the
    /// duration. Without it, add ticks so the base duration is kept.
    pub haste_reduces_duration: bool,
    pub is_aoe: bool,
    pub tick_cost: Option<TickCostFn>,
    pub on_tick: Option<TickFn>,
}

impl DotConfig {
    pub fn new(label: impl Into<String>, number_of_ticks: u32, tick_length: SimDuration) -> Self {
        Self {
            label: label.into(),
            number_of_ticks,
            tick_length,
            affected_by_cast_speed: false,
            haste_reduces_duration: false,
            is_aoe: false,
            tick_cost: None,
            on_tick: None,
        }
    }

    pub fn affected_by_cast_speed(mut self, haste_reduces_duration: bool) -> Self {
        self.affected_by_cast_speed = true;
        self.haste_reduces_duration = haste_reduces_duration;
        self
    }

    pub fn aoe(mut self) -> Self {
        self.is_aoe = true;
        self
    }

    pub fn with_tick_cost(mut self, cost: SpellCost) -> Self {
        self.tick_cost = Some(Arc::new(move |_, _| Some(cost)));
        self
    }

    pub fn with_tick_cost_fn(
        mut self,
        f: impl Fn(&Simulation, DotId) -> Option<SpellCost> + Send + Sync + 'static,
    ) -> Self {
        self.tick_cost = Some(Arc::new(f));
        self
    }

    pub fn on_tick(
        mut self,
        f: impl Fn(&mut Simulation, DotId, UnitId) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_tick = Some(Arc::new(f));
        self
    }

    /// Unscaled total duration.
    pub fn base_duration(&self) -> SimDuration {
        self.tick_length * self.number_of_ticks
    }
}

impl fmt::Debug for DotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DotConfig")
            .field("label", &self.label)
            .field("number_of_ticks", &self.number_of_ticks)
            .field("tick_length", &self.tick_length)
            .field("affected_by_cast_speed", &self.affected_by_cast_speed)
            .field("haste_reduces_duration", &self.haste_reduces_duration)
            .field("is_aoe", &self.is_aoe)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DotState {
    pub active: bool,
    pub remaining_ticks: u32,
    pub ticks_fired: u32,
    pub tick_period: SimDuration,
    pub applied_at: SimTime,
    pub next_tick_at: Option<SimTime>,
    pub expires_at: Option<SimTime>,
    pub(crate) tick_handle: Option<ActionHandle>,
    pub(crate) cleanup_handle: Option<ActionHandle>,
    pub(crate) in_tick: bool,
}

#[derive(Debug)]
pub struct Dot {
    pub(crate) id: DotId,
    pub(crate) spell: SpellId,
    pub(crate) caster: UnitId,
    pub(crate) target: Option<UnitId>,
    pub(crate) config: DotConfig,
    pub(crate) aura: AuraId,
    pub(crate) state: DotState,
}

impl Dot {
    pub fn id(&self) -> DotId {
        self.id
    }

    pub fn spell(&self) -> SpellId {
        self.spell
    }

    pub fn caster(&self) -> UnitId {
        self.caster
    }

    /// `None` for AoE dots.
    pub fn target(&self) -> Option<UnitId> {
        self.target
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Aura mirroring the dot's active state, on the target (or the caster
    /// for AoE dots).
    pub fn aura(&self) -> AuraId {
        self.aura
    }

    pub fn state(&self) -> &DotState {
        &self.state
    }
}

impl Simulation {
    pub(crate) fn create_dot(
        &mut self,
        spell: SpellId,
        caster: UnitId,
        target: Option<UnitId>,
        config: DotConfig,
    ) -> SimResult<DotId> {
        let action_id = self.spell(spell)?.action_id();
        let aura = self.register_aura(
            target.unwrap_or(caster),
            AuraConfig::never_expires(config.label.clone()).with_action_id(action_id),
        )?;
        let id = DotId(self.dots.len() as u32);
        self.dots.push(Dot {
            id,
            spell,
            caster,
            target,
            config,
            aura,
            state: DotState::default(),
        });
        Ok(id)
    }

    pub fn dot(&self, id: DotId) -> SimResult<&Dot> {
        self.dots.get(id.index()).ok_or(KernelFault::UnknownId {
            kind: "dot",
            id: id.0,
        })
    }

    fn dot_mut(&mut self, id: DotId) -> SimResult<&mut Dot> {
        self.dots.get_mut(id.index()).ok_or(KernelFault::UnknownId {
            kind: "dot",
            id: id.0,
        })
    }

    /// `(tick count, tick period)` the dot would use if applied now.
    pub fn dot_cadence(&self, id: DotId) -> SimResult<(u32, SimDuration)> {
        let dot = self.dot(id)?;
        let config = &dot.config;
        if !config.affected_by_cast_speed {
            return Ok((config.number_of_ticks, config.tick_length));
        }
        let period = self.apply_cast_speed(dot.caster, config.tick_length);
        if config.haste_reduces_duration || period.is_zero() {
            return Ok((config.number_of_ticks, period));
        }
        let ticks = (config.base_duration().as_secs_f64() / period.as_secs_f64()).round();
        Ok(((ticks as u32).max(1), period))
    }

    /// Starts the dot, or restarts it from scratch if already running.
    pub fn apply_dot(&mut self, id: DotId) -> SimResult<()> {
        let (ticks, period) = self.dot_cadence(id)?;
        let now = self.now;
        let (stale_tick, stale_cleanup, aura) = {
            let dot = self.dot_mut(id)?;
            if dot.state.in_tick {
                return Err(KernelFault::ReentrantDotMutation {
                    label: dot.config.label.clone(),
                });
            }
            (
                dot.state.tick_handle.take(),
                dot.state.cleanup_handle.take(),
                dot.aura,
            )
        };
        for handle in [stale_tick, stale_cleanup].into_iter().flatten() {
            self.queue.cancel(handle);
        }

        let next_tick_at = now + period;
        let handle = self.schedule(next_tick_at, ActionPriority::High, move |sim| {
            sim.run_dot_tick(id)
        })?;
        let dot = self.dot_mut(id)?;
        dot.state = DotState {
            active: true,
            remaining_ticks: ticks,
            ticks_fired: 0,
            tick_period: period,
            applied_at: now,
            next_tick_at: Some(next_tick_at),
            expires_at: Some(now + period * ticks),
            tick_handle: Some(handle),
            cleanup_handle: None,
            in_tick: false,
        };
        trace!(
            target: "sim_core::dot",
            dot = %dot.config.label,
            ticks,
            period = %period,
            "applied"
        );
        if !self.is_aura_active(aura) {
            self.activate_aura(aura)?;
        }
        Ok(())
    }

    fn run_dot_tick(&mut self, id: DotId) -> SimResult<()> {
        let (spell, caster, tick_cost) = {
            let dot = self.dot_mut(id)?;
            dot.state.tick_handle = None;
            if !dot.state.active || dot.state.remaining_ticks == 0 {
                return Ok(());
            }
            (dot.spell, dot.caster, dot.config.tick_cost.clone())
        };

        if let Some(cost) = tick_cost.and_then(|cost_fn| cost_fn(self, id)) {
            if !self.can_afford(caster, cost.resource, cost.amount) {
                return self.end_starved_dot(id);
            }
            let action_id = self.spell(spell)?.action_id();
            self.spend(caster, cost.resource, cost.amount, action_id)?;
        }

        let remaining = {
            let dot = self.dot_mut(id)?;
            dot.state.remaining_ticks -= 1;
            dot.state.ticks_fired += 1;
            dot.state.remaining_ticks
        };
        self.fire_tick_callbacks(id)?;

        if remaining > 0 {
            let next = self.now + self.dot(id)?.state.tick_period;
            let handle = self.schedule(next, ActionPriority::High, move |sim| {
                sim.run_dot_tick(id)
            })?;
            let state = &mut self.dot_mut(id)?.state;
            state.next_tick_at = Some(next);
            state.tick_handle = Some(handle);
        } else {
            self.dot_mut(id)?.state.next_tick_at = None;
            self.request_dot_deactivation(id)?;
        }
        Ok(())
    }

    fn fire_tick_callbacks(&mut self, id: DotId) -> SimResult<()> {
        let (on_tick, targets) = {
            let dot = self.dot(id)?;
            let Some(on_tick) = dot.config.on_tick.clone() else {
                return Ok(());
            };
            let targets = match dot.target {
                Some(target) => std::iter::once(target).collect(),
                None => self.enemies(),
            };
            (on_tick, targets)
        };
        self.dot_mut(id)?.state.in_tick = true;
        let result = targets
            .into_iter()
            .try_for_each(|target| on_tick(self, id, target));
        self.dot_mut(id)?.state.in_tick = false;
        result
    }

    /// The caster could not pay for a tick: resume melee, hand the GCD back
    /// after the clip delay and end the dot at this same instant.
    fn end_starved_dot(&mut self, id: DotId) -> SimResult<()> {
        let caster = self.dot(id)?.caster;
        trace!(
            target: "sim_core::dot",
            dot = %self.dot(id)?.config.label,
            at = %self.now,
            "tick unaffordable, ending"
        );
        self.enable_melee_swing(caster)?;
        let gcd_ready_at = self.now + self.config.channel_clip_delay;
        self.unit_mut(caster)?.gcd_ready_at = gcd_ready_at;
        self.request_dot_deactivation(id)
    }

    /// Schedules a zero-delay deactivation. Safe to call from a tick.
    pub fn request_dot_deactivation(&mut self, id: DotId) -> SimResult<()> {
        if self.dot(id)?.state.cleanup_handle.is_some() {
            return Ok(());
        }
        let handle = self.schedule(self.now, ActionPriority::High, move |sim| {
            sim.dot_mut(id)?.state.cleanup_handle = None;
            sim.deactivate_dot(id)
        })?;
        self.dot_mut(id)?.state.cleanup_handle = Some(handle);
        Ok(())
    }

    /// Ends the dot immediately. Faults when called from the dot's own tick;
    /// use [`Simulation::request_dot_deactivation`] there.
    pub fn deactivate_dot(&mut self, id: DotId) -> SimResult<()> {
        let (spell, aura, handles) = {
            let dot = self.dot_mut(id)?;
            if dot.state.in_tick {
                return Err(KernelFault::ReentrantDotMutation {
                    label: dot.config.label.clone(),
                });
            }
            if !dot.state.active {
                return Ok(());
            }
            dot.state.active = false;
            dot.state.remaining_ticks = 0;
            dot.state.next_tick_at = None;
            dot.state.expires_at = None;
            trace!(
                target: "sim_core::dot",
                dot = %dot.config.label,
                ticks_fired = dot.state.ticks_fired,
                "retired"
            );
            (
                dot.spell,
                dot.aura,
                [dot.state.tick_handle.take(), dot.state.cleanup_handle.take()],
            )
        };
        for handle in handles.into_iter().flatten() {
            self.queue.cancel(handle);
        }
        self.deactivate_aura(aura)?;
        self.finish_channel(spell)
    }

    /// Fires the tick callbacks once, outside the schedule. The tick budget
    /// is left alone.
    pub fn tick_dot_once(&mut self, id: DotId) -> SimResult<()> {
        if self.dot(id)?.state.in_tick {
            return Err(KernelFault::ReentrantDotMutation {
                label: self.dot(id)?.config.label.clone(),
            });
        }
        self.fire_tick_callbacks(id)
    }

    pub fn is_dot_active(&self, id: DotId) -> bool {
        self.dots.get(id.index()).is_some_and(|dot| dot.state.active)
    }

    pub fn dot_remaining_ticks(&self, id: DotId) -> u32 {
        self.dots
            .get(id.index())
            .filter(|dot| dot.state.active)
            .map_or(0, |dot| dot.state.remaining_ticks)
    }

    pub fn dot_expires_at(&self, id: DotId) -> Option<SimTime> {
        self.dots.get(id.index())?.state.expires_at
    }

    pub fn dot_remaining_duration(&self, id: DotId) -> SimDuration {
        self.dot_expires_at(id)
            .map_or(SimDuration::ZERO, |at| at - self.now)
    }

    pub fn dot_tick_period(&self, id: DotId) -> Option<SimDuration> {
        self.dots
            .get(id.index())
            .filter(|dot| dot.state.active)
            .map(|dot| dot.state.tick_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ids::ActionId;
    use crate::resource::{ResourceKind, ResourcePool};
    use crate::spell::{CastModel, CastOutcome, SpellConfig};
    use crate::unit::{AutoAttackConfig, CastState, Unit};
    use std::sync::Mutex;

    fn encounter(targets: usize, energy: f64, regen: f64) -> (Simulation, UnitId, Vec<UnitId>) {
        let mut sim = Simulation::new(SimConfig::default().with_duration(SimDuration::from_secs(30)));
        let player = sim
            .add_unit(
                Unit::player("Monk")
                    .with_resource(ResourcePool::new(ResourceKind::Energy, energy, 100.0).with_regen(regen))
                    .with_auto_attacks(AutoAttackConfig {
                        action_id: ActionId::tagged(0, 1),
                        swing_speed: SimDuration::from_secs(3),
                        damage: 10.0,
                    }),
            )
            .unwrap();
        let enemies = (0..targets)
            .map(|index| {
                sim.add_unit(
                    Unit::enemy(format!("Target {index}"))
                        .with_resource(ResourcePool::full(ResourceKind::Health, 1e6)),
                )
                .unwrap()
            })
            .collect();
        (sim, player, enemies)
    }

    fn tick_log(config: DotConfig) -> (DotConfig, Arc<Mutex<Vec<(SimTime, UnitId)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let config = config.on_tick(move |sim, _, target| {
            sink.lock().unwrap().push((sim.current_time(), target));
            Ok(())
        });
        (config, log)
    }

    #[test]
    fn fires_every_tick_then_retires() {
        let (mut sim, player, enemies) = encounter(1, 100.0, 0.0);
        let (dot_config, log) = tick_log(DotConfig::new("Rising Test", 4, SimDuration::from_secs(2)));
        let spell = sim
            .register_spell(player, SpellConfig::new("Rising Test", ActionId::spell(10)).with_dot(dot_config))
            .unwrap();
        sim.reset().unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        let dot = sim.dot_for(spell, enemies[0]).unwrap();
        assert_eq!(sim.dot_expires_at(dot), Some(SimTime::from_secs(8)));
        assert!(sim.is_aura_active(sim.dot(dot).unwrap().aura()));

        sim.run_until(SimTime::from_secs(20)).unwrap();
        let times: Vec<_> = log.lock().unwrap().iter().map(|(at, _)| *at).collect();
        assert_eq!(
            times,
            [2, 4, 6, 8].map(SimTime::from_secs).to_vec()
        );
        assert!(!sim.is_dot_active(dot));
        assert_eq!(sim.dot_remaining_ticks(dot), 0);
        assert!(!sim.is_aura_active(sim.dot(dot).unwrap().aura()));
    }

    #[test]
    fn reapplying_restarts_the_tick_budget() {
        let (mut sim, player, enemies) = encounter(1, 100.0, 0.0);
        let (dot_config, log) = tick_log(DotConfig::new("Restart", 3, SimDuration::from_secs(1)));
        let spell = sim
            .register_spell(player, SpellConfig::new("Restart", ActionId::spell(11)).with_dot(dot_config))
            .unwrap();
        sim.reset().unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        sim.run_until(SimTime::from_millis(1500)).unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        sim.run_until(SimTime::from_secs(10)).unwrap();
        // One tick before the restart, three after it.
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn haste_cadence_modifiers_are_orthogonal() {
        let (mut sim, player, enemies) = encounter(1, 100.0, 0.0);
        let compress = sim
            .register_spell(
                player,
                SpellConfig::new("Compress", ActionId::spell(12)).with_dot(
                    DotConfig::new("Compress", 6, SimDuration::from_secs(1)).affected_by_cast_speed(true),
                ),
            )
            .unwrap();
        let extend = sim
            .register_spell(
                player,
                SpellConfig::new("Extend", ActionId::spell(13)).with_dot(
                    DotConfig::new("Extend", 6, SimDuration::from_secs(1)).affected_by_cast_speed(false),
                ),
            )
            .unwrap();
        sim.multiply_haste(player, 1.5).unwrap();
        sim.reset().unwrap();
        sim.cast(compress, enemies[0]).unwrap();
        sim.cast(extend, enemies[0]).unwrap();

        let compress_dot = sim.dot_for(compress, enemies[0]).unwrap();
        let extend_dot = sim.dot_for(extend, enemies[0]).unwrap();
        assert_eq!(sim.dot_remaining_ticks(compress_dot), 6);
        assert_eq!(sim.dot_remaining_ticks(extend_dot), 9);
        assert_eq!(
            sim.dot_tick_period(compress_dot),
            sim.dot_tick_period(extend_dot)
        );
    }

    #[test]
    fn aoe_dot_enumerates_every_target_per_tick() {
        let (mut sim, player, enemies) = encounter(3, 100.0, 0.0);
        let (dot_config, log) =
            tick_log(DotConfig::new("Whirl", 2, SimDuration::from_secs(1)).aoe());
        let spell = sim
            .register_spell(player, SpellConfig::new("Whirl", ActionId::spell(14)).with_dot(dot_config))
            .unwrap();
        sim.reset().unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        assert_eq!(sim.aoe_dot(spell), sim.dot_for(spell, enemies[2]));
        sim.run_until(SimTime::from_secs(5)).unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 6);
        assert_eq!(
            log.iter().filter(|(at, _)| *at == SimTime::from_secs(1)).map(|(_, t)| *t).collect::<Vec<_>>(),
            enemies
        );
    }

    fn channel(sim: &mut Simulation, player: UnitId, log: Arc<Mutex<Vec<(SimTime, UnitId)>>>) -> SpellId {
        let sink = log.clone();
        sim.register_spell(
            player,
            SpellConfig::new("Lightning Test", ActionId::spell(117952))
                .with_cast(CastModel::Channel)
                .with_gcd(SimDuration::from_secs(1))
                .ignoring_haste()
                .with_dot(
                    DotConfig::new("Lightning Test", 6, SimDuration::from_secs(1))
                        .with_tick_cost(SpellCost::new(ResourceKind::Energy, 20.0))
                        .on_tick(move |sim, _, target| {
                            sink.lock().unwrap().push((sim.current_time(), target));
                            Ok(())
                        }),
                )
                .with_effects(|sim, spell, target| {
                    let caster = sim.spell(spell)?.caster();
                    let Some(dot) = sim.dot_for(spell, target) else {
                        return Ok(());
                    };
                    sim.apply_dot(dot)?;
                    if let Some(expires_at) = sim.dot_expires_at(dot) {
                        sim.stop_melee_until(caster, expires_at)?;
                        let reaction = sim.config().reaction_time;
                        sim.extend_gcd_until(caster, expires_at + reaction)?;
                    }
                    Ok(())
                }),
        )
        .unwrap()
    }

    #[test]
    fn starved_channel_ends_in_the_same_instant() {
        // 15 energy at 10/s: the first tick sees 25 and pays 20, the second
        // sees 15 and cannot.
        let (mut sim, player, enemies) = encounter(1, 15.0, 10.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let spell = channel(&mut sim, player, log.clone());
        sim.reset().unwrap();

        let outcome = sim.cast(spell, enemies[0]).unwrap();
        assert_eq!(
            outcome,
            CastOutcome::Channeling {
                ends_at: Some(SimTime::from_secs(6))
            }
        );
        assert!(!sim.is_melee_swinging(player));
        assert!(matches!(
            sim.unit(player).unwrap().cast_state(),
            CastState::Channeling { .. }
        ));

        sim.run_until(SimTime::from_secs(2)).unwrap();
        let dot = sim.dot_for(spell, enemies[0]).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(!sim.is_dot_active(dot));
        assert!(sim.unit(player).unwrap().cast_state().is_idle());
        // Melee resumed at 2s and swung right away.
        assert!(sim.is_melee_swinging(player));
        assert_eq!(sim.next_swing_at(player), Some(SimTime::from_secs(5)));
        assert!(sim.metrics().events().iter().any(|event| {
            event.at == SimTime::from_secs(2) && matches!(event.kind, crate::metrics::MetricKind::Damage { .. })
        }));
        assert_eq!(
            sim.gcd_ready_at(player),
            SimTime::from_secs(2) + sim.config().channel_clip_delay
        );
    }

    #[test]
    fn unaffordable_first_tick_ends_channel_at_that_tick() {
        let (mut sim, player, enemies) = encounter(1, 15.0, 0.0);
        let log = Arc::new(Mutex::new(Vec::new()));
        let spell = channel(&mut sim, player, log.clone());
        sim.reset().unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        sim.run_until(SimTime::from_secs(1)).unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert!(sim.unit(player).unwrap().cast_state().is_idle());
        assert_eq!(sim.current_resource(player, ResourceKind::Energy), Some(15.0));
    }

    #[test]
    fn synchronous_self_deactivation_faults() {
        let (mut sim, player, enemies) = encounter(1, 100.0, 0.0);
        let spell = sim
            .register_spell(
                player,
                SpellConfig::new("Reentrant", ActionId::spell(15)).with_dot(
                    DotConfig::new("Reentrant", 3, SimDuration::from_secs(1))
                        .on_tick(|sim, dot, _| sim.deactivate_dot(dot)),
                ),
            )
            .unwrap();
        sim.reset().unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        let err = sim.run_until(SimTime::from_secs(1)).unwrap_err();
        assert!(matches!(err, KernelFault::ReentrantDotMutation { .. }));
    }

    #[test]
    fn deferred_self_deactivation_is_allowed() {
        let (mut sim, player, enemies) = encounter(1, 100.0, 0.0);
        let (dot_config, log) = tick_log(
            DotConfig::new("Deferred", 5, SimDuration::from_secs(1)),
        );
        let inner = dot_config.on_tick.clone().unwrap();
        let dot_config = dot_config.on_tick(move |sim, dot, target| {
            inner(sim, dot, target)?;
            sim.request_dot_deactivation(dot)
        });
        let spell = sim
            .register_spell(player, SpellConfig::new("Deferred", ActionId::spell(16)).with_dot(dot_config))
            .unwrap();
        sim.reset().unwrap();
        sim.cast(spell, enemies[0]).unwrap();
        sim.run_until(SimTime::from_secs(5)).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
