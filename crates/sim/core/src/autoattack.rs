//! Passive melee swing loop.
//!
//! A unit with auto attacks swings at its current target every hasted swing
//! interval. Channels suppress the loop with [`Simulation::stop_melee_until`]
//! and resume it early with [`Simulation::enable_melee_swing`].
use tracing::trace;

use crate::engine::{ActionPriority, Simulation};
use crate::error::{KernelFault, SimResult};
use crate::ids::UnitId;
use crate::metrics::MetricKind;
use crate::resource::ResourceKind;
use crate::time::{SimDuration, SimTime};

const CRIT_STREAM: &str = "Auto Attack Crit";
const CRIT_MULTIPLIER: f64 = 2.0;

impl Simulation {
    /// Starts swinging. Units without auto attacks are ignored.
    pub fn start_auto_attacks(&mut self, unit: UnitId) -> SimResult<()> {
        let Some(state) = self.unit(unit)?.auto_attacks else {
            return Ok(());
        };
        if state.swinging && state.pending.is_some() {
            return Ok(());
        }
        check_swing_interval(state.config.swing_speed)?;
        self.schedule_swing(unit, state.next_swing_at.max(self.now))
    }

    pub fn is_melee_swinging(&self, unit: UnitId) -> bool {
        self.units
            .get(unit.index())
            .and_then(|unit| unit.auto_attacks)
            .is_some_and(|state| state.swinging)
    }

    pub fn next_swing_at(&self, unit: UnitId) -> Option<SimTime> {
        self.units
            .get(unit.index())
            .and_then(|unit| unit.auto_attacks)
            .map(|state| state.next_swing_at)
    }

    /// Suppresses swings until `until`, then resumes automatically.
    pub fn stop_melee_until(&mut self, unit: UnitId, until: SimTime) -> SimResult<()> {
        let Some(state) = self.unit(unit)?.auto_attacks else {
            return Ok(());
        };
        if let Some(handle) = state.pending {
            self.queue.cancel(handle);
        }
        let resume = self.schedule(until, ActionPriority::Normal, move |sim| {
            sim.enable_melee_swing(unit)
        })?;
        if let Some(state) = self.unit_mut(unit)?.auto_attacks.as_mut() {
            state.swinging = false;
            state.pending = Some(resume);
        }
        trace!(target: "sim_core::melee", unit = %unit, until = %until, "melee suppressed");
        Ok(())
    }

    /// Resumes a suppressed swing loop now. No-op if already swinging.
    pub fn enable_melee_swing(&mut self, unit: UnitId) -> SimResult<()> {
        let Some(state) = self.unit(unit)?.auto_attacks else {
            return Ok(());
        };
        if state.swinging {
            return Ok(());
        }
        if let Some(handle) = state.pending {
            self.queue.cancel(handle);
        }
        trace!(target: "sim_core::melee", unit = %unit, "melee resumed");
        self.schedule_swing(unit, state.next_swing_at.max(self.now))
    }

    fn schedule_swing(&mut self, unit: UnitId, at: SimTime) -> SimResult<()> {
        let handle = self.schedule(at, ActionPriority::Normal, move |sim| sim.swing(unit))?;
        if let Some(state) = self.unit_mut(unit)?.auto_attacks.as_mut() {
            state.swinging = true;
            state.next_swing_at = at;
            state.pending = Some(handle);
        }
        Ok(())
    }

    fn swing(&mut self, unit: UnitId) -> SimResult<()> {
        let (config, target, crit_chance) = {
            let source = self.unit(unit)?;
            let Some(state) = source.auto_attacks else {
                return Ok(());
            };
            (state.config, source.current_target, source.crit_chance)
        };
        if let Some(target) = target {
            let crit = self.proc(crit_chance, CRIT_STREAM);
            let amount = if crit {
                config.damage * CRIT_MULTIPLIER
            } else {
                config.damage
            };
            self.drain(target, ResourceKind::Health, amount)?;
            self.record_metric(
                unit,
                config.action_id,
                MetricKind::Damage {
                    target,
                    amount,
                    crit,
                },
            );
        }
        let interval = self.apply_cast_speed(unit, config.swing_speed);
        check_swing_interval(interval)?;
        self.schedule_swing(unit, self.now + interval)
    }
}

fn check_swing_interval(interval: SimDuration) -> SimResult<()> {
    if interval.is_zero() {
        return Err(KernelFault::EffectFailed {
            label: "auto attack".into(),
            reason: "zero swing interval".into(),
        });
    }
    Ok(())
}
