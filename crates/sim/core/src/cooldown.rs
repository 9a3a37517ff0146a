//! Single cooldowns and multi-charge recharge tracking.
//!
//! A multi-charge spell keeps its charges as stacks of a dedicated aura. Any
//! stack decrease starts a recharge for each consumed charge. Only one
//! recharge is in flight at a time; the rest wait in a FIFO with their own
//! ready times, so a charge consumed at `t` returns at `t + R` regardless of
//! when earlier charges came back.
use std::collections::VecDeque;

use tracing::trace;

use crate::aura::AuraConfig;
use crate::engine::{ActionHandle, ActionPriority, Simulation};
use crate::error::{KernelFault, SimResult};
use crate::ids::{AuraId, SpellId};
use crate::spell::SpellCooldown;
use crate::time::{SimDuration, SimTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cooldown {
    duration: SimDuration,
    ready_at: SimTime,
}

impl Cooldown {
    pub fn new(duration: SimDuration) -> Self {
        Self {
            duration,
            ready_at: SimTime::ZERO,
        }
    }

    pub fn duration(&self) -> SimDuration {
        self.duration
    }

    pub fn set_duration(&mut self, duration: SimDuration) {
        self.duration = duration;
    }

    pub fn ready_at(&self) -> SimTime {
        self.ready_at
    }

    pub fn is_ready(&self, now: SimTime) -> bool {
        self.ready_at <= now
    }

    pub fn remaining(&self, now: SimTime) -> SimDuration {
        self.ready_at - now
    }

    pub fn start(&mut self, now: SimTime) {
        self.ready_at = now + self.duration;
    }

    pub fn reset(&mut self) {
        self.ready_at = SimTime::ZERO;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct InFlightRecharge {
    handle: ActionHandle,
    ready_at: SimTime,
}

#[derive(Clone, Debug)]
pub struct ChargeTracker {
    aura: AuraId,
    max_charges: u32,
    recharge: SimDuration,
    in_flight: Option<InFlightRecharge>,
    /// Ready times of consumed charges waiting behind the in-flight one.
    queued: VecDeque<SimTime>,
}

impl ChargeTracker {
    pub(crate) fn new(aura: AuraId, max_charges: u32, recharge: SimDuration) -> Self {
        Self {
            aura,
            max_charges,
            recharge,
            in_flight: None,
            queued: VecDeque::new(),
        }
    }

    pub fn aura(&self) -> AuraId {
        self.aura
    }

    pub fn max_charges(&self) -> u32 {
        self.max_charges
    }

    pub fn recharge_duration(&self) -> SimDuration {
        self.recharge
    }

    pub fn next_recharge_at(&self) -> Option<SimTime> {
        self.in_flight.map(|recharge| recharge.ready_at)
    }

    /// Charges currently recharging, in flight or queued.
    pub fn recharging(&self) -> usize {
        self.queued.len() + usize::from(self.in_flight.is_some())
    }
}

/// Charge aura registered for every multi-charge spell.
pub(crate) fn charge_aura_config(spell: SpellId, spell_label: &str, max_charges: u32) -> AuraConfig {
    AuraConfig::never_expires(format!("{spell_label} Charges"))
        .with_max_stacks(max_charges)
        .on_stacks_change(move |sim, _, old, new| sim.on_charges_changed(spell, old, new))
        .on_reset(move |sim, _| sim.refill_charges(spell))
}

impl Simulation {
    pub fn charge_tracker(&self, spell: SpellId) -> Option<&ChargeTracker> {
        match &self.spells.get(spell.index())?.cooldown {
            SpellCooldown::Charges(tracker) => Some(tracker),
            _ => None,
        }
    }

    fn charge_tracker_mut(&mut self, spell: SpellId) -> SimResult<&mut ChargeTracker> {
        match self.spells.get_mut(spell.index()).map(|spell| &mut spell.cooldown) {
            Some(SpellCooldown::Charges(tracker)) => Ok(tracker),
            _ => Err(KernelFault::UnknownId {
                kind: "charge tracker",
                id: spell.0,
            }),
        }
    }

    /// Available charges; zero for spells without charges.
    pub fn spell_charges(&self, spell: SpellId) -> u32 {
        self.charge_tracker(spell)
            .map_or(0, |tracker| self.aura_stacks(tracker.aura))
    }

    pub fn next_recharge_at(&self, spell: SpellId) -> Option<SimTime> {
        self.charge_tracker(spell)?.next_recharge_at()
    }

    /// Time until the next charge lands; zero when nothing is recharging.
    pub fn time_to_next_recharge(&self, spell: SpellId) -> SimDuration {
        self.next_recharge_at(spell)
            .map_or(SimDuration::ZERO, |at| at - self.now)
    }

    /// Encounter start: drop pending recharges and fill every charge.
    pub(crate) fn refill_charges(&mut self, spell: SpellId) -> SimResult<()> {
        let (aura, max, in_flight) = {
            let tracker = self.charge_tracker_mut(spell)?;
            tracker.queued.clear();
            (tracker.aura, tracker.max_charges, tracker.in_flight.take())
        };
        if let Some(recharge) = in_flight {
            self.queue.cancel(recharge.handle);
        }
        self.activate_aura(aura)?;
        self.set_aura_stacks(aura, max)
    }

    fn on_charges_changed(&mut self, spell: SpellId, old: u32, new: u32) -> SimResult<()> {
        let (aura, max) = {
            let tracker = self.charge_tracker_mut(spell)?;
            (tracker.aura, tracker.max_charges)
        };
        // Deactivation zeroes stacks; that is not a consumption.
        if !self.is_aura_active(aura) {
            return Ok(());
        }
        if new < old {
            for _ in new..old {
                self.queue_recharge(spell)?;
            }
        } else if new >= max {
            let in_flight = {
                let tracker = self.charge_tracker_mut(spell)?;
                tracker.queued.clear();
                tracker.in_flight.take()
            };
            if let Some(recharge) = in_flight {
                self.queue.cancel(recharge.handle);
            }
        }
        Ok(())
    }

    fn queue_recharge(&mut self, spell: SpellId) -> SimResult<()> {
        let now = self.now;
        let tracker = self.charge_tracker_mut(spell)?;
        let ready_at = now + tracker.recharge;
        if tracker.in_flight.is_some() {
            tracker.queued.push_back(ready_at);
            return Ok(());
        }
        self.start_recharge(spell, ready_at)
    }

    fn start_recharge(&mut self, spell: SpellId, ready_at: SimTime) -> SimResult<()> {
        let handle = self.schedule(ready_at, ActionPriority::Normal, move |sim| {
            sim.complete_recharge(spell)
        })?;
        self.charge_tracker_mut(spell)?.in_flight = Some(InFlightRecharge { handle, ready_at });
        Ok(())
    }

    fn complete_recharge(&mut self, spell: SpellId) -> SimResult<()> {
        let aura = {
            let tracker = self.charge_tracker_mut(spell)?;
            tracker.in_flight = None;
            tracker.aura
        };
        if !self.is_aura_active(aura) {
            self.activate_aura(aura)?;
        }
        self.add_aura_stack(aura)?;
        trace!(
            target: "sim_core::cooldown",
            spell = %spell,
            charges = self.aura_stacks(aura),
            "charge recharged"
        );

        let successor = self.charge_tracker_mut(spell)?.queued.pop_front();
        if let Some(ready_at) = successor {
            self.start_recharge(spell, ready_at.max(self.now))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ids::ActionId;
    use crate::spell::{CastOutcome, CooldownPolicy, SpellConfig};
    use crate::unit::Unit;

    const RECHARGE: SimDuration = SimDuration::from_secs(45);

    fn charged_spell() -> (Simulation, SpellId, crate::ids::UnitId) {
        let mut sim = Simulation::new(SimConfig::default().with_duration(SimDuration::from_secs(300)));
        let player = sim.add_unit(Unit::player("Monk")).unwrap();
        let boss = sim.add_unit(Unit::enemy("Boss")).unwrap();
        let spell = sim
            .register_spell(
                player,
                SpellConfig::new("Chi Brew", ActionId::spell(115399)).with_cooldown(
                    CooldownPolicy::MultiCharge {
                        max_charges: 2,
                        recharge: RECHARGE,
                    },
                ),
            )
            .unwrap();
        sim.reset().unwrap();
        (sim, spell, boss)
    }

    #[test]
    fn single_cooldown_tracks_ready_time() {
        let mut cd = Cooldown::new(SimDuration::from_secs(15));
        assert!(cd.is_ready(SimTime::ZERO));
        cd.start(SimTime::from_secs(2));
        assert_eq!(cd.remaining(SimTime::from_secs(7)), SimDuration::from_secs(10));
        assert!(cd.is_ready(SimTime::from_secs(17)));
    }

    #[test]
    fn charges_start_full() {
        let (sim, spell, _) = charged_spell();
        assert_eq!(sim.spell_charges(spell), 2);
        assert_eq!(sim.next_recharge_at(spell), None);
    }

    #[test]
    fn each_charge_recharges_from_its_own_consumption() {
        let (mut sim, spell, boss) = charged_spell();
        assert!(matches!(sim.cast(spell, boss).unwrap(), CastOutcome::Completed));
        sim.run_until(SimTime::from_secs(5)).unwrap();
        assert!(matches!(sim.cast(spell, boss).unwrap(), CastOutcome::Completed));
        assert_eq!(sim.spell_charges(spell), 0);
        assert_eq!(sim.next_recharge_at(spell), Some(SimTime::from_secs(45)));
        assert_eq!(sim.charge_tracker(spell).unwrap().recharging(), 2);

        sim.run_until(SimTime::from_secs(45)).unwrap();
        assert_eq!(sim.spell_charges(spell), 1);
        assert_eq!(sim.next_recharge_at(spell), Some(SimTime::from_secs(50)));

        sim.run_until(SimTime::from_millis(49_999)).unwrap();
        assert_eq!(sim.spell_charges(spell), 1);
        sim.run_until(SimTime::from_secs(50)).unwrap();
        assert_eq!(sim.spell_charges(spell), 2);
        assert_eq!(sim.next_recharge_at(spell), None);
    }

    #[test]
    fn no_charges_refuses_cast() {
        let (mut sim, spell, boss) = charged_spell();
        sim.cast(spell, boss).unwrap();
        sim.cast(spell, boss).unwrap();
        assert_eq!(
            sim.cast(spell, boss).unwrap(),
            CastOutcome::Refused(crate::spell::CastRefusal::NoCharges)
        );
        assert_eq!(sim.time_to_next_recharge(spell), RECHARGE);
    }

    #[test]
    fn partial_recharge_then_spend_keeps_in_flight_timer() {
        let (mut sim, spell, boss) = charged_spell();
        sim.cast(spell, boss).unwrap();
        sim.run_until(SimTime::from_secs(30)).unwrap();
        sim.cast(spell, boss).unwrap();
        // The first recharge is unaffected by the second consumption.
        assert_eq!(sim.next_recharge_at(spell), Some(SimTime::from_secs(45)));
        sim.run_until(SimTime::from_secs(75)).unwrap();
        assert_eq!(sim.spell_charges(spell), 2);
    }
}
