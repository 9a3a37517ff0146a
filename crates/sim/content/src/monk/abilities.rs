//! Baseline strikes: Jab builds chi, Tiger Palm and Blackout Kick spend it.
use sim_core::{
    AuraConfig, ResourceKind, SimDuration, SimResult, Simulation, SpellConfig, SpellCost,
    SpellFlags, SpellId, UnitId,
};

use super::{MonkSetup, action_ids, gain_chi, labels};

const STRIKE_GCD: SimDuration = SimDuration::from_secs(1);

const JAB_ENERGY: f64 = 40.0;
const JAB_MANA_FRACTION: f64 = 0.08;
const JAB_COEFFICIENT: f64 = 1.5;
const TIGER_PALM_COEFFICIENT: f64 = 3.0;
const BLACKOUT_KICK_COEFFICIENT: f64 = 7.12;
const TIGER_POWER_DURATION: SimDuration = SimDuration::from_secs(20);

pub(super) fn register_jab(sim: &mut Simulation, unit: UnitId, setup: &MonkSetup) -> SimResult<SpellId> {
    let cost = setup.cost(JAB_ENERGY, JAB_MANA_FRACTION);
    let damage = setup.strike_damage() * JAB_COEFFICIENT;
    let mut config = SpellConfig::new(labels::JAB, action_ids::JAB)
        .with_flags(SpellFlags::APL)
        .with_gcd(STRIKE_GCD)
        .ignoring_haste()
        .with_effects(move |sim, spell, target| {
            let caster = sim.spell(spell)?.caster();
            sim.calc_and_deal_damage(spell, target, damage)?;
            gain_chi(sim, caster, 1.0, action_ids::JAB)?;
            trigger_power_strikes(sim, caster)
        });
    if let Some(cost) = cost {
        config = config.with_cost(cost);
    }
    sim.register_spell(unit, config)
}

pub(super) fn register_tiger_palm(sim: &mut Simulation, unit: UnitId, setup: &MonkSetup) -> SimResult<SpellId> {
    let tiger_power = sim.register_aura(
        unit,
        AuraConfig::timed(labels::TIGER_POWER, TIGER_POWER_DURATION)
            .with_action_id(action_ids::TIGER_POWER),
    )?;
    let damage = setup.strike_damage() * TIGER_PALM_COEFFICIENT;
    sim.register_spell(
        unit,
        SpellConfig::new(labels::TIGER_PALM, action_ids::TIGER_PALM)
            .with_flags(SpellFlags::APL)
            .with_cost(SpellCost::new(ResourceKind::Chi, 1.0))
            .with_gcd(STRIKE_GCD)
            .ignoring_haste()
            .with_effects(move |sim, spell, target| {
                sim.calc_and_deal_damage(spell, target, damage)?;
                sim.activate_aura(tiger_power)
            }),
    )
}

pub(super) fn register_blackout_kick(
    sim: &mut Simulation,
    unit: UnitId,
    setup: &MonkSetup,
) -> SimResult<SpellId> {
    let damage = setup.strike_damage() * BLACKOUT_KICK_COEFFICIENT;
    sim.register_spell(
        unit,
        SpellConfig::new(labels::BLACKOUT_KICK, action_ids::BLACKOUT_KICK)
            .with_flags(SpellFlags::APL)
            .with_cost(SpellCost::new(ResourceKind::Chi, 2.0))
            .with_gcd(STRIKE_GCD)
            .ignoring_haste()
            .with_effects(move |sim, spell, target| {
                sim.calc_and_deal_damage(spell, target, damage)?;
                Ok(())
            }),
    )
}

/// Consumes a ready Power Strikes for one extra chi. At full chi the chi is
/// banked as a Chi Sphere instead.
pub(crate) fn trigger_power_strikes(sim: &mut Simulation, unit: UnitId) -> SimResult<()> {
    let Some(power_strikes) = sim.aura_by_label(unit, labels::POWER_STRIKES) else {
        return Ok(());
    };
    if !sim.is_aura_active(power_strikes) {
        return Ok(());
    }
    let chi = sim.current_resource(unit, ResourceKind::Chi).unwrap_or(0.0);
    let max_chi = sim.max_resource(unit, ResourceKind::Chi).unwrap_or(0.0);
    if chi >= max_chi {
        if let Some(sphere) = sim.aura_by_label(unit, labels::CHI_SPHERE) {
            sim.activate_aura(sphere)?;
            sim.add_aura_stack(sphere)?;
        }
    } else {
        gain_chi(sim, unit, 1.0, action_ids::POWER_STRIKES)?;
    }
    sim.deactivate_aura(power_strikes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monk::{Monk, MonkSetup};
    use sim_core::{CastOutcome, CastRefusal, ResourcePool, SimConfig, Unit};

    fn setup() -> (Simulation, Monk, UnitId) {
        let mut sim = Simulation::new(SimConfig::default().with_duration(SimDuration::from_secs(60)));
        let boss = sim
            .add_unit(Unit::enemy("Boss").with_resource(ResourcePool::full(ResourceKind::Health, 1e9)))
            .unwrap();
        let monk = Monk::register(&mut sim, &MonkSetup::default()).unwrap();
        sim.reset().unwrap();
        (sim, monk, boss)
    }

    #[test]
    fn jab_builds_chi_and_palm_spends_it() {
        let (mut sim, monk, boss) = setup();

        assert_eq!(sim.cast(monk.jab, boss).unwrap(), CastOutcome::Completed);
        assert_eq!(sim.current_resource(monk.unit, ResourceKind::Chi), Some(1.0));
        assert_eq!(sim.current_resource(monk.unit, ResourceKind::Energy), Some(60.0));

        sim.run_until(sim.current_time() + STRIKE_GCD).unwrap();
        assert_eq!(sim.cast(monk.tiger_palm, boss).unwrap(), CastOutcome::Completed);
        assert_eq!(sim.current_resource(monk.unit, ResourceKind::Chi), Some(0.0));
        let tiger_power = sim.aura_by_label(monk.unit, labels::TIGER_POWER).unwrap();
        assert!(sim.is_aura_active(tiger_power));
    }

    #[test]
    fn blackout_kick_needs_two_chi() {
        let (mut sim, monk, boss) = setup();
        sim.gain(monk.unit, ResourceKind::Chi, 1.0, action_ids::JAB).unwrap();

        assert_eq!(
            sim.cast(monk.blackout_kick, boss).unwrap(),
            CastOutcome::Refused(CastRefusal::InsufficientResource)
        );
        sim.gain(monk.unit, ResourceKind::Chi, 1.0, action_ids::JAB).unwrap();
        assert!(sim.cast(monk.blackout_kick, boss).unwrap().is_success());
    }
}
