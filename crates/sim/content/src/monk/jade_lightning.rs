//! Crackling Jade Lightning: a six-second channel paid per tick.
//!
//! Each tick costs 20 energy (a slice of base mana in Wise Serpent). A tick
//! the monk cannot pay ends the channel early; the kernel then resumes melee
//! and hands the GCD back after the clip delay.
use sim_core::{
    DotConfig, SimDuration, SimResult, Simulation, SpellConfig, SpellFlags, SpellId, UnitId,
};

use super::{MonkSetup, action_ids, gain_chi, labels};
use sim_core::CastModel;

const TICKS: u32 = 6;
const TICK_LENGTH: SimDuration = SimDuration::from_secs(1);
const TICK_ENERGY: f64 = 20.0;
const MANA_FRACTION: f64 = 0.0157;
const SCALING_COEFFICIENT: f64 = 0.18;
const AP_COEFFICIENT: f64 = 0.386;
const CHI_PROC_CHANCE: f64 = 0.3;

pub(super) fn register(sim: &mut Simulation, unit: UnitId, setup: &MonkSetup) -> SimResult<SpellId> {
    let tick_cost = setup.cost(TICK_ENERGY, MANA_FRACTION);
    let cast_cost = setup.cost(0.0, MANA_FRACTION);
    let base_damage = setup.spell_scaling * SCALING_COEFFICIENT + setup.attack_power * AP_COEFFICIENT;

    let mut dot = DotConfig::new(labels::CRACKLING_JADE_LIGHTNING, TICKS, TICK_LENGTH).on_tick(
        move |sim, dot, target| {
            let (spell, caster) = {
                let dot = sim.dot(dot)?;
                (dot.spell(), dot.caster())
            };
            sim.calc_and_deal_damage(spell, target, base_damage)?;
            if sim.proc(CHI_PROC_CHANCE, labels::CRACKLING_JADE_LIGHTNING) {
                gain_chi(sim, caster, 1.0, action_ids::CRACKLING_JADE_LIGHTNING_CHI)?;
            }
            Ok(())
        },
    );
    if let Some(cost) = tick_cost {
        dot = dot.with_tick_cost(cost);
    }

    let mut config = SpellConfig::new(labels::CRACKLING_JADE_LIGHTNING, action_ids::CRACKLING_JADE_LIGHTNING)
        .with_flags(SpellFlags::APL)
        .with_cast(CastModel::Channel)
        .with_gcd(SimDuration::from_secs(1))
        .ignoring_haste()
        .with_dot(dot)
        .with_effects(|sim, spell, target| {
            let Some(dot) = sim.dot_for(spell, target) else {
                return Ok(());
            };
            sim.apply_dot(dot)?;
            let Some(expires_at) = sim.dot_expires_at(dot) else {
                return Ok(());
            };
            let caster = sim.spell(spell)?.caster();
            let reaction_time = sim.config().reaction_time;
            sim.stop_melee_until(caster, expires_at)?;
            sim.extend_gcd_until(caster, expires_at + reaction_time)
        });
    if let Some(cost) = cast_cost {
        config = config.with_cost(cost);
    }
    sim.register_spell(unit, config)
}
