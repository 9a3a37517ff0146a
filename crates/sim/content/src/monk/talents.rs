//! Talent rows. Each talent registers its spells and auras only when it is
//! selected and the monk's level unlocks its row.
use sim_core::{
    ActionPriority, AuraConfig, AuraDuration, CooldownPolicy, DotConfig, PeriodicActionOptions,
    ResourceKind, SimDuration, SimResult, Simulation, SpellConfig, SpellFlags, SpellId, UnitId,
    UnitKind,
};
use tracing::trace;

use super::{Monk, MonkSetup, action_ids, gain_chi, labels};

const CHI_WAVE_BOUNCES: u32 = 7;
const CHI_WAVE_MISSILE_SPEED: f64 = 8.0;
const CHI_WAVE_COEFFICIENT: f64 = 0.45;
const CHI_WAVE_COOLDOWN: SimDuration = SimDuration::from_secs(15);

const POWER_STRIKES_PERIOD: SimDuration = SimDuration::from_secs(20);
const CHI_SPHERE_DURATION: SimDuration = SimDuration::from_secs(120);
const CHI_SPHERE_MAX_STACKS: u32 = 10;
/// Spheres spawn this far away; the monk walks over to pick one up.
const CHI_SPHERE_DISTANCE: f64 = 4.0;

const ASCENSION_ENERGY_REGEN: f64 = 1.15;
const ASCENSION_MANA: f64 = 1.15;
const ASCENSION_EXTRA_CHI: f64 = 1.0;

const CHI_BREW_CHARGES: u32 = 2;
const CHI_BREW_RECHARGE: SimDuration = SimDuration::from_secs(45);

const RJW_BASE_COOLDOWN: SimDuration = SimDuration::from_secs(6);
const RJW_TICKS: u32 = 8;
const RJW_TICK_LENGTH: SimDuration = SimDuration::from_millis(750);
const RJW_DAMAGE_MULTIPLIER: f64 = 1.4;
const RJW_CHI_TARGETS: usize = 3;

/// Level at which each talent row unlocks. The mobility (15) and survival
/// (75) rows have no simulated talents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TalentRow {
    Healing = 30,
    Chi = 45,
    Ultimate = 90,
}

impl TalentRow {
    fn unlocked(self, level: u32) -> bool {
        level >= self as u32
    }
}

pub(super) fn apply_talents(sim: &mut Simulation, monk: &mut Monk, setup: &MonkSetup) -> SimResult<()> {
    let talents = setup.talents;
    let level = setup.level;
    if TalentRow::Healing.unlocked(level) && talents.chi_wave {
        monk.chi_wave = Some(register_chi_wave(sim, monk.unit, setup)?);
    }
    if TalentRow::Chi.unlocked(level) {
        if talents.power_strikes {
            monk.chi_sphere = Some(register_power_strikes(sim, monk.unit)?);
        }
        if talents.ascension {
            register_ascension(sim, monk.unit)?;
        }
        if talents.chi_brew {
            monk.chi_brew = Some(register_chi_brew(sim, monk.unit)?);
        }
    }
    if TalentRow::Ultimate.unlocked(level) && talents.rushing_jade_wind {
        monk.rushing_jade_wind = Some(register_rushing_jade_wind(sim, monk.unit, setup)?);
    }
    Ok(())
}

// ============================================================================
// Chi Wave
// ============================================================================

#[derive(Clone, Copy, Debug)]
struct ChiWave {
    caster: UnitId,
    damage_spell: SpellId,
    healing_spell: SpellId,
    amount: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hit {
    Damage(UnitId),
    Healing(UnitId),
}

/// One hop of the wave. Every hop is resolved when its missile lands, and
/// the hop after it is launched from there.
#[derive(Clone, Copy, Debug)]
struct Bounce {
    hit: Hit,
    /// Enemy the next damaging hop goes to.
    next_enemy: Option<UnitId>,
    remaining: u32,
}

impl ChiWave {
    fn launch(self, sim: &mut Simulation, bounce: Bounce) -> SimResult<()> {
        let (spell, target) = match bounce.hit {
            Hit::Damage(target) => (self.damage_spell, target),
            Hit::Healing(target) => (self.healing_spell, target),
        };
        let result = match bounce.hit {
            Hit::Damage(_) => sim.calc_damage(spell, target, self.amount)?,
            Hit::Healing(_) => sim.calc_healing(spell, target, self.amount)?,
        };
        sim.wait_travel_time(spell, move |sim| {
            match bounce.hit {
                Hit::Damage(_) => sim.deal_damage(result)?,
                Hit::Healing(_) => sim.deal_healing(result)?,
            }
            if bounce.remaining == 0 {
                return Ok(());
            }
            let next = match bounce.hit {
                Hit::Damage(enemy) => Bounce {
                    hit: Hit::Healing(self.caster),
                    next_enemy: sim.next_target(enemy),
                    remaining: bounce.remaining - 1,
                },
                Hit::Healing(_) => match bounce.next_enemy {
                    Some(enemy) => Bounce {
                        hit: Hit::Damage(enemy),
                        next_enemy: Some(enemy),
                        remaining: bounce.remaining - 1,
                    },
                    None => return Ok(()),
                },
            };
            trace!(
                target: "sim_content::chi_wave",
                hit = ?next.hit,
                remaining = next.remaining,
                "bounce"
            );
            self.launch(sim, next)
        })?;
        Ok(())
    }
}

fn register_chi_wave(sim: &mut Simulation, unit: UnitId, setup: &MonkSetup) -> SimResult<SpellId> {
    let amount = setup.spell_scaling * CHI_WAVE_COEFFICIENT + setup.attack_power * CHI_WAVE_COEFFICIENT;
    let damage_spell = sim.register_spell(
        unit,
        SpellConfig::new(labels::CHI_WAVE_DAMAGE, action_ids::CHI_WAVE_DAMAGE)
            .with_flags(SpellFlags::PASSIVE)
            .with_missile_speed(CHI_WAVE_MISSILE_SPEED),
    )?;
    let healing_spell = sim.register_spell(
        unit,
        SpellConfig::new(labels::CHI_WAVE_HEALING, action_ids::CHI_WAVE_HEALING)
            .with_flags(SpellFlags::PASSIVE | SpellFlags::HELPFUL)
            .with_missile_speed(CHI_WAVE_MISSILE_SPEED),
    )?;
    let wave = ChiWave {
        caster: unit,
        damage_spell,
        healing_spell,
        amount,
    };

    sim.register_spell(
        unit,
        SpellConfig::new(labels::CHI_WAVE, action_ids::CHI_WAVE)
            .with_flags(SpellFlags::APL)
            .with_gcd(SimDuration::from_secs(1))
            .ignoring_haste()
            .with_cooldown(CooldownPolicy::Single(CHI_WAVE_COOLDOWN))
            .with_effects(move |sim, _, target| {
                let first = if sim.unit(target)?.kind() == UnitKind::Enemy {
                    Bounce {
                        hit: Hit::Damage(target),
                        next_enemy: sim.next_target(target),
                        remaining: CHI_WAVE_BOUNCES,
                    }
                } else {
                    Bounce {
                        hit: Hit::Healing(target),
                        next_enemy: sim.unit(unit)?.current_target(),
                        remaining: CHI_WAVE_BOUNCES,
                    }
                };
                wave.launch(sim, first)
            }),
    )
}

// ============================================================================
// Power Strikes & Chi Sphere
// ============================================================================

fn register_power_strikes(sim: &mut Simulation, unit: UnitId) -> SimResult<SpellId> {
    let sphere = sim.register_aura(
        unit,
        AuraConfig::timed(labels::CHI_SPHERE, CHI_SPHERE_DURATION)
            .with_action_id(action_ids::CHI_SPHERE_AURA)
            .with_max_stacks(CHI_SPHERE_MAX_STACKS),
    )?;
    let sphere_use = sim.register_aura(
        unit,
        AuraConfig::never_expires(labels::CHI_SPHERE_USE).with_action_id(action_ids::CHI_SPHERE),
    )?;
    let power_strikes = sim.register_aura(
        unit,
        AuraConfig::never_expires(labels::POWER_STRIKES).with_action_id(action_ids::POWER_STRIKES),
    )?;

    let chi_sphere = sim.register_spell(
        unit,
        SpellConfig::new(labels::CHI_SPHERE, action_ids::CHI_SPHERE)
            .with_flags(SpellFlags::NO_ON_CAST_COMPLETE | SpellFlags::PASSIVE | SpellFlags::APL)
            .with_condition(move |sim, _, _| {
                !sim.is_aura_active(sphere_use) && sim.is_aura_active(sphere) && sim.aura_stacks(sphere) > 0
            })
            .with_effects(move |sim, _, _| {
                sim.activate_aura(sphere_use)?;
                let walk = SimDuration::from_secs_f64(CHI_SPHERE_DISTANCE / sim.unit(unit)?.movement_speed());
                sim.move_for(unit, walk)?;
                sim.schedule_after(walk, ActionPriority::Normal, move |sim| {
                    sim.remove_aura_stack(sphere)?;
                    sim.deactivate_aura(sphere_use)?;
                    gain_chi(sim, unit, 1.0, action_ids::CHI_SPHERE)
                })?;
                Ok(())
            }),
    )?;

    // Procs every 20 seconds from a random offset within the first period.
    sim.add_reset_effect(move |sim| {
        let offset = POWER_STRIKES_PERIOD.mul_f64(sim.random_f64("Power Strikes Start"));
        sim.schedule_after(offset, ActionPriority::Low, move |sim| {
            sim.start_periodic_action(
                PeriodicActionOptions::new(POWER_STRIKES_PERIOD, move |sim, _| {
                    sim.activate_aura(power_strikes)
                })
                .with_priority(ActionPriority::Low)
                .tick_immediately(),
            )?;
            Ok(())
        })?;
        Ok(())
    });
    Ok(chi_sphere)
}

// ============================================================================
// Ascension
// ============================================================================

fn register_ascension(sim: &mut Simulation, unit: UnitId) -> SimResult<()> {
    sim.get_or_register_aura(
        unit,
        AuraConfig::permanent(labels::ASCENSION)
            .with_action_id(action_ids::ASCENSION)
            .on_gain(move |sim, _| {
                if sim.has_resource(unit, ResourceKind::Energy) {
                    sim.multiply_resource_regen(unit, ResourceKind::Energy, ASCENSION_ENERGY_REGEN)?;
                }
                if let Some(max_chi) = sim.max_resource(unit, ResourceKind::Chi) {
                    sim.set_max_resource(unit, ResourceKind::Chi, max_chi + ASCENSION_EXTRA_CHI)?;
                }
                if let Some(max_mana) = sim.max_resource(unit, ResourceKind::Mana) {
                    sim.set_max_resource(unit, ResourceKind::Mana, max_mana * ASCENSION_MANA)?;
                }
                Ok(())
            })
            .on_expire(move |sim, _| {
                if sim.has_resource(unit, ResourceKind::Energy) {
                    sim.multiply_resource_regen(unit, ResourceKind::Energy, 1.0 / ASCENSION_ENERGY_REGEN)?;
                }
                if let Some(max_chi) = sim.max_resource(unit, ResourceKind::Chi) {
                    sim.set_max_resource(unit, ResourceKind::Chi, max_chi - ASCENSION_EXTRA_CHI)?;
                }
                if let Some(max_mana) = sim.max_resource(unit, ResourceKind::Mana) {
                    sim.set_max_resource(unit, ResourceKind::Mana, max_mana / ASCENSION_MANA)?;
                }
                Ok(())
            }),
    )?;
    Ok(())
}

// ============================================================================
// Chi Brew
// ============================================================================

fn register_chi_brew(sim: &mut Simulation, unit: UnitId) -> SimResult<SpellId> {
    sim.register_spell(
        unit,
        SpellConfig::new(labels::CHI_BREW, action_ids::CHI_BREW)
            .with_flags(SpellFlags::NO_ON_CAST_COMPLETE | SpellFlags::APL)
            .with_cooldown(CooldownPolicy::MultiCharge {
                max_charges: CHI_BREW_CHARGES,
                recharge: CHI_BREW_RECHARGE,
            })
            .with_effects(move |sim, _, _| gain_chi(sim, unit, 2.0, action_ids::CHI_BREW)),
    )
}

// ============================================================================
// Rushing Jade Wind
// ============================================================================

fn register_rushing_jade_wind(sim: &mut Simulation, unit: UnitId, setup: &MonkSetup) -> SimResult<SpellId> {
    let strike_damage = setup.strike_damage();
    let tick_spell = sim.register_spell(
        unit,
        SpellConfig::new(labels::RUSHING_JADE_WIND_TICK, action_ids::RUSHING_JADE_WIND_TICK)
            .with_flags(SpellFlags::PASSIVE)
            .with_damage_multiplier(RJW_DAMAGE_MULTIPLIER),
    )?;
    let cooldown = sim.apply_cast_speed(unit, RJW_BASE_COOLDOWN);
    let buff = sim.register_aura(
        unit,
        AuraConfig::timed(labels::RUSHING_JADE_WIND, cooldown).with_action_id(action_ids::RUSHING_JADE_WIND),
    )?;

    let dot = DotConfig::new(labels::RUSHING_JADE_WIND_TICK, RJW_TICKS, RJW_TICK_LENGTH)
        .aoe()
        .affected_by_cast_speed(true)
        .on_tick(move |sim, _, target| {
            sim.calc_and_deal_damage(tick_spell, target, strike_damage)?;
            Ok(())
        });
    let mut config = SpellConfig::new(labels::RUSHING_JADE_WIND, action_ids::RUSHING_JADE_WIND)
        .with_flags(SpellFlags::APL)
        .with_gcd(SimDuration::from_secs(1))
        .ignoring_haste()
        .with_cooldown(CooldownPolicy::Single(cooldown))
        .with_dot(dot)
        .with_effects(move |sim, spell, _| {
            let Some(dot) = sim.aoe_dot(spell) else {
                return Ok(());
            };
            sim.apply_dot(dot)?;
            sim.tick_dot_once(dot)?;
            let remaining = sim.dot_remaining_duration(dot);
            sim.set_spell_cooldown(spell, remaining)?;
            sim.activate_aura_for(buff, remaining)?;
            if sim.enemies().len() >= RJW_CHI_TARGETS {
                gain_chi(sim, unit, 1.0, action_ids::RUSHING_JADE_WIND)?;
            }
            Ok(())
        });
    if let Some(cost) = setup.cost(40.0, 0.0715) {
        config = config.with_cost(cost);
    }
    let spell = sim.register_spell(unit, config)?;

    sim.on_cast_speed_changed(unit, move |sim, unit, _, _| {
        let cooldown = sim.apply_cast_speed(unit, RJW_BASE_COOLDOWN);
        sim.set_spell_cooldown(spell, cooldown)?;
        sim.set_aura_duration(buff, AuraDuration::Timed(cooldown))
    })?;
    Ok(spell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monk::{MonkTalents, Stance};
    use sim_core::{
        ActionId, CastOutcome, CastRefusal, MetricKind, ResourcePool, SimConfig, SimTime, Unit,
    };

    fn encounter(targets: usize, setup: MonkSetup) -> (Simulation, Monk, Vec<UnitId>) {
        let mut sim = Simulation::new(SimConfig::default().with_duration(SimDuration::from_secs(300)));
        let bosses = (0..targets)
            .map(|index| {
                sim.add_unit(
                    Unit::enemy(format!("Target {}", index + 1))
                        .with_resource(ResourcePool::full(ResourceKind::Health, 1e9)),
                )
                .unwrap()
            })
            .collect();
        let monk = Monk::register(&mut sim, &setup).unwrap();
        sim.reset().unwrap();
        (sim, monk, bosses)
    }

    fn all_talents() -> MonkSetup {
        MonkSetup::default().with_talents(MonkTalents {
            chi_wave: true,
            power_strikes: true,
            ascension: true,
            chi_brew: true,
            rushing_jade_wind: true,
        })
    }

    fn hits(sim: &Simulation, action: ActionId) -> Vec<MetricKind> {
        sim.metrics()
            .events()
            .iter()
            .filter(|event| event.action == action)
            .filter(|event| matches!(event.kind, MetricKind::Damage { .. } | MetricKind::Healing { .. }))
            .map(|event| event.kind.clone())
            .collect()
    }

    #[test]
    fn chi_wave_alternates_damage_and_healing_for_eight_hops() {
        let (mut sim, monk, bosses) = encounter(2, all_talents());
        let chi_wave = monk.chi_wave.unwrap();

        assert_eq!(sim.cast(chi_wave, bosses[0]).unwrap(), CastOutcome::Completed);
        sim.run_until(SimTime::from_secs(10)).unwrap();

        let damage = hits(&sim, action_ids::CHI_WAVE_DAMAGE);
        let healing = hits(&sim, action_ids::CHI_WAVE_HEALING);
        assert_eq!(damage.len(), 4);
        assert_eq!(healing.len(), 4);
        let targets: Vec<UnitId> = damage
            .iter()
            .filter_map(|kind| match kind {
                MetricKind::Damage { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![bosses[0], bosses[1], bosses[0], bosses[1]]);
        assert!(healing.iter().all(|kind| matches!(
            kind,
            MetricKind::Healing { target, .. } if *target == monk.unit
        )));
    }

    #[test]
    fn chi_wave_hops_wait_for_travel_time() {
        let (mut sim, monk, bosses) = encounter(1, all_talents());
        sim.cast(monk.chi_wave.unwrap(), bosses[0]).unwrap();

        // 5 yards at 8 yards per second.
        let hop = SimDuration::from_secs_f64(5.0 / 8.0);
        sim.run_until(SimTime::ZERO + hop).unwrap();
        assert_eq!(hits(&sim, action_ids::CHI_WAVE_DAMAGE).len(), 1);
        assert!(hits(&sim, action_ids::CHI_WAVE_HEALING).is_empty());
        sim.run_until(SimTime::ZERO + hop * 2).unwrap();
        assert_eq!(hits(&sim, action_ids::CHI_WAVE_HEALING).len(), 1);
    }

    #[test]
    fn chi_brew_charges_recharge_independently() {
        let (mut sim, monk, bosses) = encounter(1, all_talents());
        let chi_brew = monk.chi_brew.unwrap();

        assert!(sim.cast(chi_brew, bosses[0]).unwrap().is_success());
        sim.run_until(SimTime::from_secs(5)).unwrap();
        assert!(sim.cast(chi_brew, bosses[0]).unwrap().is_success());
        assert_eq!(
            sim.cast(chi_brew, bosses[0]).unwrap(),
            CastOutcome::Refused(CastRefusal::NoCharges)
        );
        assert_eq!(sim.next_recharge_at(chi_brew), Some(SimTime::from_secs(45)));

        sim.run_until(SimTime::from_secs(45)).unwrap();
        assert_eq!(sim.spell_charges(chi_brew), 1);
        assert_eq!(sim.next_recharge_at(chi_brew), Some(SimTime::from_secs(50)));
        sim.run_until(SimTime::from_secs(50)).unwrap();
        assert_eq!(sim.spell_charges(chi_brew), 2);
    }

    #[test]
    fn ascension_raises_max_chi_for_the_whole_fight() {
        let (mut sim, monk, _) = encounter(1, all_talents());
        assert_eq!(sim.max_resource(monk.unit, ResourceKind::Chi), Some(5.0));
        sim.run_until(SimTime::from_secs(250)).unwrap();
        let ascension = sim.aura_by_label(monk.unit, labels::ASCENSION).unwrap();
        assert!(sim.is_aura_active(ascension));
    }

    #[test]
    fn ascension_expiry_only_takes_back_its_own_chi() {
        let (mut sim, monk, _) = encounter(1, all_talents());
        sim.set_max_resource(monk.unit, ResourceKind::Chi, 7.0).unwrap();

        let ascension = sim.aura_by_label(monk.unit, labels::ASCENSION).unwrap();
        sim.deactivate_aura(ascension).unwrap();
        assert_eq!(sim.max_resource(monk.unit, ResourceKind::Chi), Some(6.0));
    }

    #[test]
    fn ascension_grows_the_serpent_mana_pool() {
        let setup = all_talents().with_stance(Stance::WiseSerpent);
        let base_mana = setup.base_mana;
        let (sim, monk, _) = encounter(1, setup);
        let max_mana = sim.max_resource(monk.unit, ResourceKind::Mana).unwrap();
        assert!((max_mana - base_mana * ASCENSION_MANA).abs() < 1e-6);
    }

    #[test]
    fn power_strikes_banks_a_sphere_at_full_chi() {
        let (mut sim, monk, bosses) = encounter(1, all_talents());
        let power_strikes = sim.aura_by_label(monk.unit, labels::POWER_STRIKES).unwrap();
        let sphere = sim.aura_by_label(monk.unit, labels::CHI_SPHERE).unwrap();

        sim.run_until(SimTime::from_secs(20)).unwrap();
        assert!(sim.is_aura_active(power_strikes));
        sim.gain(monk.unit, ResourceKind::Chi, 5.0, action_ids::CHI_BREW).unwrap();

        assert!(sim.cast(monk.jab, bosses[0]).unwrap().is_success());
        assert!(!sim.is_aura_active(power_strikes));
        assert_eq!(sim.aura_stacks(sphere), 1);

        let chi_sphere = monk.chi_sphere.unwrap();
        sim.spend(monk.unit, ResourceKind::Chi, 2.0, action_ids::CHI_BREW).unwrap();
        assert!(sim.cast(chi_sphere, bosses[0]).unwrap().is_success());
        assert!(sim.is_moving(monk.unit));
        // Picking up a second sphere is refused while walking to the first.
        sim.activate_aura(sphere).unwrap();
        assert_eq!(
            sim.cast(chi_sphere, bosses[0]).unwrap(),
            CastOutcome::Refused(CastRefusal::ConditionFailed)
        );

        sim.run_until(sim.current_time() + SimDuration::from_secs(1)).unwrap();
        assert_eq!(sim.aura_stacks(sphere), 0);
        assert_eq!(sim.current_resource(monk.unit, ResourceKind::Chi), Some(4.0));
    }

    #[test]
    fn rushing_jade_wind_ticks_every_target_and_grants_chi_on_three() {
        let (mut sim, monk, bosses) = encounter(3, all_talents());
        let rjw = monk.rushing_jade_wind.unwrap();

        assert!(sim.cast(rjw, bosses[0]).unwrap().is_success());
        let buff = sim.aura_by_label(monk.unit, labels::RUSHING_JADE_WIND).unwrap();
        assert!(sim.is_aura_active(buff));
        assert_eq!(sim.aura_remaining(buff), SimDuration::from_secs(6));
        assert_eq!(sim.spell_cooldown_remaining(rjw), SimDuration::from_secs(6));
        assert_eq!(sim.current_resource(monk.unit, ResourceKind::Chi), Some(1.0));

        sim.run_until(SimTime::from_secs(7)).unwrap();
        // One immediate tick plus eight scheduled, across three targets.
        assert_eq!(hits(&sim, action_ids::RUSHING_JADE_WIND_TICK).len(), 27);
    }

    #[test]
    fn rushing_jade_wind_cooldown_follows_haste() {
        let (mut sim, monk, bosses) = encounter(1, all_talents());
        let rjw = monk.rushing_jade_wind.unwrap();
        sim.multiply_haste(monk.unit, 1.5).unwrap();

        assert!(sim.cast(rjw, bosses[0]).unwrap().is_success());
        assert_eq!(sim.spell_cooldown_remaining(rjw), SimDuration::from_secs(4));
        assert_eq!(sim.current_resource(monk.unit, ResourceKind::Chi), Some(0.0));
    }
}
