//! Monk class kit.
//!
//! [`Monk::register`] adds a monk to a simulation from a [`MonkSetup`]:
//! resource pools for the chosen stance, auto attacks, the baseline strikes
//! and Crackling Jade Lightning, and every talent the setup selects (gated by
//! level the same way the talent rows unlock).
mod abilities;
mod jade_lightning;
mod talents;

use sim_core::{
    ActionId, AutoAttackConfig, AuraConfig, ResourceKind, ResourcePool, SimDuration, SimResult,
    Simulation, SpellCost, SpellId, Unit, UnitId,
};
use tracing::debug;

/// Spell and aura labels, as rotation rules reference them.
pub mod labels {
    pub const JAB: &str = "Jab";
    pub const TIGER_PALM: &str = "Tiger Palm";
    pub const BLACKOUT_KICK: &str = "Blackout Kick";
    pub const CRACKLING_JADE_LIGHTNING: &str = "Crackling Jade Lightning";
    pub const CHI_WAVE: &str = "Chi Wave";
    pub const CHI_WAVE_DAMAGE: &str = "Chi Wave (Damage)";
    pub const CHI_WAVE_HEALING: &str = "Chi Wave (Healing)";
    pub const CHI_SPHERE: &str = "Chi Sphere";
    pub const CHI_SPHERE_USE: &str = "Chi Sphere (Use)";
    pub const POWER_STRIKES: &str = "Power Strikes";
    pub const ASCENSION: &str = "Ascension";
    pub const CHI_BREW: &str = "Chi Brew";
    pub const RUSHING_JADE_WIND: &str = "Rushing Jade Wind";
    pub const RUSHING_JADE_WIND_TICK: &str = "Rushing Jade Wind (Tick)";
    pub const TIGER_POWER: &str = "Tiger Power";
}

pub(crate) mod action_ids {
    use sim_core::ActionId;

    pub const AUTO_ATTACK: ActionId = ActionId::spell(6603);
    pub const JAB: ActionId = ActionId::spell(100780);
    pub const TIGER_PALM: ActionId = ActionId::spell(100787);
    pub const TIGER_POWER: ActionId = ActionId::spell(125359);
    pub const BLACKOUT_KICK: ActionId = ActionId::spell(100784);
    pub const CRACKLING_JADE_LIGHTNING: ActionId = ActionId::spell(117952);
    pub const CRACKLING_JADE_LIGHTNING_CHI: ActionId = ActionId::spell(123333);
    pub const CHI_WAVE: ActionId = ActionId::spell(115098);
    pub const CHI_WAVE_DAMAGE: ActionId = ActionId::spell(132467);
    pub const CHI_WAVE_HEALING: ActionId = ActionId::spell(132463);
    pub const CHI_SPHERE: ActionId = ActionId::spell(121283);
    pub const CHI_SPHERE_AURA: ActionId = ActionId::spell(121286);
    pub const POWER_STRIKES: ActionId = ActionId::spell(129914);
    pub const ASCENSION: ActionId = ActionId::spell(115396);
    pub const CHI_BREW: ActionId = ActionId::spell(115399);
    pub const RUSHING_JADE_WIND: ActionId = ActionId::spell(116847);
    pub const RUSHING_JADE_WIND_TICK: ActionId = ActionId::spell(148187);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stance {
    #[default]
    FierceTiger,
    SturdyOx,
    /// Abilities cost mana instead of energy.
    WiseSerpent,
}

impl Stance {
    pub const fn aura_label(self) -> &'static str {
        match self {
            Self::FierceTiger => "Stance of the Fierce Tiger",
            Self::SturdyOx => "Stance of the Sturdy Ox",
            Self::WiseSerpent => "Stance of the Wise Serpent",
        }
    }

    pub const fn action_id(self) -> ActionId {
        match self {
            Self::FierceTiger => ActionId::spell(103985),
            Self::SturdyOx => ActionId::spell(115069),
            Self::WiseSerpent => ActionId::spell(115070),
        }
    }

    pub const fn uses_mana(self) -> bool {
        matches!(self, Self::WiseSerpent)
    }
}

/// Selected talents. Each only takes effect once the monk's level unlocks
/// its row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MonkTalents {
    pub chi_wave: bool,
    pub power_strikes: bool,
    pub ascension: bool,
    pub chi_brew: bool,
    pub rushing_jade_wind: bool,
}

/// Character sheet for one monk.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MonkSetup {
    pub label: String,
    pub level: u32,
    pub stance: Stance,
    pub talents: MonkTalents,
    pub health: f64,
    pub attack_power: f64,
    /// Crit chance in `[0, 1]`.
    pub crit_chance: f64,
    /// Haste multiplier; `1.1` is 10% haste.
    pub haste: f64,
    /// Average main-hand weapon damage.
    pub weapon_damage: f64,
    pub swing_speed: SimDuration,
    /// Per-level spell scaling factor used by Chi Wave and Crackling Jade
    /// Lightning.
    pub spell_scaling: f64,
    pub base_mana: f64,
    /// Yards per second.
    pub movement_speed: f64,
}

impl MonkSetup {
    pub const MAX_LEVEL: u32 = 90;
    pub const BASE_MAX_ENERGY: f64 = 100.0;
    pub const BASE_ENERGY_REGEN: f64 = 10.0;
    pub const BASE_MAX_CHI: f64 = 4.0;
    /// Mana regenerated per second as a fraction of base mana.
    pub const MANA_REGEN_FRACTION: f64 = 0.02;

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_stance(mut self, stance: Stance) -> Self {
        self.stance = stance;
        self
    }

    pub fn with_talents(mut self, talents: MonkTalents) -> Self {
        self.talents = talents;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_haste(mut self, haste: f64) -> Self {
        self.haste = haste;
        self
    }

    pub fn with_crit_chance(mut self, crit_chance: f64) -> Self {
        self.crit_chance = crit_chance;
        self
    }

    /// The resource an ability pays in this stance: `energy` points, or
    /// `mana_fraction` of base mana in Wise Serpent. Zero means free.
    pub fn cost(&self, energy: f64, mana_fraction: f64) -> Option<SpellCost> {
        let cost = if self.stance.uses_mana() {
            SpellCost::new(ResourceKind::Mana, mana_fraction * self.base_mana)
        } else {
            SpellCost::new(ResourceKind::Energy, energy)
        };
        (cost.amount > 0.0).then_some(cost)
    }

    /// Weapon-based strike damage before ability coefficients.
    pub fn strike_damage(&self) -> f64 {
        const NORMALIZED_SPEED: f64 = 2.4;
        self.weapon_damage + self.attack_power / 14.0 * NORMALIZED_SPEED
    }

    fn unit(&self) -> Unit {
        let mut unit = Unit::player(self.label.clone())
            .with_resource(ResourcePool::full(ResourceKind::Health, self.health))
            .with_resource(ResourcePool::new(ResourceKind::Chi, 0.0, Self::BASE_MAX_CHI))
            .with_haste(self.haste)
            .with_crit_chance(self.crit_chance)
            .with_attack_power(self.attack_power)
            .with_movement_speed(self.movement_speed)
            .with_auto_attacks(AutoAttackConfig {
                action_id: action_ids::AUTO_ATTACK,
                swing_speed: self.swing_speed,
                damage: self.weapon_damage + self.attack_power / 14.0 * self.swing_speed.as_secs_f64(),
            });
        unit = if self.stance.uses_mana() {
            unit.with_resource(
                ResourcePool::full(ResourceKind::Mana, self.base_mana)
                    .with_regen(self.base_mana * Self::MANA_REGEN_FRACTION),
            )
        } else {
            unit.with_resource(
                ResourcePool::full(ResourceKind::Energy, Self::BASE_MAX_ENERGY)
                    .with_regen(Self::BASE_ENERGY_REGEN),
            )
        };
        unit
    }
}

impl Default for MonkSetup {
    fn default() -> Self {
        Self {
            label: "Monk".into(),
            level: Self::MAX_LEVEL,
            stance: Stance::default(),
            talents: MonkTalents::default(),
            health: 450_000.0,
            attack_power: 25_000.0,
            crit_chance: 0.15,
            haste: 1.0,
            weapon_damage: 9_000.0,
            swing_speed: SimDuration::from_millis(2_600),
            spell_scaling: 1_004.5,
            base_mana: 60_000.0,
            movement_speed: Unit::DEFAULT_MOVEMENT_SPEED,
        }
    }
}

/// Ids of a registered monk's unit and spells.
#[derive(Clone, Debug, PartialEq)]
pub struct Monk {
    pub unit: UnitId,
    pub stance: Stance,
    pub jab: SpellId,
    pub tiger_palm: SpellId,
    pub blackout_kick: SpellId,
    pub crackling_jade_lightning: SpellId,
    pub chi_wave: Option<SpellId>,
    pub chi_sphere: Option<SpellId>,
    pub chi_brew: Option<SpellId>,
    pub rushing_jade_wind: Option<SpellId>,
}

impl Monk {
    /// Adds the monk and its kit to `sim`. Register targets first: per-target
    /// dots are created for the enemies present at this point.
    pub fn register(sim: &mut Simulation, setup: &MonkSetup) -> SimResult<Self> {
        let unit = sim.add_unit(setup.unit())?;
        sim.register_aura(
            unit,
            AuraConfig::permanent(setup.stance.aura_label()).with_action_id(setup.stance.action_id()),
        )?;

        let jab = abilities::register_jab(sim, unit, setup)?;
        let tiger_palm = abilities::register_tiger_palm(sim, unit, setup)?;
        let blackout_kick = abilities::register_blackout_kick(sim, unit, setup)?;
        let crackling_jade_lightning = jade_lightning::register(sim, unit, setup)?;

        let mut monk = Self {
            unit,
            stance: setup.stance,
            jab,
            tiger_palm,
            blackout_kick,
            crackling_jade_lightning,
            chi_wave: None,
            chi_sphere: None,
            chi_brew: None,
            rushing_jade_wind: None,
        };
        talents::apply_talents(sim, &mut monk, setup)?;

        debug!(
            target: "sim_content::monk",
            label = %setup.label,
            level = setup.level,
            stance = setup.stance.aura_label(),
            "monk registered"
        );
        Ok(monk)
    }
}

pub(crate) fn gain_chi(sim: &mut Simulation, unit: UnitId, amount: f64, action: ActionId) -> SimResult<()> {
    sim.gain(unit, ResourceKind::Chi, amount, action)?;
    Ok(())
}
