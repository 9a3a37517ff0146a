//! Cast/cooldown engine.
//!
//! A cast walks `Idle -> (checks) -> Committed -> [Cast | Channel] -> Idle`.
//! Checks never mutate state; a failed check is a [`CastRefusal`], not an
//! error. Commit spends the cost, starts the GCD and cooldown (or consumes a
//! charge) and then resolves `apply_effects` immediately (instant, channel)
//! or when the cast completes.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use tracing::trace;

use crate::cooldown::{ChargeTracker, Cooldown, charge_aura_config};
use crate::dot::DotConfig;
use crate::engine::{ActionHandle, ActionPriority, Simulation};
use crate::error::{ErrorSeverity, KernelFault, SimError, SimResult};
use crate::ids::{ActionId, DotId, SpellId, UnitId};
use crate::metrics::MetricKind;
use crate::resource::ResourceKind;
use crate::time::{SimDuration, SimTime};
use crate::unit::CastState;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SpellFlags: u32 {
        const CHANNELED = 1 << 0;
        /// May be referenced by rotation rules.
        const APL = 1 << 1;
        /// Triggered by other effects, never cast directly by a rotation.
        const PASSIVE = 1 << 2;
        const HELPFUL = 1 << 3;
        /// Does not wake the caster for a new decision after completion.
        const NO_ON_CAST_COMPLETE = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastModel {
    Instant,
    /// Hard cast; effects resolve when it completes.
    Cast(SimDuration),
    /// Effects resolve at once; the caster stays busy until the spell's dot
    /// ends.
    Channel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownPolicy {
    None,
    Single(SimDuration),
    MultiCharge {
        max_charges: u32,
        recharge: SimDuration,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpellCost {
    pub resource: ResourceKind,
    pub amount: f64,
}

impl SpellCost {
    pub const fn new(resource: ResourceKind, amount: f64) -> Self {
        Self { resource, amount }
    }
}

/// Cost evaluated at check time; `None` means free.
pub type CostFn = Arc<dyn Fn(&Simulation, SpellId) -> Option<SpellCost> + Send + Sync>;
pub type CastCondition = Arc<dyn Fn(&Simulation, SpellId, UnitId) -> bool + Send + Sync>;
pub type ApplyEffects = Arc<dyn Fn(&mut Simulation, SpellId, UnitId) -> SimResult<()> + Send + Sync>;

/// Why a cast did not happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum CastRefusal {
    #[error("global cooldown is active")]
    OnGcd,
    #[error("spell is on cooldown")]
    OnCooldown,
    #[error("no charges available")]
    NoCharges,
    #[error("not enough resource")]
    InsufficientResource,
    #[error("cast condition not met")]
    ConditionFailed,
    #[error("caster is busy casting or channeling")]
    Busy,
    #[error("caster is moving")]
    Moving,
    #[error("unknown spell or target")]
    InvalidTarget,
}

impl SimError for CastRefusal {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidTarget => ErrorSeverity::Validation,
            _ => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::OnGcd => "ON_GCD",
            Self::OnCooldown => "ON_COOLDOWN",
            Self::NoCharges => "NO_CHARGES",
            Self::InsufficientResource => "INSUFFICIENT_RESOURCE",
            Self::ConditionFailed => "CONDITION_FAILED",
            Self::Busy => "BUSY",
            Self::Moving => "MOVING",
            Self::InvalidTarget => "INVALID_TARGET",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOutcome {
    /// Instant spell; effects already resolved.
    Completed,
    /// Hard cast in progress.
    Started { completes_at: SimTime },
    /// Channel in progress; `ends_at` is the channel dot's scheduled end.
    Channeling { ends_at: Option<SimTime> },
    Refused(CastRefusal),
}

impl CastOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Refused(_))
    }
}

#[derive(Clone)]
pub struct SpellConfig {
    pub label: String,
    pub action_id: ActionId,
    pub flags: SpellFlags,
    pub cost: Option<CostFn>,
    pub cast: CastModel,
    /// `None` for off-GCD spells.
    pub gcd: Option<SimDuration>,
    /// Skip cast-speed scaling of the GCD and cast time.
    pub ignore_haste: bool,
    pub cooldown: CooldownPolicy,
    pub extra_condition: Option<CastCondition>,
    pub apply_effects: Option<ApplyEffects>,
    pub dot: Option<DotConfig>,
    pub damage_multiplier: f64,
    pub crit_multiplier: f64,
    /// Yards per second; `None` resolves without travel time.
    pub missile_speed: Option<f64>,
}

impl SpellConfig {
    pub const DEFAULT_GCD: SimDuration = SimDuration::from_millis(1500);
    pub const DEFAULT_CRIT_MULTIPLIER: f64 = 2.0;

    pub fn new(label: impl Into<String>, action_id: ActionId) -> Self {
        Self {
            label: label.into(),
            action_id,
            flags: SpellFlags::empty(),
            cost: None,
            cast: CastModel::Instant,
            gcd: None,
            ignore_haste: false,
            cooldown: CooldownPolicy::None,
            extra_condition: None,
            apply_effects: None,
            dot: None,
            damage_multiplier: 1.0,
            crit_multiplier: Self::DEFAULT_CRIT_MULTIPLIER,
            missile_speed: None,
        }
    }

    pub fn with_flags(mut self, flags: SpellFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_cost(mut self, cost: SpellCost) -> Self {
        self.cost = Some(Arc::new(move |_, _| Some(cost)));
        self
    }

    pub fn with_cost_fn(
        mut self,
        f: impl Fn(&Simulation, SpellId) -> Option<SpellCost> + Send + Sync + 'static,
    ) -> Self {
        self.cost = Some(Arc::new(f));
        self
    }

    pub fn with_cast(mut self, cast: CastModel) -> Self {
        if cast == CastModel::Channel {
            self.flags |= SpellFlags::CHANNELED;
        }
        self.cast = cast;
        self
    }

    pub fn with_gcd(mut self, gcd: SimDuration) -> Self {
        self.gcd = Some(gcd);
        self
    }

    pub fn ignoring_haste(mut self) -> Self {
        self.ignore_haste = true;
        self
    }

    pub fn with_cooldown(mut self, cooldown: CooldownPolicy) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_condition(
        mut self,
        f: impl Fn(&Simulation, SpellId, UnitId) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.extra_condition = Some(Arc::new(f));
        self
    }

    pub fn with_effects(
        mut self,
        f: impl Fn(&mut Simulation, SpellId, UnitId) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.apply_effects = Some(Arc::new(f));
        self
    }

    pub fn with_dot(mut self, dot: DotConfig) -> Self {
        self.dot = Some(dot);
        self
    }

    pub fn with_damage_multiplier(mut self, multiplier: f64) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    pub fn with_crit_multiplier(mut self, multiplier: f64) -> Self {
        self.crit_multiplier = multiplier;
        self
    }

    pub fn with_missile_speed(mut self, yards_per_second: f64) -> Self {
        self.missile_speed = Some(yards_per_second);
        self
    }
}

impl fmt::Debug for SpellConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpellConfig")
            .field("label", &self.label)
            .field("action_id", &self.action_id)
            .field("flags", &self.flags)
            .field("cast", &self.cast)
            .field("gcd", &self.gcd)
            .field("cooldown", &self.cooldown)
            .field("dot", &self.dot)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub(crate) enum SpellCooldown {
    None,
    Single(Cooldown),
    Charges(ChargeTracker),
}

#[derive(Clone, Debug)]
pub(crate) enum SpellDots {
    None,
    PerTarget(BTreeMap<UnitId, DotId>),
    Aoe(DotId),
}

/// Outcome of a damage or healing calculation, resolved later by
/// [`Simulation::deal_damage`] / [`Simulation::deal_healing`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpellResult {
    pub spell: SpellId,
    pub target: UnitId,
    pub amount: f64,
    pub crit: bool,
}

#[derive(Debug)]
pub struct Spell {
    pub(crate) id: SpellId,
    pub(crate) caster: UnitId,
    pub(crate) config: SpellConfig,
    pub(crate) cooldown: SpellCooldown,
    pub(crate) dots: SpellDots,
    pub(crate) casts: u32,
}

impl Spell {
    pub fn id(&self) -> SpellId {
        self.id
    }

    pub fn caster(&self) -> UnitId {
        self.caster
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn action_id(&self) -> ActionId {
        self.config.action_id
    }

    pub fn flags(&self) -> SpellFlags {
        self.config.flags
    }

    pub fn config(&self) -> &SpellConfig {
        &self.config
    }

    pub fn casts(&self) -> u32 {
        self.casts
    }
}

impl Simulation {
    /// Registers a spell for `caster`. Per-target dots are created for every
    /// enemy present at registration time, so add targets first.
    pub fn register_spell(&mut self, caster: UnitId, config: SpellConfig) -> SimResult<SpellId> {
        if self.unit(caster)?.spells.contains_key(&config.label) {
            return Err(KernelFault::DuplicateSpell {
                unit: caster,
                label: config.label,
            });
        }
        let id = SpellId(self.spells.len() as u32);
        let cooldown = match config.cooldown {
            CooldownPolicy::None => SpellCooldown::None,
            CooldownPolicy::Single(duration) => SpellCooldown::Single(Cooldown::new(duration)),
            CooldownPolicy::MultiCharge {
                max_charges,
                recharge,
            } => {
                let aura =
                    self.register_aura(caster, charge_aura_config(id, &config.label, max_charges))?;
                SpellCooldown::Charges(ChargeTracker::new(aura, max_charges, recharge))
            }
        };
        let dot_config = config.dot.clone();
        let label = config.label.clone();
        self.spells.push(Spell {
            id,
            caster,
            config,
            cooldown,
            dots: SpellDots::None,
            casts: 0,
        });
        self.unit_mut(caster)?.spells.insert(label, id);

        if let Some(dot_config) = dot_config {
            let dots = if dot_config.is_aoe {
                SpellDots::Aoe(self.create_dot(id, caster, None, dot_config)?)
            } else {
                let mut per_target = BTreeMap::new();
                for target in self.enemies() {
                    let dot = self.create_dot(id, caster, Some(target), dot_config.clone())?;
                    per_target.insert(target, dot);
                }
                SpellDots::PerTarget(per_target)
            };
            self.spell_mut(id)?.dots = dots;
        }
        Ok(id)
    }

    pub fn spell(&self, id: SpellId) -> SimResult<&Spell> {
        self.spells.get(id.index()).ok_or(KernelFault::UnknownId {
            kind: "spell",
            id: id.0,
        })
    }

    pub(crate) fn spell_mut(&mut self, id: SpellId) -> SimResult<&mut Spell> {
        self.spells.get_mut(id.index()).ok_or(KernelFault::UnknownId {
            kind: "spell",
            id: id.0,
        })
    }

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    pub fn spell_by_label(&self, caster: UnitId, label: &str) -> Option<SpellId> {
        self.units.get(caster.index())?.spells.get(label).copied()
    }

    /// The dot `spell` maintains on `target` (the shared dot for AoE spells).
    pub fn dot_for(&self, spell: SpellId, target: UnitId) -> Option<DotId> {
        match &self.spells.get(spell.index())?.dots {
            SpellDots::None => None,
            SpellDots::PerTarget(dots) => dots.get(&target).copied(),
            SpellDots::Aoe(dot) => Some(*dot),
        }
    }

    pub fn aoe_dot(&self, spell: SpellId) -> Option<DotId> {
        match &self.spells.get(spell.index())?.dots {
            SpellDots::Aoe(dot) => Some(*dot),
            _ => None,
        }
    }

    /// Current cost of `spell`, evaluated against live state.
    pub fn spell_cost(&self, spell: SpellId) -> Option<SpellCost> {
        let cost = self.spells.get(spell.index())?.config.cost.clone()?;
        cost(self, spell)
    }

    /// Cooldown (or charge) readiness only, ignoring GCD, cost and
    /// conditions.
    pub fn is_spell_ready(&self, spell: SpellId) -> bool {
        let Some(spell_ref) = self.spells.get(spell.index()) else {
            return false;
        };
        match &spell_ref.cooldown {
            SpellCooldown::None => true,
            SpellCooldown::Single(cd) => cd.is_ready(self.now),
            SpellCooldown::Charges(tracker) => self.aura_stacks(tracker.aura()) > 0,
        }
    }

    /// Time until the spell is off cooldown, or until its next charge when
    /// it has none left.
    pub fn spell_cooldown_remaining(&self, spell: SpellId) -> SimDuration {
        let Some(spell_ref) = self.spells.get(spell.index()) else {
            return SimDuration::ZERO;
        };
        match &spell_ref.cooldown {
            SpellCooldown::None => SimDuration::ZERO,
            SpellCooldown::Single(cd) => cd.remaining(self.now),
            SpellCooldown::Charges(tracker) => {
                if self.aura_stacks(tracker.aura()) > 0 {
                    SimDuration::ZERO
                } else {
                    self.time_to_next_recharge(spell)
                }
            }
        }
    }

    /// Changes a single cooldown's duration for future uses.
    pub fn set_spell_cooldown(&mut self, spell: SpellId, duration: SimDuration) -> SimResult<()> {
        if let SpellCooldown::Single(cd) = &mut self.spell_mut(spell)?.cooldown {
            cd.set_duration(duration);
        }
        Ok(())
    }

    // ========================================================================
    // Cast pipeline
    // ========================================================================

    /// Checks every cast precondition without mutating anything.
    pub fn can_cast(&self, spell: SpellId, target: UnitId) -> Result<(), CastRefusal> {
        let spell_ref = self.spells.get(spell.index()).ok_or(CastRefusal::InvalidTarget)?;
        if self.units.get(target.index()).is_none() {
            return Err(CastRefusal::InvalidTarget);
        }
        let caster = &self.units[spell_ref.caster.index()];
        if !caster.cast_state.is_idle() {
            return Err(CastRefusal::Busy);
        }
        if spell_ref.config.cast != CastModel::Instant && caster.moving_until > self.now {
            return Err(CastRefusal::Moving);
        }
        if spell_ref.config.gcd.is_some() && caster.gcd_ready_at > self.now {
            return Err(CastRefusal::OnGcd);
        }
        match &spell_ref.cooldown {
            SpellCooldown::None => {}
            SpellCooldown::Single(cd) => {
                if !cd.is_ready(self.now) {
                    return Err(CastRefusal::OnCooldown);
                }
            }
            SpellCooldown::Charges(tracker) => {
                if self.aura_stacks(tracker.aura()) == 0 {
                    return Err(CastRefusal::NoCharges);
                }
            }
        }
        if let Some(condition) = &spell_ref.config.extra_condition {
            if !condition(self, spell, target) {
                return Err(CastRefusal::ConditionFailed);
            }
        }
        if let Some(cost) = self.spell_cost(spell) {
            if !self.can_afford(spell_ref.caster, cost.resource, cost.amount) {
                return Err(CastRefusal::InsufficientResource);
            }
        }
        Ok(())
    }

    /// Attempts a cast. Refusals come back as [`CastOutcome::Refused`]; only
    /// kernel faults are errors.
    pub fn cast(&mut self, spell: SpellId, target: UnitId) -> SimResult<CastOutcome> {
        if let Err(refusal) = self.can_cast(spell, target) {
            trace!(target: "sim_core::cast", spell = %spell, reason = %refusal, "cast refused");
            return Ok(CastOutcome::Refused(refusal));
        }
        let now = self.now;
        let cost = self.spell_cost(spell);
        let (caster, action_id, cast_model, gcd, ignore_haste) = {
            let spell_ref = self.spell(spell)?;
            (
                spell_ref.caster,
                spell_ref.config.action_id,
                spell_ref.config.cast,
                spell_ref.config.gcd,
                spell_ref.config.ignore_haste,
            )
        };

        if let Some(cost) = cost {
            self.spend(caster, cost.resource, cost.amount, action_id)?;
        }
        if let Some(gcd) = gcd {
            let gcd = if ignore_haste {
                gcd
            } else {
                self.apply_cast_speed(caster, gcd).max(self.config.min_gcd)
            };
            self.unit_mut(caster)?.gcd_ready_at = now + gcd;
        }
        let charge_aura = match &mut self.spell_mut(spell)?.cooldown {
            SpellCooldown::None => None,
            SpellCooldown::Single(cd) => {
                cd.start(now);
                None
            }
            SpellCooldown::Charges(tracker) => Some(tracker.aura()),
        };
        if let Some(aura) = charge_aura {
            self.remove_aura_stack(aura)?;
        }
        self.spell_mut(spell)?.casts += 1;
        self.record_metric(caster, action_id, MetricKind::Cast);
        trace!(
            target: "sim_core::cast",
            spell = %self.spell(spell)?.label(),
            target_unit = %target,
            at = %now,
            "cast committed"
        );

        match cast_model {
            CastModel::Instant => {
                self.resolve_spell(spell, target)?;
                Ok(CastOutcome::Completed)
            }
            CastModel::Cast(cast_time) => {
                let cast_time = if ignore_haste {
                    cast_time
                } else {
                    self.apply_cast_speed(caster, cast_time)
                };
                let completes_at = now + cast_time;
                self.unit_mut(caster)?.cast_state = CastState::Casting {
                    spell,
                    completes_at,
                };
                self.schedule(completes_at, ActionPriority::Normal, move |sim| {
                    sim.complete_cast(spell, target)
                })?;
                Ok(CastOutcome::Started { completes_at })
            }
            CastModel::Channel => {
                self.unit_mut(caster)?.cast_state = CastState::Channeling { spell };
                self.resolve_spell(spell, target)?;
                let dot = self.dot_for(spell, target);
                let ends_at = dot.and_then(|dot| self.dot_expires_at(dot));
                if !dot.is_some_and(|dot| self.is_dot_active(dot)) {
                    // Nothing left to channel.
                    self.finish_channel(spell)?;
                }
                Ok(CastOutcome::Channeling { ends_at })
            }
        }
    }

    fn complete_cast(&mut self, spell: SpellId, target: UnitId) -> SimResult<()> {
        let (caster, wake) = {
            let spell_ref = self.spell(spell)?;
            (
                spell_ref.caster,
                !spell_ref.config.flags.contains(SpellFlags::NO_ON_CAST_COMPLETE),
            )
        };
        self.unit_mut(caster)?.cast_state = CastState::Idle;
        self.resolve_spell(spell, target)?;
        if wake {
            self.request_decision(caster, self.now)?;
        }
        Ok(())
    }

    /// Returns the caster to idle if it is still channeling `spell`.
    pub(crate) fn finish_channel(&mut self, spell: SpellId) -> SimResult<()> {
        let caster = self.spell(spell)?.caster;
        let unit = self.unit_mut(caster)?;
        if unit.cast_state != (CastState::Channeling { spell }) {
            return Ok(());
        }
        unit.cast_state = CastState::Idle;
        self.request_decision(caster, self.now)
    }

    /// Runs the spell's effects: `apply_effects` if set, otherwise applies
    /// its dot to the target.
    fn resolve_spell(&mut self, spell: SpellId, target: UnitId) -> SimResult<()> {
        let effects = self.spell(spell)?.config.apply_effects.clone();
        match effects {
            Some(effects) => effects(self, spell, target),
            None => match self.dot_for(spell, target) {
                Some(dot) => self.apply_dot(dot),
                None => Ok(()),
            },
        }
    }

    // ========================================================================
    // Damage & healing resolution
    // ========================================================================

    fn roll_outcome(&mut self, spell: SpellId, target: UnitId, base: f64) -> SimResult<SpellResult> {
        let (caster, label, multiplier, crit_multiplier) = {
            let spell_ref = self.spell(spell)?;
            (
                spell_ref.caster,
                spell_ref.config.label.clone(),
                spell_ref.config.damage_multiplier,
                spell_ref.config.crit_multiplier,
            )
        };
        let crit_chance = self.unit(caster)?.crit_chance;
        let crit = self.proc(crit_chance, &format!("{label} Crit"));
        let mut amount = base.max(0.0) * multiplier;
        if crit {
            amount *= crit_multiplier;
        }
        Ok(SpellResult {
            spell,
            target,
            amount,
            crit,
        })
    }

    /// Rolls crit and applies multipliers; nothing is dealt yet.
    pub fn calc_damage(&mut self, spell: SpellId, target: UnitId, base: f64) -> SimResult<SpellResult> {
        self.roll_outcome(spell, target, base)
    }

    pub fn deal_damage(&mut self, result: SpellResult) -> SimResult<()> {
        let (caster, action_id) = {
            let spell_ref = self.spell(result.spell)?;
            (spell_ref.caster, spell_ref.config.action_id)
        };
        self.drain(result.target, ResourceKind::Health, result.amount)?;
        self.record_metric(
            caster,
            action_id,
            MetricKind::Damage {
                target: result.target,
                amount: result.amount,
                crit: result.crit,
            },
        );
        Ok(())
    }

    pub fn calc_and_deal_damage(&mut self, spell: SpellId, target: UnitId, base: f64) -> SimResult<SpellResult> {
        let result = self.calc_damage(spell, target, base)?;
        self.deal_damage(result)?;
        Ok(result)
    }

    pub fn calc_healing(&mut self, spell: SpellId, target: UnitId, base: f64) -> SimResult<SpellResult> {
        self.roll_outcome(spell, target, base)
    }

    pub fn deal_healing(&mut self, result: SpellResult) -> SimResult<()> {
        let (caster, action_id) = {
            let spell_ref = self.spell(result.spell)?;
            (spell_ref.caster, spell_ref.config.action_id)
        };
        if self.has_resource(result.target, ResourceKind::Health) {
            let now = self.now;
            if let Some(pool) = self
                .unit_mut(result.target)?
                .resources
                .get_mut(ResourceKind::Health)
            {
                pool.gain(result.amount, now)?;
            }
        }
        self.record_metric(
            caster,
            action_id,
            MetricKind::Healing {
                target: result.target,
                amount: result.amount,
                crit: result.crit,
            },
        );
        Ok(())
    }

    /// Flight time from caster to target: distance over missile speed.
    pub fn travel_time(&self, spell: SpellId) -> SimDuration {
        let Some(spell_ref) = self.spells.get(spell.index()) else {
            return SimDuration::ZERO;
        };
        match spell_ref.config.missile_speed {
            Some(speed) if speed > 0.0 => {
                SimDuration::from_secs_f64(self.unit_distance(spell_ref.caster) / speed)
            }
            _ => SimDuration::ZERO,
        }
    }

    /// Runs `land` once the spell's missile arrives.
    pub fn wait_travel_time(
        &mut self,
        spell: SpellId,
        land: impl FnOnce(&mut Simulation) -> SimResult<()> + Send + 'static,
    ) -> SimResult<ActionHandle> {
        let delay = self.travel_time(spell);
        self.schedule_after(delay, ActionPriority::Normal, land)
    }
}
