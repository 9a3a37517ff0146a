//! Aura engine: named, stackable, time-bounded state with lifecycle hooks.
//!
//! An aura is registered once per `(owner, label)` and then toggles between
//! inactive and active for the rest of the encounter. Expiry is an ordinary
//! pending action whose handle the aura keeps, so refresh and deactivation
//! simply cancel it.
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::engine::{ActionHandle, ActionPriority, Simulation};
use crate::error::{KernelFault, SimResult};
use crate::ids::{ActionId, AuraId, UnitId};
use crate::time::{SimDuration, SimTime};

pub type AuraCallback = Arc<dyn Fn(&mut Simulation, AuraId) -> SimResult<()> + Send + Sync>;
/// Invoked with `(old_stacks, new_stacks)`; never for a no-op change.
pub type StacksCallback = Arc<dyn Fn(&mut Simulation, AuraId, u32, u32) -> SimResult<()> + Send + Sync>;
/// Recomputes the duration at activation time.
pub type DurationFn = Arc<dyn Fn(&Simulation, AuraId) -> SimDuration + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuraDuration {
    /// Expires `d` after each activation.
    Timed(SimDuration),
    /// Activated automatically at encounter start; never expires on its own.
    Permanent,
    /// Activated explicitly; never expires on its own.
    NeverExpires,
}

/// What `activate` does to an aura that is already active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Reactivation {
    /// Restart the duration.
    #[default]
    Refresh,
    /// Leave the running instance untouched.
    Ignore,
    /// Double activation is a fault.
    Forbid,
}

#[derive(Clone)]
pub struct AuraConfig {
    pub label: String,
    pub action_id: ActionId,
    pub duration: AuraDuration,
    pub max_stacks: u32,
    pub reactivation: Reactivation,
    pub dynamic_duration: Option<DurationFn>,
    pub on_gain: Option<AuraCallback>,
    pub on_expire: Option<AuraCallback>,
    pub on_stacks_change: Option<StacksCallback>,
    pub on_reset: Option<AuraCallback>,
}

impl AuraConfig {
    pub fn new(label: impl Into<String>, duration: AuraDuration) -> Self {
        Self {
            label: label.into(),
            action_id: ActionId::default(),
            duration,
            max_stacks: 0,
            reactivation: Reactivation::Refresh,
            dynamic_duration: None,
            on_gain: None,
            on_expire: None,
            on_stacks_change: None,
            on_reset: None,
        }
    }

    pub fn timed(label: impl Into<String>, duration: SimDuration) -> Self {
        Self::new(label, AuraDuration::Timed(duration))
    }

    pub fn permanent(label: impl Into<String>) -> Self {
        Self::new(label, AuraDuration::Permanent)
    }

    pub fn never_expires(label: impl Into<String>) -> Self {
        Self::new(label, AuraDuration::NeverExpires)
    }

    pub fn with_action_id(mut self, action_id: ActionId) -> Self {
        self.action_id = action_id;
        self
    }

    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    pub fn with_reactivation(mut self, reactivation: Reactivation) -> Self {
        self.reactivation = reactivation;
        self
    }

    pub fn with_dynamic_duration(
        mut self,
        f: impl Fn(&Simulation, AuraId) -> SimDuration + Send + Sync + 'static,
    ) -> Self {
        self.dynamic_duration = Some(Arc::new(f));
        self
    }

    pub fn on_gain(
        mut self,
        f: impl Fn(&mut Simulation, AuraId) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_gain = Some(Arc::new(f));
        self
    }

    pub fn on_expire(
        mut self,
        f: impl Fn(&mut Simulation, AuraId) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_expire = Some(Arc::new(f));
        self
    }

    pub fn on_stacks_change(
        mut self,
        f: impl Fn(&mut Simulation, AuraId, u32, u32) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_stacks_change = Some(Arc::new(f));
        self
    }

    pub fn on_reset(
        mut self,
        f: impl Fn(&mut Simulation, AuraId) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_reset = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for AuraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuraConfig")
            .field("label", &self.label)
            .field("action_id", &self.action_id)
            .field("duration", &self.duration)
            .field("max_stacks", &self.max_stacks)
            .field("reactivation", &self.reactivation)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AuraState {
    pub active: bool,
    pub stacks: u32,
    pub activated_at: SimTime,
    pub expires_at: Option<SimTime>,
    /// Number of inactive -> active transitions this encounter.
    pub gains: u32,
    pub(crate) expire_handle: Option<ActionHandle>,
}

#[derive(Debug)]
pub struct Aura {
    pub(crate) id: AuraId,
    pub(crate) owner: UnitId,
    pub(crate) config: AuraConfig,
    pub(crate) state: AuraState,
}

impl Aura {
    pub fn id(&self) -> AuraId {
        self.id
    }

    pub fn owner(&self) -> UnitId {
        self.owner
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn config(&self) -> &AuraConfig {
        &self.config
    }

    pub fn state(&self) -> &AuraState {
        &self.state
    }
}

impl Simulation {
    /// Registers an inactive aura on `owner`. Labels are unique per owner.
    pub fn register_aura(&mut self, owner: UnitId, config: AuraConfig) -> SimResult<AuraId> {
        if self.unit(owner)?.auras.contains_key(&config.label) {
            return Err(KernelFault::DuplicateAura {
                unit: owner,
                label: config.label,
            });
        }
        let id = AuraId(self.auras.len() as u32);
        let label = config.label.clone();
        self.auras.push(Aura {
            id,
            owner,
            config,
            state: AuraState::default(),
        });
        self.unit_mut(owner)?.auras.insert(label, id);
        Ok(id)
    }

    /// Returns the existing aura with this label, or registers a new one.
    pub fn get_or_register_aura(&mut self, owner: UnitId, config: AuraConfig) -> SimResult<AuraId> {
        match self.aura_by_label(owner, &config.label) {
            Some(id) => Ok(id),
            None => self.register_aura(owner, config),
        }
    }

    pub fn aura_by_label(&self, owner: UnitId, label: &str) -> Option<AuraId> {
        self.units.get(owner.index())?.auras.get(label).copied()
    }

    pub fn aura(&self, id: AuraId) -> SimResult<&Aura> {
        self.auras.get(id.index()).ok_or(KernelFault::UnknownId {
            kind: "aura",
            id: id.0,
        })
    }

    fn aura_mut(&mut self, id: AuraId) -> SimResult<&mut Aura> {
        self.auras.get_mut(id.index()).ok_or(KernelFault::UnknownId {
            kind: "aura",
            id: id.0,
        })
    }

    pub fn is_aura_active(&self, id: AuraId) -> bool {
        self.auras.get(id.index()).is_some_and(|aura| aura.state.active)
    }

    pub fn aura_stacks(&self, id: AuraId) -> u32 {
        self.auras.get(id.index()).map_or(0, |aura| aura.state.stacks)
    }

    pub fn aura_expires_at(&self, id: AuraId) -> Option<SimTime> {
        self.auras.get(id.index()).and_then(|aura| aura.state.expires_at)
    }

    /// Time left on an active aura: zero when inactive, `NEVER` when it has
    /// no expiry.
    pub fn aura_remaining(&self, id: AuraId) -> SimDuration {
        match self.auras.get(id.index()) {
            Some(aura) if aura.state.active => match aura.state.expires_at {
                Some(at) => at - self.now,
                None => SimDuration::NEVER,
            },
            _ => SimDuration::ZERO,
        }
    }

    /// Changes the duration policy used by subsequent activations.
    pub fn set_aura_duration(&mut self, id: AuraId, duration: AuraDuration) -> SimResult<()> {
        self.aura_mut(id)?.config.duration = duration;
        Ok(())
    }

    pub fn activate_aura(&mut self, id: AuraId) -> SimResult<()> {
        self.activate_aura_with(id, None)
    }

    /// Activates with an explicit duration overriding the configured one.
    pub fn activate_aura_for(&mut self, id: AuraId, duration: SimDuration) -> SimResult<()> {
        self.activate_aura_with(id, Some(duration))
    }

    fn resolve_aura_duration(&self, id: AuraId, explicit: Option<SimDuration>) -> SimResult<Option<SimDuration>> {
        let aura = self.aura(id)?;
        if aura.config.duration == AuraDuration::Permanent {
            return Ok(None);
        }
        if explicit.is_some() {
            return Ok(explicit);
        }
        if let Some(duration_fn) = aura.config.dynamic_duration.clone() {
            return Ok(Some(duration_fn(self, id)));
        }
        Ok(match aura.config.duration {
            AuraDuration::Timed(duration) => Some(duration),
            AuraDuration::Permanent | AuraDuration::NeverExpires => None,
        })
    }

    fn activate_aura_with(&mut self, id: AuraId, explicit: Option<SimDuration>) -> SimResult<()> {
        let (was_active, reactivation) = {
            let aura = self.aura(id)?;
            (aura.state.active, aura.config.reactivation)
        };
        if was_active {
            match reactivation {
                Reactivation::Ignore => return Ok(()),
                Reactivation::Forbid => {
                    return Err(KernelFault::DoubleActivation {
                        aura: id,
                        label: self.aura(id)?.config.label.clone(),
                    });
                }
                Reactivation::Refresh => {}
            }
        }

        let duration = self.resolve_aura_duration(id, explicit)?;
        if let Some(handle) = self.aura_mut(id)?.state.expire_handle.take() {
            self.queue.cancel(handle);
        }
        let expires_at = duration.map(|duration| self.now + duration);
        let expire_handle = match expires_at {
            Some(at) => Some(self.schedule(at, ActionPriority::Normal, move |sim| {
                sim.expire_aura(id)
            })?),
            None => None,
        };

        let now = self.now;
        let aura = self.aura_mut(id)?;
        aura.state.expires_at = expires_at;
        aura.state.expire_handle = expire_handle;
        if was_active {
            trace!(target: "sim_core::aura", aura = %aura.config.label, "refreshed");
            return Ok(());
        }
        aura.state.active = true;
        aura.state.activated_at = now;
        aura.state.gains += 1;
        trace!(
            target: "sim_core::aura",
            aura = %aura.config.label,
            owner = %aura.owner,
            expires_at = ?expires_at,
            "gained"
        );
        if let Some(on_gain) = aura.config.on_gain.clone() {
            on_gain(self, id)?;
        }
        Ok(())
    }

    fn expire_aura(&mut self, id: AuraId) -> SimResult<()> {
        self.aura_mut(id)?.state.expire_handle = None;
        self.deactivate_aura(id)
    }

    /// Deactivates the aura. Stacks drop to zero (firing `on_stacks_change`)
    /// before `on_expire` runs. No-op when inactive.
    pub fn deactivate_aura(&mut self, id: AuraId) -> SimResult<()> {
        let (old_stacks, on_stacks_change, on_expire) = {
            let aura = self.aura_mut(id)?;
            if !aura.state.active {
                return Ok(());
            }
            aura.state.active = false;
            aura.state.expires_at = None;
            let old = aura.state.stacks;
            aura.state.stacks = 0;
            trace!(target: "sim_core::aura", aura = %aura.config.label, "expired");
            (
                old,
                aura.config.on_stacks_change.clone(),
                aura.config.on_expire.clone(),
            )
        };
        if let Some(handle) = self.aura_mut(id)?.state.expire_handle.take() {
            self.queue.cancel(handle);
        }
        if old_stacks != 0 {
            if let Some(callback) = on_stacks_change {
                callback(self, id, old_stacks, 0)?;
            }
        }
        if let Some(callback) = on_expire {
            callback(self, id)?;
        }
        Ok(())
    }

    /// Sets the stack count, clamped to `[0, max_stacks]`. Reaching zero does
    /// not deactivate.
    pub fn set_aura_stacks(&mut self, id: AuraId, stacks: u32) -> SimResult<()> {
        let (old, new, callback) = {
            let aura = self.aura_mut(id)?;
            if !aura.state.active {
                return Err(KernelFault::InactiveAura {
                    aura: id,
                    label: aura.config.label.clone(),
                });
            }
            let old = aura.state.stacks;
            let new = stacks.min(aura.config.max_stacks);
            if old == new {
                return Ok(());
            }
            aura.state.stacks = new;
            trace!(target: "sim_core::aura", aura = %aura.config.label, old, new, "stacks changed");
            (old, new, aura.config.on_stacks_change.clone())
        };
        if let Some(callback) = callback {
            callback(self, id, old, new)?;
        }
        Ok(())
    }

    pub fn add_aura_stack(&mut self, id: AuraId) -> SimResult<()> {
        let stacks = self.aura_stacks(id).saturating_add(1);
        self.set_aura_stacks(id, stacks)
    }

    pub fn remove_aura_stack(&mut self, id: AuraId) -> SimResult<()> {
        let stacks = self.aura_stacks(id).saturating_sub(1);
        self.set_aura_stacks(id, stacks)
    }

    /// Runs `on_reset` hooks and brings permanent auras up.
    pub(crate) fn reset_auras(&mut self) -> SimResult<()> {
        for index in 0..self.auras.len() {
            let id = AuraId(index as u32);
            if let Some(on_reset) = self.auras[index].config.on_reset.clone() {
                on_reset(self, id)?;
            }
            let aura = &self.auras[index];
            if aura.config.duration == AuraDuration::Permanent && !aura.state.active {
                self.activate_aura(id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::unit::Unit;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sim_with_player(duration_secs: u64) -> (Simulation, UnitId) {
        let mut sim = Simulation::new(
            SimConfig::default().with_duration(SimDuration::from_secs(duration_secs)),
        );
        let player = sim.add_unit(Unit::player("Monk")).unwrap();
        (sim, player)
    }

    #[test]
    fn stacks_clamp_and_fire_once_per_net_change() {
        let (mut sim, player) = sim_with_player(60);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let aura = sim
            .register_aura(
                player,
                AuraConfig::never_expires("Chi Sphere")
                    .with_max_stacks(3)
                    .on_stacks_change(move |_, _, old, new| {
                        sink.lock().unwrap().push((old, new));
                        Ok(())
                    }),
            )
            .unwrap();
        sim.activate_aura(aura).unwrap();
        for _ in 0..5 {
            sim.add_aura_stack(aura).unwrap();
        }
        assert_eq!(sim.aura_stacks(aura), 3);
        sim.set_aura_stacks(aura, 3).unwrap();
        sim.set_aura_stacks(aura, 0).unwrap();
        sim.remove_aura_stack(aura).unwrap();

        assert!(sim.is_aura_active(aura));
        assert_eq!(*changes.lock().unwrap(), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
    }

    #[test]
    fn stack_change_on_inactive_aura_faults() {
        let (mut sim, player) = sim_with_player(60);
        let aura = sim
            .register_aura(player, AuraConfig::never_expires("Buff").with_max_stacks(2))
            .unwrap();
        assert!(matches!(
            sim.add_aura_stack(aura),
            Err(KernelFault::InactiveAura { .. })
        ));
    }

    #[test]
    fn timed_aura_expires_and_refresh_restarts() {
        let (mut sim, player) = sim_with_player(60);
        let expired = Arc::new(AtomicU32::new(0));
        let counter = expired.clone();
        let aura = sim
            .register_aura(
                player,
                AuraConfig::timed("Tiger Power", SimDuration::from_secs(6)).on_expire(
                    move |_, _| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                ),
            )
            .unwrap();
        sim.reset().unwrap();
        sim.activate_aura(aura).unwrap();
        sim.run_until(SimTime::from_secs(4)).unwrap();
        sim.activate_aura(aura).unwrap();
        assert_eq!(sim.aura_expires_at(aura), Some(SimTime::from_secs(10)));

        sim.run_until(SimTime::from_secs(9)).unwrap();
        assert!(sim.is_aura_active(aura));
        sim.run_until(SimTime::from_secs(10)).unwrap();
        assert!(!sim.is_aura_active(aura));
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert_eq!(sim.aura(aura).unwrap().state().gains, 1);
    }

    #[test]
    fn ignore_policy_is_a_silent_noop() {
        let (mut sim, player) = sim_with_player(60);
        let gains = Arc::new(AtomicU32::new(0));
        let stack_calls = Arc::new(AtomicU32::new(0));
        let (g, s) = (gains.clone(), stack_calls.clone());
        let aura = sim
            .register_aura(
                player,
                AuraConfig::timed("Dot Marker", SimDuration::from_secs(5))
                    .with_reactivation(Reactivation::Ignore)
                    .with_max_stacks(1)
                    .on_gain(move |_, _| {
                        g.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .on_stacks_change(move |_, _, _, _| {
                        s.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .unwrap();
        sim.activate_aura(aura).unwrap();
        sim.run_until(SimTime::from_secs(2)).unwrap();
        sim.activate_aura(aura).unwrap();
        assert_eq!(sim.aura_expires_at(aura), Some(SimTime::from_secs(5)));
        assert_eq!(gains.load(Ordering::SeqCst), 1);
        assert_eq!(stack_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn forbidden_double_activation_faults() {
        let (mut sim, player) = sim_with_player(60);
        let aura = sim
            .register_aura(
                player,
                AuraConfig::never_expires("Stance").with_reactivation(Reactivation::Forbid),
            )
            .unwrap();
        sim.activate_aura(aura).unwrap();
        assert!(matches!(
            sim.activate_aura(aura),
            Err(KernelFault::DoubleActivation { .. })
        ));
    }

    #[test]
    fn permanent_aura_survives_ten_thousand_seconds() {
        let (mut sim, player) = sim_with_player(10_000);
        let aura = sim
            .register_aura(player, AuraConfig::permanent("Ascension"))
            .unwrap();
        sim.run_until(SimTime::from_secs(10_000)).unwrap();
        assert_eq!(sim.current_time(), SimTime::from_secs(10_000));
        assert!(sim.is_aura_active(aura));
        assert_eq!(sim.aura_remaining(aura), SimDuration::NEVER);
        assert_eq!(sim.aura_expires_at(aura), None);
    }

    #[test]
    fn dynamic_duration_is_computed_at_activation() {
        let (mut sim, player) = sim_with_player(60);
        let aura = sim
            .register_aura(
                player,
                AuraConfig::timed("Wind", SimDuration::from_secs(6))
                    .with_dynamic_duration(|sim, _| {
                        SimDuration::from_secs(6).mul_f64(1.0 / (1.0 + sim.current_time().as_secs_f64()))
                    }),
            )
            .unwrap();
        sim.run_until(SimTime::from_secs(1)).unwrap();
        sim.activate_aura(aura).unwrap();
        assert_eq!(sim.aura_remaining(aura), SimDuration::from_secs(3));
        sim.activate_aura_for(aura, SimDuration::from_secs(1)).unwrap();
        assert_eq!(sim.aura_remaining(aura), SimDuration::from_secs(1));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let (mut sim, player) = sim_with_player(60);
        sim.register_aura(player, AuraConfig::never_expires("Buff")).unwrap();
        assert!(matches!(
            sim.register_aura(player, AuraConfig::never_expires("Buff")),
            Err(KernelFault::DuplicateAura { .. })
        ));
        let existing = sim
            .get_or_register_aura(player, AuraConfig::never_expires("Buff"))
            .unwrap();
        assert_eq!(sim.aura_by_label(player, "Buff"), Some(existing));
    }
}
