//! Encounter clock and action dispatch.
//!
//! [`Simulation`] is the single owner of every piece of encounter state:
//! clock, pending-action queue, units, auras, spells, dots, random streams
//! and metrics. All mutation flows through its methods (split across the
//! crate's modules), and scheduled callbacks receive `&mut Simulation` when
//! they fire, so no effect ever holds a reference into another.

mod queue;
mod random;

pub use queue::{ActionFn, ActionHandle, ActionPriority, ActionQueue};
pub use random::{RandomStreams, stream_seed};

use std::sync::Arc;

use tracing::{debug, trace};

use crate::aura::Aura;
use crate::config::SimConfig;
use crate::dot::Dot;
use crate::error::{KernelFault, SimResult};
use crate::ids::{ActionId, UnitId};
use crate::metrics::{MetricEvent, MetricKind, MetricsLog};
use crate::periodic::PeriodicAction;
use crate::spell::Spell;
use crate::time::{SimDuration, SimTime};
use crate::unit::Unit;

use queue::Scheduled;

/// Encounter-start hook registered by leaf content.
pub type ResetEffect = Arc<dyn Fn(&mut Simulation) -> SimResult<()> + Send + Sync>;

/// Result of one [`Simulation::advance`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// A scheduled callback ran.
    Executed,
    /// A unit reached a decision point; the caller should run its rotation.
    Decision(UnitId),
    /// The queue is drained or the encounter duration was reached.
    Finished,
}

pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) now: SimTime,
    end: SimTime,
    pub(crate) queue: ActionQueue,
    rng: RandomStreams,
    metrics: MetricsLog,
    pub(crate) units: Vec<Unit>,
    pub(crate) auras: Vec<Aura>,
    pub(crate) spells: Vec<Spell>,
    pub(crate) dots: Vec<Dot>,
    pub(crate) periodics: Vec<PeriodicAction>,
    reset_effects: Vec<ResetEffect>,
    started: bool,
    finished: bool,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let end = SimTime::ZERO + config.duration;
        let rng = RandomStreams::new(config.seed);
        Self {
            config,
            now: SimTime::ZERO,
            end,
            queue: ActionQueue::new(),
            rng,
            metrics: MetricsLog::new(),
            units: Vec::new(),
            auras: Vec::new(),
            spells: Vec::new(),
            dots: Vec::new(),
            periodics: Vec::new(),
            reset_effects: Vec::new(),
            started: false,
            finished: false,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn current_time(&self) -> SimTime {
        self.now
    }

    pub fn end_time(&self) -> SimTime {
        self.end
    }

    pub fn remaining_time(&self) -> SimDuration {
        self.end - self.now
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Schedules `action` at `at`. Scheduling in the past is a fault.
    pub fn schedule(
        &mut self,
        at: SimTime,
        priority: ActionPriority,
        action: impl FnOnce(&mut Simulation) -> SimResult<()> + Send + 'static,
    ) -> SimResult<ActionHandle> {
        if at < self.now {
            return Err(KernelFault::ScheduledInPast { at, now: self.now });
        }
        Ok(self
            .queue
            .push(at, priority, Scheduled::Callback(Box::new(action))))
    }

    pub fn schedule_after(
        &mut self,
        delay: SimDuration,
        priority: ActionPriority,
        action: impl FnOnce(&mut Simulation) -> SimResult<()> + Send + 'static,
    ) -> SimResult<ActionHandle> {
        self.schedule(self.now + delay, priority, action)
    }

    pub(crate) fn schedule_decision(&mut self, unit: UnitId, at: SimTime) -> ActionHandle {
        self.queue
            .push(at, ActionPriority::Low, Scheduled::Decision(unit))
    }

    /// Cancels a pending action. Returns `false` if it already fired.
    pub fn cancel(&mut self, handle: ActionHandle) -> bool {
        self.queue.cancel(handle)
    }

    pub fn is_pending(&self, handle: ActionHandle) -> bool {
        self.queue.contains(handle)
    }

    /// Registers a hook that runs once when the encounter starts.
    pub fn add_reset_effect(
        &mut self,
        effect: impl Fn(&mut Simulation) -> SimResult<()> + Send + Sync + 'static,
    ) {
        self.reset_effects.push(Arc::new(effect));
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Starts the encounter: aura reset hooks (permanent auras come up here),
    /// charge refills, content reset effects, then auto attacks. Runs once;
    /// `advance` calls it implicitly.
    pub fn reset(&mut self) -> SimResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        debug!(
            target: "sim_core::engine",
            seed = self.config.seed,
            duration = %self.config.duration,
            units = self.units.len(),
            spells = self.spells.len(),
            "encounter reset"
        );
        self.reset_auras()?;
        for effect in self.reset_effects.clone() {
            effect(self)?;
        }
        for index in 0..self.units.len() {
            self.start_auto_attacks(UnitId(index as u32))?;
        }
        Ok(())
    }

    /// Executes the next due action, moving the clock to its fire time.
    ///
    /// Actions scheduled for the current instant run before the clock moves.
    /// A callback fault is returned as-is and the encounter should be dropped.
    pub fn advance(&mut self) -> SimResult<Step> {
        self.reset()?;
        if self.finished {
            return Ok(Step::Finished);
        }
        let due = self.queue.peek_time().filter(|&at| at <= self.end);
        if due.is_none() {
            self.finish();
            return Ok(Step::Finished);
        }
        let Some((handle, scheduled)) = self.queue.pop_next() else {
            self.finish();
            return Ok(Step::Finished);
        };
        self.now = handle.fire_at();
        match scheduled {
            Scheduled::Callback(action) => {
                action(self)?;
                Ok(Step::Executed)
            }
            Scheduled::Decision(unit) => {
                if let Ok(unit_ref) = self.unit_mut(unit) {
                    if unit_ref.decision == Some(handle) {
                        unit_ref.decision = None;
                    }
                }
                Ok(Step::Decision(unit))
            }
        }
    }

    /// Runs every action due at or before `until`, skipping decision points,
    /// then leaves the clock at `until` (capped at the encounter end).
    pub fn run_until(&mut self, until: SimTime) -> SimResult<()> {
        self.reset()?;
        let until = until.min(self.end);
        while self.queue.peek_time().is_some_and(|at| at <= until) {
            self.advance()?;
        }
        if until > self.now {
            self.now = until;
        }
        Ok(())
    }

    /// Runs the encounter to the end, skipping decision points.
    pub fn run_to_end(&mut self) -> SimResult<()> {
        while self.advance()? != Step::Finished {}
        Ok(())
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.now = self.now.max(self.end);
        trace!(
            target: "sim_core::engine",
            at = %self.now,
            dropped = self.queue.len(),
            "encounter finished"
        );
        self.queue.clear();
    }

    // ========================================================================
    // Randomness & metrics
    // ========================================================================

    /// Uniform float in `[0, 1)` from the named stream.
    pub fn random_f64(&mut self, label: &str) -> f64 {
        self.rng.next_f64(label)
    }

    /// Rolls a proc with probability `chance` on the named stream.
    pub fn proc(&mut self, chance: f64, label: &str) -> bool {
        self.rng.proc(chance, label)
    }

    pub fn metrics(&self) -> &MetricsLog {
        &self.metrics
    }

    pub fn record_metric(&mut self, source: UnitId, action: ActionId, kind: MetricKind) {
        self.metrics.record(MetricEvent {
            at: self.now,
            source,
            action,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sim(duration_secs: u64) -> Simulation {
        Simulation::new(SimConfig::default().with_duration(SimDuration::from_secs(duration_secs)))
    }

    #[test]
    fn same_instant_actions_run_before_clock_moves() {
        let mut sim = sim(10);
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer = log.clone();
        sim.schedule(SimTime::from_secs(1), ActionPriority::Normal, move |sim| {
            outer.lock().unwrap().push(("first", sim.current_time()));
            let inner = outer.clone();
            sim.schedule_after(SimDuration::ZERO, ActionPriority::Low, move |sim| {
                inner.lock().unwrap().push(("follow-up", sim.current_time()));
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let late = log.clone();
        sim.schedule(SimTime::from_secs(2), ActionPriority::High, move |sim| {
            late.lock().unwrap().push(("later", sim.current_time()));
            Ok(())
        })
        .unwrap();

        sim.run_to_end().unwrap();
        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                ("first", SimTime::from_secs(1)),
                ("follow-up", SimTime::from_secs(1)),
                ("later", SimTime::from_secs(2)),
            ]
        );
    }

    #[test]
    fn scheduling_in_the_past_faults() {
        let mut sim = sim(10);
        sim.run_until(SimTime::from_secs(5)).unwrap();
        let err = sim
            .schedule(SimTime::from_secs(1), ActionPriority::Normal, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, KernelFault::ScheduledInPast { .. }));
    }

    #[test]
    fn duration_cap_drops_late_actions() {
        let mut sim = sim(10);
        let fired = Arc::new(Mutex::new(false));
        let flag = fired.clone();
        sim.schedule(SimTime::from_secs(11), ActionPriority::High, move |_| {
            *flag.lock().unwrap() = true;
            Ok(())
        })
        .unwrap();
        assert_eq!(sim.advance().unwrap(), Step::Finished);
        assert!(!*fired.lock().unwrap());
        assert_eq!(sim.current_time(), SimTime::from_secs(10));
    }

    #[test]
    fn callback_fault_propagates_from_advance() {
        let mut sim = sim(10);
        sim.schedule(SimTime::ZERO, ActionPriority::Normal, |_| {
            Err(KernelFault::EffectFailed {
                label: "test".into(),
                reason: "boom".into(),
            })
        })
        .unwrap();
        assert!(matches!(
            sim.advance(),
            Err(KernelFault::EffectFailed { .. })
        ));
    }

    #[test]
    fn cancelled_action_never_fires() {
        let mut sim = sim(10);
        let handle = sim
            .schedule(SimTime::from_secs(1), ActionPriority::Normal, |_| {
                Err(KernelFault::EffectFailed {
                    label: "cancelled".into(),
                    reason: "should not run".into(),
                })
            })
            .unwrap();
        assert!(sim.cancel(handle));
        assert!(!sim.cancel(handle));
        sim.run_to_end().unwrap();
    }

    #[test]
    fn decision_points_are_handed_back() {
        let mut sim = sim(10);
        let unit = sim.add_unit(Unit::player("Monk")).unwrap();
        sim.request_decision(unit, SimTime::from_secs(1)).unwrap();
        // An earlier request replaces the later one; a later one is absorbed.
        sim.request_decision(unit, SimTime::ZERO).unwrap();
        sim.request_decision(unit, SimTime::from_secs(3)).unwrap();
        assert_eq!(sim.advance().unwrap(), Step::Decision(unit));
        assert_eq!(sim.current_time(), SimTime::ZERO);
        assert_eq!(sim.advance().unwrap(), Step::Finished);
    }
}
