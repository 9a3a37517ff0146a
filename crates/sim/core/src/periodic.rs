//! Generic repeating actions (timed procs, resource trickles).
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::engine::{ActionHandle, ActionPriority, Simulation};
use crate::error::{KernelFault, SimResult};
use crate::ids::PeriodicId;
use crate::time::{SimDuration, SimTime};

/// Invoked with the 1-based tick number.
pub type PeriodicFn = Arc<dyn Fn(&mut Simulation, u32) -> SimResult<()> + Send + Sync>;

#[derive(Clone)]
pub struct PeriodicActionOptions {
    pub period: SimDuration,
    pub priority: ActionPriority,
    /// Fire the first tick at start instead of one period later.
    pub tick_immediately: bool,
    /// `None` repeats until cancelled or the encounter ends.
    pub num_ticks: Option<u32>,
    pub on_action: PeriodicFn,
}

impl PeriodicActionOptions {
    pub fn new(
        period: SimDuration,
        on_action: impl Fn(&mut Simulation, u32) -> SimResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            period,
            priority: ActionPriority::Normal,
            tick_immediately: false,
            num_ticks: None,
            on_action: Arc::new(on_action),
        }
    }

    pub fn with_priority(mut self, priority: ActionPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn tick_immediately(mut self) -> Self {
        self.tick_immediately = true;
        self
    }

    pub fn with_num_ticks(mut self, num_ticks: u32) -> Self {
        self.num_ticks = Some(num_ticks);
        self
    }
}

impl fmt::Debug for PeriodicActionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicActionOptions")
            .field("period", &self.period)
            .field("priority", &self.priority)
            .field("tick_immediately", &self.tick_immediately)
            .field("num_ticks", &self.num_ticks)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct PeriodicAction {
    pub(crate) options: PeriodicActionOptions,
    pub(crate) ticks: u32,
    pub(crate) pending: Option<ActionHandle>,
    pub(crate) cancelled: bool,
}

impl PeriodicAction {
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        !self.cancelled && self.pending.is_some()
    }
}

impl Simulation {
    pub fn start_periodic_action(&mut self, options: PeriodicActionOptions) -> SimResult<PeriodicId> {
        if options.period.is_zero() && options.num_ticks.is_none() {
            return Err(KernelFault::EffectFailed {
                label: "periodic action".into(),
                reason: "zero period without a tick limit".into(),
            });
        }
        let id = PeriodicId(self.periodics.len() as u32);
        let first = if options.tick_immediately {
            self.now
        } else {
            self.now + options.period
        };
        self.periodics.push(PeriodicAction {
            options,
            ticks: 0,
            pending: None,
            cancelled: false,
        });
        self.schedule_periodic(id, first)?;
        Ok(id)
    }

    pub fn periodic_action(&self, id: PeriodicId) -> SimResult<&PeriodicAction> {
        self.periodics.get(id.index()).ok_or(KernelFault::UnknownId {
            kind: "periodic action",
            id: id.0,
        })
    }

    fn periodic_action_mut(&mut self, id: PeriodicId) -> SimResult<&mut PeriodicAction> {
        self.periodics.get_mut(id.index()).ok_or(KernelFault::UnknownId {
            kind: "periodic action",
            id: id.0,
        })
    }

    /// Stops future ticks. Idempotent, and safe from inside the action.
    pub fn cancel_periodic_action(&mut self, id: PeriodicId) -> SimResult<()> {
        let action = self.periodic_action_mut(id)?;
        action.cancelled = true;
        if let Some(handle) = action.pending.take() {
            self.queue.cancel(handle);
        }
        Ok(())
    }

    fn schedule_periodic(&mut self, id: PeriodicId, at: SimTime) -> SimResult<()> {
        let priority = self.periodic_action(id)?.options.priority;
        let handle = self.schedule(at, priority, move |sim| sim.run_periodic(id))?;
        self.periodic_action_mut(id)?.pending = Some(handle);
        Ok(())
    }

    fn run_periodic(&mut self, id: PeriodicId) -> SimResult<()> {
        let (tick, on_action) = {
            let action = self.periodic_action_mut(id)?;
            action.pending = None;
            action.ticks += 1;
            (action.ticks, action.options.on_action.clone())
        };
        trace!(target: "sim_core::periodic", periodic = %id, tick, "tick");
        on_action(self, tick)?;

        let action = self.periodic_action(id)?;
        let exhausted = action.options.num_ticks.is_some_and(|limit| tick >= limit);
        if action.cancelled || exhausted {
            return Ok(());
        }
        let next = self.now + action.options.period;
        self.schedule_periodic(id, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use std::sync::Mutex;

    fn sim() -> Simulation {
        Simulation::new(SimConfig::default().with_duration(SimDuration::from_secs(10)))
    }

    fn recorder() -> (Arc<Mutex<Vec<(u32, SimTime)>>>, impl Fn(&mut Simulation, u32) -> SimResult<()> + Send + Sync + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        (log, move |sim: &mut Simulation, tick: u32| {
            sink.lock().unwrap().push((tick, sim.current_time()));
            Ok(())
        })
    }

    #[test]
    fn immediate_first_tick_with_limit() {
        let mut sim = sim();
        let (log, on_action) = recorder();
        let id = sim
            .start_periodic_action(
                PeriodicActionOptions::new(SimDuration::from_secs(3), on_action)
                    .tick_immediately()
                    .with_num_ticks(3),
            )
            .unwrap();
        sim.run_to_end().unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (1, SimTime::ZERO),
                (2, SimTime::from_secs(3)),
                (3, SimTime::from_secs(6)),
            ]
        );
        assert!(!sim.periodic_action(id).unwrap().is_running());
    }

    #[test]
    fn unbounded_action_runs_until_the_encounter_ends() {
        let mut sim = sim();
        let (log, on_action) = recorder();
        sim.start_periodic_action(PeriodicActionOptions::new(SimDuration::from_secs(4), on_action))
            .unwrap();
        sim.run_to_end().unwrap();
        let ticks: Vec<_> = log.lock().unwrap().iter().map(|(_, at)| *at).collect();
        assert_eq!(ticks, vec![SimTime::from_secs(4), SimTime::from_secs(8)]);
    }

    #[test]
    fn cancel_from_inside_the_action_stops_it() {
        let mut sim = sim();
        let (log, record) = recorder();
        let id = PeriodicId(0);
        sim.start_periodic_action(PeriodicActionOptions::new(SimDuration::from_secs(1), move |sim, tick| {
            record(sim, tick)?;
            if tick == 2 {
                sim.cancel_periodic_action(id)?;
            }
            Ok(())
        }))
        .unwrap();
        sim.run_to_end().unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
        assert!(sim.cancel_periodic_action(id).is_ok());
    }

    #[test]
    fn zero_period_needs_a_limit() {
        let mut sim = sim();
        let err = sim
            .start_periodic_action(PeriodicActionOptions::new(SimDuration::ZERO, |_, _| Ok(())))
            .unwrap_err();
        assert!(matches!(err, KernelFault::EffectFailed { .. }));
    }
}
