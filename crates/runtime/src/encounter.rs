//! Single-encounter driver.
//!
//! Builds the simulation for a [`Scenario`], then pumps
//! [`Simulation::advance`] until the encounter ends. Every decision point
//! for the player runs the rotation once and schedules the next one:
//!
//! - after an instant cast, at the same instant (off-GCD follow-ups)
//! - after a cast or channel start, when it completes or ends
//! - after a wait, when the wait is over
//! - otherwise at [`Simulation::next_decision_time`]
//!
//! More than [`SimConfig::MAX_DECISIONS_PER_INSTANT`] decisions at one
//! instant falls back to polling.
use sim_content::Monk;
use sim_core::{
    CastOutcome, Diagnostic, KernelFault, ResourceKind, ResourcePool, SimConfig, SimError,
    SimResult, SimTime, Simulation, Step, Unit, UnitId,
};
use tracing::{debug, error, info, warn};

use crate::error::{Result, RuntimeError};
use crate::report::EncounterReport;
use crate::rotation::{Choice, Rotation, RotationContext};
use crate::scenario::Scenario;

/// Health of every encounter target; large enough to never die.
pub const TARGET_HEALTH: f64 = 1.0e9;

pub struct Encounter {
    context: RotationContext,
    rotation: Rotation,
    monk: Monk,
    last_decision_at: Option<SimTime>,
    decisions_this_instant: u32,
}

impl Encounter {
    /// Adds the targets first so the monk starts out targeting the first of
    /// them, then registers the monk and compiles the rotation.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        scenario
            .config
            .validate()
            .map_err(|fault| RuntimeError::InvalidConfig(fault.to_string()))?;
        let targets = scenario.config.num_targets as usize;

        let mut sim = Simulation::new(scenario.config.clone());
        for index in 1..=targets {
            sim.add_unit(
                Unit::enemy(format!("Target {index}"))
                    .with_resource(ResourcePool::full(ResourceKind::Health, TARGET_HEALTH)),
            )
            .map_err(RuntimeError::Setup)?;
        }
        let monk = Monk::register(&mut sim, &scenario.setup).map_err(RuntimeError::Setup)?;
        let rotation = Rotation::build(&sim, monk.unit, &scenario.rotation);

        Ok(Self {
            context: RotationContext::new(sim, monk.unit),
            rotation,
            monk,
            last_decision_at: None,
            decisions_this_instant: 0,
        })
    }

    pub fn simulation(&self) -> &Simulation {
        self.context.sim()
    }

    pub fn monk(&self) -> &Monk {
        &self.monk
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.rotation.diagnostics()
    }

    /// Runs the encounter to its end. A kernel fault aborts the run and is
    /// returned with the seed and time it happened at.
    pub fn run(&mut self) -> Result<EncounterReport> {
        let seed = self.simulation().config().seed;
        info!(
            target: "runtime::encounter",
            seed,
            duration = %self.simulation().config().duration,
            targets = self.simulation().enemies().len(),
            rules = self.rotation.rules().len(),
            "encounter started"
        );

        if let Err(fault) = self.drive() {
            let at = self.simulation().current_time();
            error!(
                target: "runtime::encounter",
                seed,
                at = %at,
                code = fault.error_code(),
                error = %fault,
                "encounter aborted by kernel fault"
            );
            return Err(RuntimeError::Kernel { seed, at, fault });
        }

        let report = self.report();
        info!(
            target: "runtime::encounter",
            seed,
            dps = report.dps,
            total_damage = report.total_damage,
            "encounter finished"
        );
        Ok(report)
    }

    pub fn report(&self) -> EncounterReport {
        EncounterReport::from_simulation(self.simulation(), self.rotation.diagnostics())
    }

    fn drive(&mut self) -> SimResult<()> {
        let player = self.monk.unit;
        self.context.sim.reset()?;
        let now = self.context.sim.current_time();
        self.context.sim.request_decision(player, now)?;
        loop {
            match self.context.sim.advance()? {
                Step::Executed => {}
                Step::Decision(unit) if unit == player => self.decide(unit)?,
                Step::Decision(_) => {}
                Step::Finished => return Ok(()),
            }
        }
    }

    fn decide(&mut self, unit: UnitId) -> SimResult<()> {
        let now = self.context.sim.current_time();
        if self.last_decision_at == Some(now) {
            self.decisions_this_instant += 1;
        } else {
            self.last_decision_at = Some(now);
            self.decisions_this_instant = 1;
        }
        if self.decisions_this_instant > SimConfig::MAX_DECISIONS_PER_INSTANT {
            warn!(
                target: "runtime::encounter",
                at = %now,
                limit = SimConfig::MAX_DECISIONS_PER_INSTANT,
                "too many decisions at one instant, polling"
            );
            let poll = now + self.context.sim.config().decision_poll_interval;
            if poll <= now {
                return Err(KernelFault::EffectFailed {
                    label: "decision poll".into(),
                    reason: format!("poll at {poll} does not move past {now}"),
                });
            }
            return self.context.sim.request_decision(unit, poll);
        }

        let rule = self.rotation.decide(&mut self.context).map(str::to_owned);
        if let Some(fault) = self.context.take_fault() {
            return Err(fault);
        }
        let next = match self.context.take_choice() {
            Some(Choice::Cast { outcome, .. }) => match outcome {
                CastOutcome::Completed => Some(now),
                CastOutcome::Started { completes_at } => Some(completes_at),
                CastOutcome::Channeling { ends_at } => ends_at,
                CastOutcome::Refused(_) => None,
            },
            Some(Choice::Wait { until }) => Some(until),
            None => None,
        };
        let next = next.or_else(|| self.context.sim.next_decision_time(unit));
        debug!(
            target: "runtime::encounter",
            at = %now,
            rule = rule.as_deref().unwrap_or("-"),
            next = ?next,
            "decision"
        );
        match next {
            Some(at) => self.context.sim.request_decision(unit, at),
            // Busy casting: completion wakes the unit.
            None => Ok(()),
        }
    }
}

/// Builds and runs one encounter.
pub fn run_encounter(scenario: &Scenario) -> Result<EncounterReport> {
    Encounter::new(scenario)?.run()
}
