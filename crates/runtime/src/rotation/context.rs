//! Blackboard for one rotation tick.
use sim_core::{
    CastOutcome, KernelFault, SimDuration, SimTime, Simulation, SpellId, UnitId, UnitReference,
};
use behavior_tree::Status;
use tracing::trace;

/// What the rotation decided to do at a decision point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Choice {
    /// A cast the kernel accepted.
    Cast { spell: SpellId, outcome: CastOutcome },
    /// Do nothing until `until`.
    Wait { until: SimTime },
}

/// Owns the simulation while the encounter runs, so the rotation tree can
/// act on it without borrowing across the run loop.
pub struct RotationContext {
    pub(crate) sim: Simulation,
    pub(crate) unit: UnitId,
    choice: Option<Choice>,
    fault: Option<KernelFault>,
}

impl RotationContext {
    pub fn new(sim: Simulation, unit: UnitId) -> Self {
        Self {
            sim,
            unit,
            choice: None,
            fault: None,
        }
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub(crate) fn take_choice(&mut self) -> Option<Choice> {
        self.choice.take()
    }

    pub(crate) fn take_fault(&mut self) -> Option<KernelFault> {
        self.fault.take()
    }

    fn resolve(&self, reference: UnitReference) -> Option<UnitId> {
        match reference {
            UnitReference::Player => Some(self.unit),
            UnitReference::CurrentTarget => self.sim.unit(self.unit).ok()?.current_target(),
        }
    }

    /// Tries `spell` on the referenced unit. A kernel fault also counts as
    /// success so the selector stops and the runner can abort.
    pub(crate) fn cast(&mut self, spell: SpellId, target: UnitReference) -> Status {
        let Some(target) = self.resolve(target) else {
            return Status::Failure;
        };
        match self.sim.cast(spell, target) {
            Ok(CastOutcome::Refused(reason)) => {
                trace!(
                    target: "runtime::rotation",
                    spell = %spell,
                    reason = %reason,
                    "rule skipped"
                );
                Status::Failure
            }
            Ok(outcome) => {
                self.choice = Some(Choice::Cast { spell, outcome });
                Status::Success
            }
            Err(fault) => {
                self.fault = Some(fault);
                Status::Success
            }
        }
    }

    /// Idles for `duration`. A zero wait would only spin, so it fails.
    pub(crate) fn wait(&mut self, duration: SimDuration) -> Status {
        if duration == SimDuration::ZERO {
            return Status::Failure;
        }
        self.choice = Some(Choice::Wait {
            until: self.sim.current_time() + duration,
        });
        Status::Success
    }
}
