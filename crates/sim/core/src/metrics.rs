//! Outbound metric sink.
//!
//! Every resource gain/spend and every damage/healing resolution records a
//! [`MetricEvent`]. Events are kept in order so two runs with the same seed
//! can be compared event by event.
use std::collections::BTreeMap;

use crate::ids::{ActionId, UnitId};
use crate::resource::ResourceKind;
use crate::time::{SimDuration, SimTime};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum MetricKind {
    Cast,
    ResourceGain {
        resource: ResourceKind,
        requested: f64,
        actual: f64,
    },
    ResourceSpend {
        resource: ResourceKind,
        amount: f64,
    },
    Damage {
        target: UnitId,
        amount: f64,
        crit: bool,
    },
    Healing {
        target: UnitId,
        amount: f64,
        crit: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetricEvent {
    pub at: SimTime,
    pub source: UnitId,
    pub action: ActionId,
    pub kind: MetricKind,
}

/// Aggregated numbers for one action.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ActionTotals {
    pub casts: u32,
    pub hits: u32,
    pub crits: u32,
    pub damage: f64,
    pub healing: f64,
    pub resource_gained: BTreeMap<ResourceKind, f64>,
    pub resource_spent: BTreeMap<ResourceKind, f64>,
}

/// Per-action aggregation of a [`MetricsLog`]. Reports flatten `by_action`
/// into labeled rows, since struct keys do not map onto JSON objects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSummary {
    pub total_damage: f64,
    pub total_healing: f64,
    pub by_action: BTreeMap<ActionId, ActionTotals>,
}

impl MetricsSummary {
    /// Damage per second over `elapsed`; zero for an empty encounter.
    pub fn dps(&self, elapsed: SimDuration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 { 0.0 } else { self.total_damage / secs }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MetricsLog {
    events: Vec<MetricEvent>,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: MetricEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[MetricEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn summary(&self) -> MetricsSummary {
        let mut summary = MetricsSummary::default();
        for event in &self.events {
            let totals = summary.by_action.entry(event.action).or_default();
            match &event.kind {
                MetricKind::Cast => totals.casts += 1,
                MetricKind::ResourceGain {
                    resource, actual, ..
                } => *totals.resource_gained.entry(*resource).or_default() += actual,
                MetricKind::ResourceSpend { resource, amount } => {
                    *totals.resource_spent.entry(*resource).or_default() += amount
                }
                MetricKind::Damage { amount, crit, .. } => {
                    totals.hits += 1;
                    totals.crits += u32::from(*crit);
                    totals.damage += amount;
                    summary.total_damage += amount;
                }
                MetricKind::Healing { amount, crit, .. } => {
                    totals.hits += 1;
                    totals.crits += u32::from(*crit);
                    totals.healing += amount;
                    summary.total_healing += amount;
                }
            }
        }
        summary
    }
}
