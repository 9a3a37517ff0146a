//! Serializable results of encounters and batches.
//!
//! [`sim_core::MetricsSummary`] is keyed by [`ActionId`], which does not map
//! onto a JSON object, so reports flatten it into labeled rows.
use std::collections::BTreeMap;

use serde::Serialize;
use sim_core::{ActionId, ActionTotals, Diagnostic, ResourceKind, SimDuration, Simulation};

/// Aggregated numbers for one action, labeled for humans.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionRow {
    pub label: String,
    pub action: ActionId,
    pub casts: u32,
    pub hits: u32,
    pub crits: u32,
    pub damage: f64,
    pub healing: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_gained: BTreeMap<ResourceKind, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_spent: BTreeMap<ResourceKind, f64>,
}

impl ActionRow {
    fn new(label: String, action: ActionId, totals: ActionTotals) -> Self {
        Self {
            label,
            action,
            casts: totals.casts,
            hits: totals.hits,
            crits: totals.crits,
            damage: totals.damage,
            healing: totals.healing,
            resource_gained: totals.resource_gained,
            resource_spent: totals.resource_spent,
        }
    }
}

/// Outcome of one encounter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EncounterReport {
    pub seed: u64,
    pub duration: SimDuration,
    pub total_damage: f64,
    pub total_healing: f64,
    pub dps: f64,
    /// Highest damage first.
    pub actions: Vec<ActionRow>,
    pub diagnostics: Vec<Diagnostic>,
}

impl EncounterReport {
    pub fn from_simulation(sim: &Simulation, diagnostics: &[Diagnostic]) -> Self {
        let elapsed = sim.current_time() - sim_core::SimTime::ZERO;
        let summary = sim.metrics().summary();
        let dps = summary.dps(elapsed);

        let mut labels: BTreeMap<ActionId, &str> = BTreeMap::new();
        for spell in sim.spells() {
            labels.entry(spell.action_id()).or_insert(spell.label());
        }
        let mut actions: Vec<ActionRow> = summary
            .by_action
            .into_iter()
            .map(|(action, totals)| {
                let label = labels
                    .get(&action)
                    .map_or_else(|| action.to_string(), |label| (*label).to_string());
                ActionRow::new(label, action, totals)
            })
            .collect();
        actions.sort_by(|a, b| b.damage.total_cmp(&a.damage).then(a.action.cmp(&b.action)));

        Self {
            seed: sim.config().seed,
            duration: elapsed,
            total_damage: summary.total_damage,
            total_healing: summary.total_healing,
            dps,
            actions,
            diagnostics: diagnostics.to_vec(),
        }
    }

    pub fn action(&self, label: &str) -> Option<&ActionRow> {
        self.actions.iter().find(|row| row.label == label)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One line per batch iteration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationSummary {
    pub iteration: u32,
    pub seed: u64,
    pub total_damage: f64,
    pub dps: f64,
}

/// Outcome of a batch of independent encounters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchReport {
    pub iterations: u32,
    pub mean_dps: f64,
    pub min_dps: f64,
    pub max_dps: f64,
    /// Ordered by iteration index.
    pub runs: Vec<IterationSummary>,
    /// Full breakdown of the first iteration.
    pub sample: EncounterReport,
}

impl BatchReport {
    /// Builds the report from per-iteration reports sorted by iteration.
    /// Returns `None` for an empty batch.
    pub fn from_reports(reports: Vec<(u32, EncounterReport)>) -> Option<Self> {
        let runs: Vec<IterationSummary> = reports
            .iter()
            .map(|(iteration, report)| IterationSummary {
                iteration: *iteration,
                seed: report.seed,
                total_damage: report.total_damage,
                dps: report.dps,
            })
            .collect();
        let sample = reports.into_iter().next()?.1;

        let total: f64 = runs.iter().map(|run| run.dps).sum();
        let min_dps = runs.iter().map(|run| run.dps).fold(f64::INFINITY, f64::min);
        let max_dps = runs.iter().map(|run| run.dps).fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            iterations: runs.len() as u32,
            mean_dps: total / runs.len() as f64,
            min_dps,
            max_dps,
            runs,
            sample,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
