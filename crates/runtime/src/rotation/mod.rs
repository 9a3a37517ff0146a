//! Priority-list rotation compiled into a behavior tree.
//!
//! Each enabled rule becomes `Sequence[condition?, action]` and the rules
//! hang off one [`Selector`] in file order. Values are validated once, here,
//! against the owner's spells, auras and resources:
//!
//! - a `Warning` on the condition drops the condition and keeps the rule
//! - an `Error` anywhere, or any failure building the action, drops the rule
//!
//! Every diagnostic is kept on the [`Rotation`] and logged at `warn`.
mod context;

pub use context::{Choice, RotationContext};

use behavior_tree::builder::{action, condition, sequence};
use behavior_tree::{Behavior, Selector};
use sim_core::{
    APLValue, ActionConfig, Diagnostic, RotationConfig, RuleConfig, Simulation, SpellFlags,
    UnitId, ValueBuilder,
};
use tracing::{debug, warn};

type Node = Box<dyn Behavior<RotationContext>>;

pub struct Rotation {
    tree: Selector<RotationContext>,
    /// Ids of the rules that made it into `tree`, in the same order.
    rules: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Rotation {
    /// Compiles `config` for `owner`. Never fails: rules that cannot work
    /// are left out and explained in [`Rotation::diagnostics`].
    pub fn build(sim: &Simulation, owner: UnitId, config: &RotationConfig) -> Self {
        let mut builder = ValueBuilder::new(sim, owner);
        let mut nodes = Vec::with_capacity(config.rules.len());
        let mut rules = Vec::with_capacity(config.rules.len());
        let mut diagnostics = Vec::new();

        for rule in &config.rules {
            if rule.disabled {
                debug!(target: "runtime::rotation", rule = %rule.id, "rule disabled");
                continue;
            }
            builder.for_rule(rule.id.clone());
            let built = compile_rule(&mut builder, sim, owner, rule, &mut diagnostics);
            diagnostics.extend(builder.take_dropped());
            if let Some(node) = built {
                nodes.push(node);
                rules.push(rule.id.clone());
            }
        }

        for diagnostic in &diagnostics {
            warn!(
                target: "runtime::rotation",
                rule = diagnostic.rule.as_deref().unwrap_or("-"),
                severity = diagnostic.severity.as_str(),
                message = %diagnostic.message,
                "rotation diagnostic"
            );
        }
        debug!(
            target: "runtime::rotation",
            active = rules.len(),
            configured = config.rules.len(),
            "rotation built"
        );

        Self {
            tree: Selector::new(nodes),
            rules,
            diagnostics,
        }
    }

    /// Runs the priority list once. Returns the id of the rule that acted.
    pub fn decide(&self, ctx: &mut RotationContext) -> Option<&str> {
        let index = self.tree.tick_indexed(ctx)?;
        let rule = self.rules[index].as_str();
        debug!(
            target: "runtime::rotation",
            rule,
            at = %ctx.sim.current_time(),
            "rule fired"
        );
        Some(rule)
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(
    builder: &mut ValueBuilder<'_>,
    sim: &Simulation,
    owner: UnitId,
    rule: &RuleConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Node> {
    let guard = match &rule.condition {
        None => None,
        Some(config) => match builder.build(config) {
            Ok(value) => Some(value),
            Err(diagnostic) if diagnostic.is_error() => {
                diagnostics.push(diagnostic);
                return None;
            }
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                None
            }
        },
    };

    let act = match compile_action(builder, sim, owner, rule) {
        Ok(node) => node,
        Err(diagnostic) => {
            diagnostics.push(diagnostic);
            return None;
        }
    };

    Some(match guard {
        Some(value) => sequence(vec![guard_node(value), act]),
        None => act,
    })
}

fn guard_node(value: APLValue) -> Node {
    condition(move |ctx: &RotationContext| value.get_bool(&ctx.sim))
}

fn compile_action(
    builder: &mut ValueBuilder<'_>,
    sim: &Simulation,
    owner: UnitId,
    rule: &RuleConfig,
) -> Result<Node, Diagnostic> {
    match &rule.action {
        ActionConfig::CastSpell { spell, target } => {
            let id = sim.spell_by_label(owner, spell).ok_or_else(|| {
                Diagnostic::error(format!("no spell named '{spell}'")).in_rule(rule.id.clone())
            })?;
            let castable = sim
                .spell(id)
                .is_ok_and(|spell| spell.flags().contains(SpellFlags::APL));
            if !castable {
                return Err(
                    Diagnostic::error(format!("'{spell}' cannot be cast from a rotation"))
                        .in_rule(rule.id.clone()),
                );
            }
            let target = *target;
            Ok(action(move |ctx: &mut RotationContext| ctx.cast(id, target)))
        }
        ActionConfig::Wait { duration } => {
            let duration = builder.build(duration)?;
            Ok(action(move |ctx: &mut RotationContext| {
                let wait = duration.get_duration(&ctx.sim);
                ctx.wait(wait)
            }))
        }
    }
}
