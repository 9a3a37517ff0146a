//! Rotation loader.

use std::path::Path;

use sim_core::RotationConfig;
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Loader for priority-list rotations from RON files.
pub struct RotationLoader;

impl RotationLoader {
    pub fn load(path: &Path) -> LoadResult<RotationConfig> {
        let content = read_file(path)?;
        let rotation = Self::parse(&content)?;
        debug!(
            target: "sim_content::loaders",
            path = %path.display(),
            rules = rotation.rules.len(),
            "loaded rotation"
        );
        Ok(rotation)
    }

    pub fn parse(content: &str) -> LoadResult<RotationConfig> {
        let rotation: RotationConfig = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse rotation RON: {}", e))?;
        let mut seen = std::collections::BTreeSet::new();
        for rule in &rotation.rules {
            if !seen.insert(rule.id.as_str()) {
                anyhow::bail!("duplicate rule id '{}'", rule.id);
            }
        }
        Ok(rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{ActionConfig, CompareOp, UnitReference, ValueConfig};
    use std::fs;
    use tempfile::TempDir;

    const ROTATION: &str = r#"
(
    rules: [
        (
            id: "blackout_kick",
            action: cast_spell(spell: "Blackout Kick"),
            condition: Some(cmp(op: ge, lhs: current_chi, rhs: const(int(2)))),
        ),
        (
            id: "tiger_palm",
            action: cast_spell(spell: "Tiger Palm", target: current_target),
            condition: Some(not(aura_is_active(aura: "Tiger Power"))),
            disabled: true,
        ),
        (
            id: "wait",
            action: wait(duration: const(duration(0.5))),
        ),
    ],
)
"#;

    #[test]
    fn parses_rules_in_priority_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rotation.ron");
        fs::write(&path, ROTATION).unwrap();

        let rotation = RotationLoader::load(&path).unwrap();
        assert_eq!(rotation.rules.len(), 3);
        assert_eq!(rotation.rules[0].id, "blackout_kick");
        assert_eq!(
            rotation.rules[0].condition,
            Some(ValueConfig::cmp(CompareOp::Ge, ValueConfig::CurrentChi, ValueConfig::int(2)))
        );
        assert_eq!(
            rotation.rules[1].condition,
            Some(ValueConfig::Not(Box::new(ValueConfig::AuraIsActive {
                aura: "Tiger Power".into(),
                unit: UnitReference::Player,
            })))
        );
        assert!(rotation.rules[1].disabled);
        assert!(matches!(
            rotation.rules[0].action,
            ActionConfig::CastSpell {
                target: UnitReference::CurrentTarget,
                ..
            }
        ));
        assert!(matches!(rotation.rules[2].action, ActionConfig::Wait { .. }));
    }

    #[test]
    fn rejects_duplicate_rule_ids() {
        let err = RotationLoader::parse(
            r#"(rules: [
                (id: "jab", action: cast_spell(spell: "Jab")),
                (id: "jab", action: cast_spell(spell: "Jab")),
            ])"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate rule id 'jab'"));
    }
}
