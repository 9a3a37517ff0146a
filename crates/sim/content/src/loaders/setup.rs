//! Character setup loader.

use std::path::Path;

use tracing::debug;

use crate::loaders::{LoadResult, read_file};
use crate::monk::MonkSetup;

/// Loader for a monk's character sheet from TOML files.
pub struct SetupLoader;

impl SetupLoader {
    pub fn load(path: &Path) -> LoadResult<MonkSetup> {
        let content = read_file(path)?;
        let setup = Self::parse(&content)?;
        debug!(
            target: "sim_content::loaders",
            path = %path.display(),
            label = %setup.label,
            level = setup.level,
            "loaded character setup"
        );
        Ok(setup)
    }

    pub fn parse(content: &str) -> LoadResult<MonkSetup> {
        let setup: MonkSetup = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse setup TOML: {}", e))?;
        if !(0.0..=1.0).contains(&setup.crit_chance) {
            anyhow::bail!("crit_chance must be within [0, 1], got {}", setup.crit_chance);
        }
        if !setup.haste.is_finite() || setup.haste <= 0.0 {
            anyhow::bail!("haste must be a positive multiplier, got {}", setup.haste);
        }
        if setup.swing_speed.is_zero() {
            anyhow::bail!("swing_speed must be positive");
        }
        if !setup.movement_speed.is_finite() || setup.movement_speed <= 0.0 {
            anyhow::bail!("movement_speed must be positive, got {}", setup.movement_speed);
        }
        if !setup.base_mana.is_finite() || setup.base_mana < 0.0 {
            anyhow::bail!("base_mana must not be negative, got {}", setup.base_mana);
        }
        if setup.level == 0 || setup.level > MonkSetup::MAX_LEVEL {
            anyhow::bail!("level must be between 1 and {}, got {}", MonkSetup::MAX_LEVEL, setup.level);
        }
        Ok(setup)
    }
}
