//! Simulation configuration loader.

use std::path::Path;

use sim_core::SimConfig;
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Loader for encounter configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a [`SimConfig`] from a TOML file. Missing keys keep their
    /// defaults; durations are given in seconds.
    pub fn load(path: &Path) -> LoadResult<SimConfig> {
        let content = read_file(path)?;
        let config = Self::parse(&content)?;
        debug!(
            target: "sim_content::loaders",
            path = %path.display(),
            duration = %config.duration,
            seed = config.seed,
            targets = config.num_targets,
            "loaded simulation config"
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> LoadResult<SimConfig> {
        let config: SimConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;
        Ok(config)
    }
}
