//! Environment-driven CLI configuration.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use runtime::{BatchConfig, Scenario};
use sim_content::{ConfigLoader, ContentFactory, RotationLoader, SetupLoader, default_rotation};

/// Value of `SIM_ROTATION` that selects the built-in priority list.
const BUILT_IN_ROTATION: &str = "default";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CliConfig {
    /// Directory holding `config.toml`, `monk.toml` and `rotation.ron`.
    pub data_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub setup_path: Option<PathBuf>,
    pub rotation: Option<RotationSource>,
    pub seed: Option<u64>,
    pub batch: BatchConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RotationSource {
    BuiltIn,
    File(PathBuf),
}

impl CliConfig {
    /// Construct CLI configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SIM_DATA_DIR` - Content directory (default: bundled data)
    /// - `SIM_CONFIG` - Encounter config TOML
    /// - `SIM_SETUP` - Character setup TOML
    /// - `SIM_ROTATION` - Rotation RON, or `default` for the built-in list
    /// - `SIM_SEED` - Overrides the config seed
    /// - `SIM_ITERATIONS` - Batch size (default: 1)
    /// - `SIM_WORKERS` - Worker tasks (default: 4)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str| lookup(key).filter(|value| !value.is_empty()).map(PathBuf::from);
        let mut config = Self {
            data_dir: path("SIM_DATA_DIR"),
            config_path: path("SIM_CONFIG"),
            setup_path: path("SIM_SETUP"),
            rotation: lookup("SIM_ROTATION")
                .filter(|value| !value.is_empty())
                .map(|value| {
                    if value == BUILT_IN_ROTATION {
                        RotationSource::BuiltIn
                    } else {
                        RotationSource::File(PathBuf::from(value))
                    }
                }),
            seed: read_env(&lookup, "SIM_SEED"),
            batch: BatchConfig::default(),
        };
        if let Some(iterations) = read_env(&lookup, "SIM_ITERATIONS") {
            config.batch.iterations = iterations;
        }
        if let Some(workers) = read_env::<usize>(&lookup, "SIM_WORKERS") {
            config.batch.workers = workers.max(1);
        }
        config
    }

    fn factory(&self) -> ContentFactory {
        match &self.data_dir {
            Some(dir) => ContentFactory::new(dir),
            None => ContentFactory::bundled(),
        }
    }

    /// Explicit paths win over the content directory.
    pub fn load_scenario(&self) -> Result<Scenario> {
        let factory = self.factory();
        let mut config = match &self.config_path {
            Some(path) => ConfigLoader::load(path)?,
            None => factory.load_config()?,
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        let setup = match &self.setup_path {
            Some(path) => SetupLoader::load(path)?,
            None => factory.load_setup()?,
        };
        let rotation = match &self.rotation {
            Some(RotationSource::BuiltIn) => default_rotation(),
            Some(RotationSource::File(path)) => RotationLoader::load(path)?,
            None => factory.load_rotation()?,
        };
        Ok(Scenario::new(config, setup, rotation))
    }
}

fn read_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_bundled_content() {
        let config = CliConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CliConfig::default());

        let scenario = config.load_scenario().unwrap();
        assert_eq!(scenario.config.seed, 24301);
        assert!(scenario.setup.talents.chi_brew);
        assert!(!scenario.rotation.rules.is_empty());
    }

    #[test]
    fn numbers_and_rotation_choice_are_parsed() {
        let config = CliConfig::from_lookup(lookup(&[
            ("SIM_SEED", "7"),
            ("SIM_ITERATIONS", "25"),
            ("SIM_WORKERS", "0"),
            ("SIM_ROTATION", "default"),
        ]));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.batch.iterations, 25);
        assert_eq!(config.batch.workers, 1);
        assert_eq!(config.rotation, Some(RotationSource::BuiltIn));

        let scenario = config.load_scenario().unwrap();
        assert_eq!(scenario.config.seed, 7);
        assert_eq!(scenario.rotation, default_rotation());
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let config = CliConfig::from_lookup(lookup(&[("SIM_ITERATIONS", "lots")]));
        assert_eq!(config.batch, BatchConfig::default());
    }

    #[test]
    fn explicit_config_file_overrides_bundled_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("encounter.toml");
        fs::write(&path, "duration = 30\nnum_targets = 3\n").unwrap();

        let config = CliConfig::from_lookup(lookup(&[("SIM_CONFIG", path.to_str().unwrap())]));
        let scenario = config.load_scenario().unwrap();
        assert_eq!(scenario.config.num_targets, 3);
        assert_eq!(scenario.config.duration.as_secs_f64(), 30.0);
    }

    #[test]
    fn missing_rotation_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.ron");
        let config = CliConfig::from_lookup(lookup(&[("SIM_ROTATION", missing.to_str().unwrap())]));
        assert!(config.load_scenario().is_err());
    }
}
