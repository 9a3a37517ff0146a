//! Content factory for loading a whole simulation input set.

use std::path::{Path, PathBuf};

use sim_core::{RotationConfig, SimConfig};

use crate::loaders::{ConfigLoader, LoadResult, RotationLoader, SetupLoader};
use crate::monk::MonkSetup;

/// Loads simulation inputs from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── monk.toml
/// └── rotation.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The data directory shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load simulation configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<SimConfig> {
        ConfigLoader::load(&self.data_dir.join("config.toml"))
    }

    /// Load the character setup from `monk.toml`.
    pub fn load_setup(&self) -> LoadResult<MonkSetup> {
        SetupLoader::load(&self.data_dir.join("monk.toml"))
    }

    /// Load the rotation from `rotation.ron`.
    pub fn load_rotation(&self) -> LoadResult<RotationConfig> {
        RotationLoader::load(&self.data_dir.join("rotation.ron"))
    }
}
