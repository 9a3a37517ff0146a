//! Content loaders for reading simulation data from files.
//!
//! TOML carries the flat documents (simulation config, character setup);
//! RON carries rotations, whose nested value trees read better as RON.

pub mod config;
pub mod factory;
pub mod rotation;
pub mod setup;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use rotation::RotationLoader;
pub use setup::SetupLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
