//! Config discovery for lazyjson.
//!
//! Walks parent directories to find `lazyjson.yaml` and checks for a global
//! config at `<config dir>/lazyjson/config.yaml`.

use std::path::{Path, PathBuf};

/// Project config filename to search for in parent directories.
pub const PROJECT_CONFIG_NAME: &str = "lazyjson.yaml";

/// Global config filename within the lazyjson config directory.
pub const GLOBAL_CONFIG_NAME: &str = "config.yaml";

/// Result of config discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    /// Nearest `lazyjson.yaml` walking up from the working directory.
    pub project_config: Option<PathBuf>,
    /// Full path to the global config file.
    pub global_config: Option<PathBuf>,
}

impl DiscoveryResult {
    /// The config that applies: the project file wins completely.
    pub fn winner(&self) -> Option<&Path> {
        self.project_config
            .as_deref()
            .or(self.global_config.as_deref())
    }
}

/// Discover config files starting from the current working directory.
pub fn discover() -> DiscoveryResult {
    let cwd = std::env::current_dir()
        .ok()
        .map(|dir| dir.canonicalize().unwrap_or(dir));
    let config_dir = dirs::config_dir();

    discover_from(cwd.as_deref(), config_dir.as_deref())
}

/// Discovery rooted at explicit directories.
pub fn discover_from(start: Option<&Path>, config_dir: Option<&Path>) -> DiscoveryResult {
    let global_config = config_dir
        .map(|dir| dir.join("lazyjson").join(GLOBAL_CONFIG_NAME))
        .filter(|path| path.is_file());

    let project_config = start.and_then(|start| {
        start
            .ancestors()
            .map(|ancestor| ancestor.join(PROJECT_CONFIG_NAME))
            .find(|path| path.is_file())
    });

    DiscoveryResult {
        project_config,
        global_config,
    }
}
