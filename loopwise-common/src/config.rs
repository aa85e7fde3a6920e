//! Configuration file discovery and loading
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`<config_dir>/loopwise/config.toml`)
//! 4. No file: built-in defaults
//!
//! A missing or unreadable config file never terminates the program; the
//! caller gets defaults along with the error to report.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Default environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LOOPWISE_CONFIG";

/// Application directory name under the platform config dir
const APP_DIR: &str = "loopwise";

/// Resolves which config file (if any) should be loaded
#[derive(Debug, Clone)]
pub struct ConfigFileResolver {
    env_var_name: String,
    user_config: Option<PathBuf>,
}

impl ConfigFileResolver {
    /// Resolver using `LOOPWISE_CONFIG` and the platform config directory
    pub fn new() -> Self {
        Self {
            env_var_name: CONFIG_ENV_VAR.to_string(),
            user_config: dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml")),
        }
    }

    /// Override the environment variable consulted at priority 2
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var_name = name.into();
        self
    }

    /// Override the per-user config path consulted at priority 3
    pub fn with_user_config(mut self, path: Option<PathBuf>) -> Self {
        self.user_config = path;
        self
    }

    /// Resolve the config file path
    ///
    /// Explicit paths (CLI, env) are returned even if they do not exist so the
    /// loader can warn about them; the per-user path is only returned if present.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config dir
        self.user_config.as_ref().filter(|p| p.exists()).cloned()
    }
}

impl Default for ConfigFileResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a TOML config file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str(&content)?;
    Ok(parsed)
}

/// Load a config, falling back to defaults on any failure
///
/// The load error is handed back instead of logged so binaries can read
/// their logging settings before installing a subscriber.
pub fn load_or_default<T: DeserializeOwned + Default>(
    path: Option<&Path>,
) -> (T, Option<Error>) {
    match path.map(load_toml::<T>) {
        Some(Ok(config)) => (config, None),
        Some(Err(e)) => (T::default(), Some(e)),
        None => (T::default(), None),
    }
}

/// Validate that a numeric setting lies within bounds
pub fn check_range<T: PartialOrd + std::fmt::Display>(
    name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<T> {
    if value < min || value > max {
        return Err(Error::Config(format!(
            "{} = {} is outside {}..={}",
            name, value, min, max
        )));
    }
    Ok(value)
}
