//! Tests for config file resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate the config environment variable are marked with
//! #[serial] so they run sequentially.

use loopwise_common::config::{check_range, load_or_default, load_toml, ConfigFileResolver};
use loopwise_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

const TEST_ENV_VAR: &str = "LOOPWISE_TEST_CONFIG";

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    name: String,
    #[serde(default)]
    interval_ms: u64,
}

fn resolver() -> ConfigFileResolver {
    ConfigFileResolver::new()
        .with_env_var(TEST_ENV_VAR)
        .with_user_config(None)
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolver().resolve(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(TEST_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolver().resolve(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(TEST_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_user_config_resolves_to_none() {
    env::remove_var(TEST_ENV_VAR);

    let resolved = ConfigFileResolver::new()
        .with_env_var(TEST_ENV_VAR)
        .with_user_config(Some(PathBuf::from("/nonexistent/loopwise/config.toml")))
        .resolve(None);
    assert_eq!(resolved, None);
}

#[test]
#[serial]
fn test_existing_user_config_is_found() {
    env::remove_var(TEST_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "name = \"user\"\n").unwrap();

    let resolved = ConfigFileResolver::new()
        .with_env_var(TEST_ENV_VAR)
        .with_user_config(Some(path.clone()))
        .resolve(None);
    assert_eq!(resolved, Some(path));
}

#[test]
fn test_load_toml_parses_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name = \"practice\"\ninterval_ms = 250").unwrap();

    let config: SampleConfig = load_toml(file.path()).unwrap();
    assert_eq!(config.name, "practice");
    assert_eq!(config.interval_ms, 250);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let (config, error): (SampleConfig, _) =
        load_or_default(Some(Path::new("/nonexistent/config.toml")));
    assert_eq!(config, SampleConfig::default());
    assert!(matches!(error, Some(Error::Io(_))));
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name = [unterminated").unwrap();

    let (config, error): (SampleConfig, _) = load_or_default(Some(file.path()));
    assert_eq!(config, SampleConfig::default());
    assert!(matches!(error, Some(Error::Toml(_))));
}

#[test]
fn test_valid_file_loads_without_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name = \"drill\"").unwrap();

    let (config, error): (SampleConfig, _) = load_or_default(Some(file.path()));
    assert_eq!(config.name, "drill");
    assert!(error.is_none());
}

#[test]
fn test_no_path_uses_defaults() {
    let (config, error): (SampleConfig, _) = load_or_default(None);
    assert_eq!(config, SampleConfig::default());
    assert!(error.is_none());
}

#[test]
fn test_check_range() {
    assert_eq!(check_range("tick_interval_ms", 100u64, 10, 1000).unwrap(), 100);
    assert!(check_range("tick_interval_ms", 5u64, 10, 1000).is_err());
    assert!(check_range("max_volume_boost", 9.0f32, 1.0, 4.0).is_err());
}
