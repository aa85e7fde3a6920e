//! Configuration management for the Loopwise player
//!
//! A single TOML bootstrap file, read once at startup.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--mode`, `--volume`)
//! 2. Environment variable `LOOPWISE_CONFIG` (config file location)
//! 3. `<config dir>/loopwise/config.toml`
//! 4. Built-in defaults (code constants)
//!
//! Out-of-range values are clamped into range with a warning rather than
//! rejected, so a bad file never prevents startup.

use crate::media::FsSourceResolver;
use crate::playback::{CoordinatorConfig, EngineConfig};
use loopwise_common::config::check_range;
use loopwise_common::LoopMode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub player: PlayerSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[player]` section
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSettings {
    /// Position observer cadence
    ///
    /// Default: 100ms
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Highest volume level; levels above 1.0 use a track gain boost
    #[serde(default = "default_max_volume_boost")]
    pub max_volume_boost: f32,

    /// Loop mode at startup (`off`, `repeat-one`, `repeat-all`, `shuffle`,
    /// `auto-play-next`)
    #[serde(default)]
    pub default_loop_mode: Option<String>,

    /// Minimum spacing of resume-position snapshots
    ///
    /// Default: 5000ms
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Folder that relative file arguments are resolved against
    #[serde(default)]
    pub media_root: Option<PathBuf>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_volume_boost: default_max_volume_boost(),
            default_loop_mode: None,
            snapshot_interval_ms: default_snapshot_interval_ms(),
            initial_volume: default_initial_volume(),
            media_root: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_max_volume_boost() -> f32 {
    2.0
}

fn default_snapshot_interval_ms() -> u64 {
    5000
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Value clamped into `min..=max`, warning when it was out of range
fn clamped<T: PartialOrd + Copy + std::fmt::Display>(name: &str, value: T, min: T, max: T) -> T {
    match check_range(name, value, min, max) {
        Ok(value) => value,
        Err(e) => {
            warn!("{}; clamping", e);
            if value < min {
                min
            } else {
                max
            }
        }
    }
}

impl TomlConfig {
    /// Clamp every numeric setting into its supported range
    pub fn validated(mut self) -> Self {
        let player = &mut self.player;
        player.tick_interval_ms = clamped("player.tick_interval_ms", player.tick_interval_ms, 10, 1000);
        player.max_volume_boost = clamped("player.max_volume_boost", player.max_volume_boost, 1.0, 4.0);
        player.snapshot_interval_ms =
            clamped("player.snapshot_interval_ms", player.snapshot_interval_ms, 500, 600_000);
        player.initial_volume = clamped(
            "player.initial_volume",
            player.initial_volume,
            0.0,
            player.max_volume_boost,
        );
        if !player.initial_volume.is_finite() {
            warn!("player.initial_volume is not a number; using 1.0");
            player.initial_volume = 1.0;
        }
        self
    }

    /// Startup loop mode; unknown names fall back to `off`
    pub fn loop_mode(&self) -> LoopMode {
        match self.player.default_loop_mode.as_deref() {
            None => LoopMode::default(),
            Some(name) => name.parse().unwrap_or_else(|e| {
                warn!("player.default_loop_mode: {}; using off", e);
                LoopMode::default()
            }),
        }
    }

    /// File resolver honoring `player.media_root`
    pub fn source_resolver(&self) -> FsSourceResolver {
        match &self.player.media_root {
            Some(root) => FsSourceResolver::with_root(root.clone()),
            None => FsSourceResolver::new(),
        }
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            tick_interval: Duration::from_millis(self.player.tick_interval_ms),
            max_volume_boost: self.player.max_volume_boost,
            initial_volume: self.player.initial_volume,
        }
    }

    pub fn to_coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            snapshot_interval: Duration::from_millis(self.player.snapshot_interval_ms),
            ..CoordinatorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{SourceResolver, SourceToken};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.player.tick_interval_ms, 100);
        assert_eq!(config.player.snapshot_interval_ms, 5000);
        assert_eq!(config.player.max_volume_boost, 2.0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.loop_mode(), LoopMode::Off);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [player]
            tick_interval_ms = 50
            default_loop_mode = "repeat-all"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.player.tick_interval_ms, 50);
        assert_eq!(config.player.initial_volume, 1.0);
        assert_eq!(config.loop_mode(), LoopMode::RepeatAll);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_out_of_range_values_clamped() {
        let config: TomlConfig = toml::from_str(
            r#"
            [player]
            tick_interval_ms = 1
            max_volume_boost = 10.0
            snapshot_interval_ms = 100000000
            initial_volume = 3.5
            "#,
        )
        .unwrap();
        let config = config.validated();

        assert_eq!(config.player.tick_interval_ms, 10);
        assert_eq!(config.player.max_volume_boost, 4.0);
        assert_eq!(config.player.snapshot_interval_ms, 600_000);
        assert_eq!(config.player.initial_volume, 3.5);
    }

    #[test]
    fn test_unknown_loop_mode_falls_back_to_off() {
        let config: TomlConfig = toml::from_str("[player]\ndefault_loop_mode = \"sometimes\"").unwrap();
        assert_eq!(config.loop_mode(), LoopMode::Off);
    }

    #[test]
    fn test_media_root_resolves_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("etude.wav"), b"RIFF").unwrap();

        let config: TomlConfig =
            toml::from_str(&format!("[player]\nmedia_root = {:?}", dir.path())).unwrap();
        let source = config
            .source_resolver()
            .resolve(&SourceToken::from("etude.wav"))
            .unwrap();
        assert_eq!(source.locator, dir.path().join("etude.wav"));

        let err = TomlConfig::default()
            .source_resolver()
            .resolve(&SourceToken::from("etude.wav"));
        assert!(err.is_err());
    }

    #[test]
    fn test_engine_config_conversion() {
        let engine = TomlConfig::default().to_engine_config();
        assert_eq!(engine.tick_interval, Duration::from_millis(100));
        assert_eq!(engine.initial_volume, 1.0);

        let coordinator = TomlConfig::default().to_coordinator_config();
        assert_eq!(coordinator.snapshot_interval, Duration::from_millis(5000));
    }
}
