//! Driver configuration
use anyhow::{bail, Context, Result};
use quaver_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "quaver.toml";

/// Prefix for environment overrides (`QUAVER_PLAYBACK__VOLUME=40`)
const ENV_PREFIX: &str = "QUAVER";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuaverConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Virtual milliseconds per tick
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// How far the simulated decoder misjudges durations, in percent
    ///
    /// `-2.0` makes a 200 s track report 196 s.
    #[serde(default = "default_drift_percent")]
    pub drift_percent: f64,

    /// Ticks to run before giving up
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Number of synthetic tracks in the playlist
    #[serde(default = "default_tracks")]
    pub tracks: usize,

    /// Metadata duration of the first synthetic track
    #[serde(default = "default_track_duration_ms")]
    pub track_duration_ms: u64,
}

impl QuaverConfig {
    /// Load configuration from file and environment
    ///
    /// With no explicit path, `quaver.toml` is used if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`load`](Self::load), reading environment overrides from
    /// `env` instead of the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (QUAVER_SECTION__KEY)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = settings
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.playback
            .validate()
            .context("invalid [playback] section")?;

        if self.simulation.tick_ms == 0 {
            bail!("simulation.tick_ms must be greater than zero");
        }

        if self.simulation.drift_percent <= -100.0 {
            bail!(
                "simulation.drift_percent must be above -100 (got {})",
                self.simulation.drift_percent
            );
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

// Default values
fn default_level() -> String {
    "quaver=info,quaver_playback=info".to_string()
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_drift_percent() -> f64 {
    -2.0
}

fn default_max_ticks() -> u64 {
    2000
}

fn default_tracks() -> usize {
    4
}

fn default_track_duration_ms() -> u64 {
    200_000
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            drift_percent: default_drift_percent(),
            max_ticks: default_max_ticks(),
            tracks: default_tracks(),
            track_duration_ms: default_track_duration_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quaver_playback::PlaybackMode;
    use std::io::Write;

    fn empty_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_sources() {
        let config = QuaverConfig::default();
        assert_eq!(config.playback.volume, 80);
        assert_eq!(config.playback.mode, PlaybackMode::Loop);
        assert_eq!(config.simulation.tick_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            r#"
            [playback]
            mode = "random"
            seed = 7

            [simulation]
            drift_percent = 3.5
            "#,
        );

        let config = QuaverConfig::load_with_env(Some(file.path()), empty_env()).unwrap();

        assert_eq!(config.playback.mode, PlaybackMode::Random);
        assert_eq!(config.playback.seed, Some(7));
        assert_eq!(config.playback.volume, 80);
        assert_eq!(config.simulation.drift_percent, 3.5);
        assert_eq!(config.simulation.max_ticks, 2000);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config("[playback]\nvolume = 30\n");
        let env = config::Map::from([
            ("QUAVER_PLAYBACK__VOLUME".to_string(), "55".to_string()),
            ("QUAVER_SIMULATION__TICK_MS".to_string(), "250".to_string()),
        ]);

        let config = QuaverConfig::load_with_env(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.playback.volume, 55);
        assert_eq!(config.simulation.tick_ms, 250);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let file = write_config("[playback]\nvolume = 101\n");
        assert!(QuaverConfig::load_with_env(Some(file.path()), empty_env()).is_err());

        let file = write_config("[simulation]\ntick_ms = 0\n");
        assert!(QuaverConfig::load_with_env(Some(file.path()), empty_env()).is_err());

        let file = write_config("[simulation]\ndrift_percent = -100.0\n");
        assert!(QuaverConfig::load_with_env(Some(file.path()), empty_env()).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(QuaverConfig::load_with_env(Some(&path), empty_env()).is_err());
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let rendered = QuaverConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[playback]"));
        assert!(rendered.contains("mode = \"loop\""));

        let parsed: QuaverConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.simulation.tracks, 4);
    }
}
