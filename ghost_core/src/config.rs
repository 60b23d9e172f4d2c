//! Configuration file support for the ghosting engine.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/ghosting/config.toml`.
//! The `[timing]` section is the tunable policy behind sub-event timing:
//! split-step durations, the auto-scale table and the narration estimate.

use crate::{Error, Result, SplitStepSpeed};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Cached default timing policy
static DEFAULT_TIMING: Lazy<TimingConfig> = Lazy::new(TimingConfig::default);

/// Reference to the built-in timing policy
pub fn default_timing() -> &'static TimingConfig {
    &DEFAULT_TIMING
}

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.data_dir.join("checkpoints")
    }
}

/// Seconds between the split-step cue and the beep, per speed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SplitStepDurations {
    #[serde(default = "default_split_slow")]
    pub slow: f64,
    #[serde(default = "default_split_medium")]
    pub medium: f64,
    #[serde(default = "default_split_fast")]
    pub fast: f64,
}

impl Default for SplitStepDurations {
    fn default() -> Self {
        Self {
            slow: default_split_slow(),
            medium: default_split_medium(),
            fast: default_split_fast(),
        }
    }
}

/// One row of the auto-scale table: slots shorter than `max_slot_seconds` use `speed`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AutoScaleRule {
    pub max_slot_seconds: f64,
    pub speed: SplitStepSpeed,
}

/// Word-count narration estimate
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NarrationConfig {
    #[serde(default = "default_words_per_minute")]
    pub words_per_minute: f64,
    #[serde(default = "default_min_narration_seconds")]
    pub min_seconds: f64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            words_per_minute: default_words_per_minute(),
            min_seconds: default_min_narration_seconds(),
        }
    }
}

/// Timing policy consumed by the generator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default)]
    pub split_step: SplitStepDurations,

    /// Checked in order; slots longer than every row resolve to `auto_scale_fallback`
    #[serde(default = "default_auto_scale")]
    pub auto_scale: Vec<AutoScaleRule>,

    #[serde(default = "default_auto_scale_fallback")]
    pub auto_scale_fallback: SplitStepSpeed,

    #[serde(default)]
    pub narration: NarrationConfig,

    /// A countdown is only exposed when more than this many seconds follow the narration
    #[serde(default = "default_countdown_min_gap")]
    pub countdown_min_gap: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            split_step: SplitStepDurations::default(),
            auto_scale: default_auto_scale(),
            auto_scale_fallback: default_auto_scale_fallback(),
            narration: NarrationConfig::default(),
            countdown_min_gap: default_countdown_min_gap(),
        }
    }
}

/// Paged generation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| std::env::temp_dir())
    });
    base.join("ghosting")
}

fn default_split_slow() -> f64 {
    1.0
}

fn default_split_medium() -> f64 {
    0.75
}

fn default_split_fast() -> f64 {
    0.5
}

fn default_auto_scale() -> Vec<AutoScaleRule> {
    vec![
        AutoScaleRule {
            max_slot_seconds: 3.0,
            speed: SplitStepSpeed::Fast,
        },
        AutoScaleRule {
            max_slot_seconds: 5.0,
            speed: SplitStepSpeed::Medium,
        },
    ]
}

fn default_auto_scale_fallback() -> SplitStepSpeed {
    SplitStepSpeed::Slow
}

fn default_words_per_minute() -> f64 {
    160.0
}

fn default_min_narration_seconds() -> f64 {
    1.0
}

fn default_countdown_min_gap() -> f64 {
    1.0
}

fn default_batch_size() -> usize {
    64
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.timing.check()?;
        config.generation.check()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| std::env::temp_dir())
        });
        base.join("ghosting").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

impl GenerationConfig {
    pub fn check(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("generation.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

impl TimingConfig {
    /// Reject policies the generator cannot use
    pub fn check(&self) -> Result<()> {
        let durations = [
            self.split_step.slow,
            self.split_step.medium,
            self.split_step.fast,
        ];
        if durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::Config(
                "split step durations must be non-negative".into(),
            ));
        }
        if self.narration.words_per_minute <= 0.0 {
            return Err(Error::Config("narration.words_per_minute must be positive".into()));
        }
        let unresolved = self
            .auto_scale
            .iter()
            .map(|r| r.speed)
            .chain(std::iter::once(self.auto_scale_fallback))
            .any(|s| s == SplitStepSpeed::AutoScale);
        if unresolved {
            return Err(Error::Config("auto-scale rows must name a concrete speed".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timing.split_step.fast, 0.5);
        assert_eq!(config.timing.auto_scale.len(), 2);
        assert_eq!(config.generation.batch_size, 64);
        assert!(config.timing.check().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.timing, parsed.timing);
        assert_eq!(config.generation.batch_size, parsed.generation.batch_size);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[timing.narration]
words_per_minute = 120.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timing.narration.words_per_minute, 120.0);
        assert_eq!(config.timing.narration.min_seconds, 1.0); // default
        assert_eq!(config.timing.split_step.medium, 0.75); // default
    }

    #[test]
    fn test_custom_auto_scale_table() {
        let toml_str = r#"
[timing]
auto_scale_fallback = "medium"

[[timing.auto_scale]]
max_slot_seconds = 2.0
speed = "fast"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timing.auto_scale.len(), 1);
        assert_eq!(config.timing.auto_scale_fallback, SplitStepSpeed::Medium);
    }

    #[test]
    fn test_auto_scale_row_must_be_concrete() {
        let mut timing = TimingConfig::default();
        timing.auto_scale_fallback = SplitStepSpeed::AutoScale;
        assert!(matches!(timing.check(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.generation.batch_size = 8;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.generation.batch_size, 8);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[generation]\nbatch_size = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
