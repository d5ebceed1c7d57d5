use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

use crate::detect::filter::{FilterParams, GatePolicy};
use crate::detect::history::HistoryParams;
use crate::error::ConfigError;

pub const SAMPLE_RATE: u32 = 22_627;
pub const SHORT_WINDOW: usize = 1024;
pub const LONG_WINDOW: usize = 4096;
pub const TARGET_HZ: f32 = 3100.0;
pub const TOLERANCE_HZ: f32 = 25.0;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default = "WindowConfig::short", deserialize_with = "short_section")]
    pub short: WindowConfig,
    #[serde(default = "WindowConfig::long", deserialize_with = "long_section")]
    pub long: WindowConfig,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_target_hz")]
    pub target_hz: f32,
    #[serde(default = "default_tolerance_hz")]
    pub tolerance_hz: f32,
}

/// Tuning for one analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub window: usize,
    pub magnitude_threshold: f32,
    pub median_len: usize,
    pub smoothing: f32,
    pub history_bits: u32,
    pub min_matches: u32,
    pub gate: GatePolicy,
}

/// A `[short]` / `[long]` table as written in the file; absent keys fall
/// back to that window's defaults.
#[derive(Debug, Default, Deserialize)]
struct WindowSection {
    window: Option<usize>,
    magnitude_threshold: Option<f32>,
    median_len: Option<usize>,
    smoothing: Option<f32>,
    history_bits: Option<u32>,
    min_matches: Option<u32>,
    gate: Option<GatePolicy>,
}

impl WindowSection {
    fn over(self, base: WindowConfig) -> WindowConfig {
        WindowConfig {
            window: self.window.unwrap_or(base.window),
            magnitude_threshold: self.magnitude_threshold.unwrap_or(base.magnitude_threshold),
            median_len: self.median_len.unwrap_or(base.median_len),
            smoothing: self.smoothing.unwrap_or(base.smoothing),
            history_bits: self.history_bits.unwrap_or(base.history_bits),
            min_matches: self.min_matches.unwrap_or(base.min_matches),
            gate: self.gate.unwrap_or(base.gate),
        }
    }
}

fn short_section<'de, D: Deserializer<'de>>(d: D) -> Result<WindowConfig, D::Error> {
    WindowSection::deserialize(d).map(|s| s.over(WindowConfig::short()))
}

fn long_section<'de, D: Deserializer<'de>>(d: D) -> Result<WindowConfig, D::Error> {
    WindowSection::deserialize(d).map(|s| s.over(WindowConfig::long()))
}

impl WindowConfig {
    pub fn short() -> Self {
        Self {
            window: SHORT_WINDOW,
            magnitude_threshold: 2.0,
            median_len: 5,
            smoothing: 0.3,
            history_bits: 32,
            min_matches: 15,
            gate: GatePolicy::Hold,
        }
    }

    /// The long window votes over fewer slots so a detection does not stay
    /// latched long after the tone stops.
    pub fn long() -> Self {
        Self {
            window: LONG_WINDOW,
            magnitude_threshold: 4.0,
            median_len: 3,
            smoothing: 0.5,
            history_bits: 8,
            min_matches: 4,
            gate: GatePolicy::Hold,
        }
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            median_len: self.median_len,
            smoothing: self.smoothing,
            magnitude_threshold: self.magnitude_threshold,
            gate: self.gate,
        }
    }

    pub fn history_params(&self, detector: &DetectorConfig) -> HistoryParams {
        HistoryParams {
            width: self.history_bits,
            min_matches: self.min_matches,
            target_hz: detector.target_hz,
            tolerance_hz: detector.tolerance_hz,
        }
    }

    fn validate(&self, section: &'static str) -> Result<(), ConfigError> {
        if self.median_len == 0 || self.median_len % 2 == 0 {
            return Err(ConfigError::MedianLength { section, value: self.median_len });
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ConfigError::Smoothing { section, value: self.smoothing });
        }
        if self.magnitude_threshold.is_nan() || self.magnitude_threshold < 0.0 {
            return Err(ConfigError::Threshold { section, value: self.magnitude_threshold });
        }
        if self.min_matches < 1 || self.min_matches > self.history_bits || self.history_bits > 64 {
            return Err(ConfigError::History {
                section,
                history_bits: self.history_bits,
                min_matches: self.min_matches,
            });
        }
        if let GatePolicy::Decay(rate) = self.gate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::GateDecay { section, value: rate });
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            detector: DetectorConfig::default(),
            short: WindowConfig::short(),
            long: WindowConfig::long(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            period_ms: default_period_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            target_hz: default_target_hz(),
            tolerance_hz: default_tolerance_hz(),
        }
    }
}

impl AudioConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }
        if self.audio.period_ms == 0 {
            return Err(ConfigError::Period);
        }
        if self.audio.read_timeout_ms == 0 {
            return Err(ConfigError::ReadTimeout);
        }
        if self.short.window < 8 {
            return Err(ConfigError::ShortWindow(self.short.window));
        }
        if self.long.window < self.short.window || self.long.window % self.short.window != 0 {
            return Err(ConfigError::LongWindow {
                short: self.short.window,
                long: self.long.window,
            });
        }
        self.short.validate("short")?;
        self.long.validate("long")
    }
}

fn default_sample_rate() -> u32 { SAMPLE_RATE }
// One 1024-sample block at 22627 Hz.
fn default_period_ms() -> u64 { 45 }
fn default_read_timeout_ms() -> u64 { 100 }
fn default_target_hz() -> f32 { TARGET_HZ }
fn default_tolerance_hz() -> f32 { TOLERANCE_HZ }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
