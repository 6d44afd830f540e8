// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub speller: SpellerConfig,
    pub flicker: FlickerConfig,
    pub logging: LoggingConfig,
    /// Seed for the session RNG. Unset means a fresh entropy seed per run.
    pub seed: Option<u64>,
}

// SPELLER ---------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpellerConfig {
    pub symbols: String,
    pub targets: String,
    pub columns: usize,
    pub groups: usize,
    pub repetitions: usize,
    pub partition_attempts: usize,
    /// Display refresh rate (Hz) the flashes are aligned to.
    pub refresh_rate: f64,
    pub classes: ClassesConfig,
    pub durations: DurationsConfig,
}

impl Default for SpellerConfig {
    fn default() -> Self {
        Self {
            symbols: "ABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890".to_string(),
            targets: "TRAINING".to_string(),
            columns: 6,
            groups: 12,
            repetitions: 3,
            partition_attempts: 1000,
            refresh_rate: 60.0,
            classes: ClassesConfig::default(),
            durations: DurationsConfig::default(),
        }
    }
}

impl SpellerConfig {
    pub fn symbol_chars(&self) -> Vec<char> {
        self.symbols.chars().collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClassesConfig {
    pub symbol: String,
    pub focus: String,
    pub flash: String,
}

impl Default for ClassesConfig {
    fn default() -> Self {
        Self {
            symbol: "symbol".to_string(),
            focus: "focus".to_string(),
            flash: "flash".to_string(),
        }
    }
}

/// All values are milliseconds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DurationsConfig {
    pub baseline_eyes_open: f64,
    pub baseline_eyes_closed: f64,
    pub focus: f64,
    pub inter_block: f64,
    pub flash: DurationRange,
    pub inter_flash: DurationRange,
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            baseline_eyes_open: 30000.0,
            baseline_eyes_closed: 30000.0,
            focus: 500.0,
            inter_block: 1000.0,
            flash: DurationRange::new(80.0, 60.0, 160.0),
            inter_flash: DurationRange::new(120.0, 80.0, 300.0),
        }
    }
}

/// Bounds for a duration drawn from an exponential distribution.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DurationRange {
    pub expectation: f64,
    pub min: f64,
    pub max: f64,
}

impl DurationRange {
    pub fn new(expectation: f64, min: f64, max: f64) -> Self {
        Self {
            expectation,
            min,
            max,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !(self.expectation > 0.0) {
            return Err(ConfigError::invalid(field, "expectation must be positive"));
        }
        if self.min < 0.0 {
            return Err(ConfigError::invalid(field, "min must not be negative"));
        }
        if self.min > self.max {
            return Err(ConfigError::invalid(
                field,
                format!("min ({}) is greater than max ({})", self.min, self.max),
            ));
        }
        Ok(())
    }
}

// FLICKER ---------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParadigmKind {
    Ssvep,
    NoiseTagging,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FlickerConfig {
    pub paradigm: ParadigmKind,
    pub rows: usize,
    pub columns: usize,
    pub class: String,
    pub color_on: String,
    pub color_off: String,
    pub refresh_rate: f64,
    pub highlight_duration: f64,
    /// Element id -> stimulation frequency in Hz. Zero means no flicker.
    pub targets: BTreeMap<String, f64>,
    /// Noise tagging code table: one row of 0/1 states per grid element.
    pub codes: Vec<Vec<u8>>,
    pub calibration: CalibrationConfig,
}

impl Default for FlickerConfig {
    fn default() -> Self {
        let targets = [
            ("cell_0_0", 6.66),
            ("cell_0_2", 12.0),
            ("cell_1_1", 0.0),
            ("cell_2_0", 20.0),
            ("cell_2_2", 30.0),
        ]
        .into_iter()
        .map(|(id, f)| (id.to_string(), f))
        .collect();

        Self {
            paradigm: ParadigmKind::Ssvep,
            rows: 3,
            columns: 3,
            class: "cell".to_string(),
            color_on: "black".to_string(),
            color_off: "white".to_string(),
            refresh_rate: 60.0,
            highlight_duration: 1500.0,
            targets,
            codes: Vec::new(),
            calibration: CalibrationConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub baseline_duration: f64,
    pub focus_duration: f64,
    pub rounds: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            baseline_duration: 0.0,
            focus_duration: 7000.0,
            rounds: 1,
        }
    }
}

// LOGGING ---------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub event_log: Option<String>,
    pub render: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            event_log: None,
            render: false,
        }
    }
}

// VALIDATION ------------------------------------------------------------------

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.speller.validate()?;
        self.flicker.validate()
    }
}

impl SpellerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let symbols = self.symbol_chars();
        if symbols.is_empty() {
            return Err(ConfigError::invalid("speller.symbols", "must not be empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for symbol in &symbols {
            if !seen.insert(symbol) {
                return Err(ConfigError::invalid(
                    "speller.symbols",
                    format!("duplicate symbol {:?}", symbol),
                ));
            }
        }
        if self.groups < 2 {
            return Err(ConfigError::invalid(
                "speller.groups",
                "each symbol belongs to two groups, so at least 2 are required",
            ));
        }
        if self.columns == 0 {
            return Err(ConfigError::invalid("speller.columns", "must be at least 1"));
        }
        if self.repetitions == 0 {
            return Err(ConfigError::invalid(
                "speller.repetitions",
                "must be at least 1",
            ));
        }
        if !(self.refresh_rate > 0.0) {
            return Err(ConfigError::invalid(
                "speller.refresh_rate",
                "must be positive",
            ));
        }
        if self.partition_attempts == 0 {
            return Err(ConfigError::invalid(
                "speller.partition_attempts",
                "must be at least 1",
            ));
        }
        self.durations.flash.validate("speller.durations.flash")?;
        self.durations.inter_flash.validate("speller.durations.inter_flash")?;

        let fixed = [
            ("speller.durations.baseline_eyes_open", self.durations.baseline_eyes_open),
            ("speller.durations.baseline_eyes_closed", self.durations.baseline_eyes_closed),
            ("speller.durations.focus", self.durations.focus),
            ("speller.durations.inter_block", self.durations.inter_block),
        ];
        for (field, value) in fixed {
            if value < 0.0 {
                return Err(ConfigError::invalid(field, "must not be negative"));
            }
        }
        Ok(())
    }
}

impl FlickerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.refresh_rate > 0.0) {
            return Err(ConfigError::invalid(
                "flicker.refresh_rate",
                "must be positive",
            ));
        }
        if self.targets.values().any(|f| *f < 0.0) {
            return Err(ConfigError::invalid(
                "flicker.targets",
                "frequencies must not be negative",
            ));
        }
        if self.paradigm == ParadigmKind::NoiseTagging {
            let first = self.codes.first().map(Vec::len).unwrap_or(0);
            if first == 0 {
                return Err(ConfigError::invalid(
                    "flicker.codes",
                    "noise tagging needs a non-empty code table",
                ));
            }
            if self.codes.iter().any(|row| row.len() != first) {
                return Err(ConfigError::invalid(
                    "flicker.codes",
                    "all code rows must have the same length",
                ));
            }
            if self.codes.len() < self.rows * self.columns {
                return Err(ConfigError::invalid(
                    "flicker.codes",
                    format!(
                        "{} code rows for {} grid cells",
                        self.codes.len(),
                        self.rows * self.columns
                    ),
                ));
            }
        }
        Ok(())
    }
}

// LOAD / SAVE -----------------------------------------------------------------

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_yaml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(config)?;

    fs::write(path, yaml).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
