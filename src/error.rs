// src/error.rs

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(
        "Could not assign {symbols} symbols to {groups} groups after {attempts} attempts \
         (each symbol needs two distinct groups)"
    )]
    InfeasiblePartition {
        symbols: usize,
        groups: usize,
        attempts: usize,
    },

    #[error("Target {0:?} is not part of the symbol set")]
    UnknownTarget(char),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Event log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event log CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
