use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::trace;

/// Ceiling for the 1-minute load average divided by the number of cores.
///
/// Unlike the percentage thresholds this is not configurable from the
/// command line.
pub const LOAD_PER_CORE_CEILING: f64 = 1.5;

pub const DEFAULT_CPU_THRESHOLD: u32 = 80;
pub const DEFAULT_MEMORY_THRESHOLD: u32 = 85;
pub const DEFAULT_DISK_THRESHOLD: u32 = 90;

/// Errors raised while building the monitor configuration. These are the
/// only fatal errors of a run and are raised before any collection starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Threshold argument is not an integer
    NotANumber { name: &'static str, raw: String },

    /// Threshold is outside of `(0, 100]`
    OutOfRange { name: &'static str, value: i64 },

    /// Strategy timeout must be positive
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotANumber { name, raw } => {
                write!(f, "{name} threshold must be an integer, got '{raw}'")
            }
            ConfigError::OutOfRange { name, value } => {
                write!(f, "{name} threshold must be between 1 and 100, got {value}")
            }
            ConfigError::InvalidTimeout => write!(f, "strategy timeout must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdConfig {
    pub cpu_pct: u32,
    pub memory_pct: u32,
    pub disk_pct: u32,
    pub load_per_core_ceiling: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_pct: DEFAULT_CPU_THRESHOLD,
            memory_pct: DEFAULT_MEMORY_THRESHOLD,
            disk_pct: DEFAULT_DISK_THRESHOLD,
            load_per_core_ceiling: LOAD_PER_CORE_CEILING,
        }
    }
}

impl ThresholdConfig {
    pub fn new(cpu_pct: i64, memory_pct: i64, disk_pct: i64) -> Result<Self, ConfigError> {
        Ok(Self {
            cpu_pct: check_range("cpu", cpu_pct)?,
            memory_pct: check_range("memory", memory_pct)?,
            disk_pct: check_range("disk", disk_pct)?,
            load_per_core_ceiling: LOAD_PER_CORE_CEILING,
        })
    }

    /// Builds the thresholds from the raw positional arguments. Missing
    /// arguments fall back to their defaults.
    pub fn from_args(
        cpu: Option<&str>,
        memory: Option<&str>,
        disk: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let cpu = parse_threshold("cpu", cpu, DEFAULT_CPU_THRESHOLD)?;
        let memory = parse_threshold("memory", memory, DEFAULT_MEMORY_THRESHOLD)?;
        let disk = parse_threshold("disk", disk, DEFAULT_DISK_THRESHOLD)?;

        Self::new(cpu, memory, disk).inspect(|config| trace!("thresholds: {config:?}"))
    }
}

fn parse_threshold(name: &'static str, raw: Option<&str>, default: u32) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default as i64);
    };

    raw.trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::NotANumber {
            name,
            raw: raw.to_string(),
        })
}

fn check_range(name: &'static str, value: i64) -> Result<u32, ConfigError> {
    if value <= 0 || value > 100 {
        return Err(ConfigError::OutOfRange { name, value });
    }
    Ok(value as u32)
}

/// Destinations of the alert sink.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Append-only log file; writing to it is best effort.
    pub log_path: PathBuf,
    pub color: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            log_path: crate::util::get_log_path(),
            color: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub thresholds: ThresholdConfig,
    /// Upper bound for a single collection strategy.
    pub strategy_timeout: Duration,
    /// Collect all metric kinds concurrently.
    pub parallel: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            strategy_timeout: crate::util::get_timeout(),
            parallel: true,
        }
    }
}

impl MonitorConfig {
    pub fn new(
        thresholds: ThresholdConfig,
        strategy_timeout: Duration,
        parallel: bool,
    ) -> Result<Self, ConfigError> {
        if strategy_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self {
            thresholds,
            strategy_timeout,
            parallel,
        })
    }
}
