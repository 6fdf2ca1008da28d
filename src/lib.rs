pub mod backend;
pub mod collectors;
pub mod command;
pub mod config;
pub mod evaluator;
pub mod monitor;
pub mod procfs;
pub mod sink;
pub mod util;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Load,
}

impl MetricKind {
    /// Collection order of a monitoring pass.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::Load,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Memory => "Memory",
            MetricKind::Disk => "Disk",
            MetricKind::Load => "Load",
        }
    }

    /// Whether values of this kind are utilization percentages in `[0, 100]`.
    pub fn is_percentage(&self) -> bool {
        !matches!(self, MetricKind::Load)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single reading of one metric.
///
/// `value` is a utilization percentage for CPU, memory and disk, and the
/// 1-minute load average divided by the core count for load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub kind: MetricKind,
    /// Metric name, or the mount point for disk samples.
    pub label: String,
    pub value: f64,
    pub collected_at: DateTime<Utc>,
    /// Name of the strategy that produced the value.
    pub source_strategy: String,
}

impl MetricSample {
    pub fn new(kind: MetricKind, value: f64, source_strategy: impl Into<String>) -> Self {
        Self::labelled(kind, kind.name(), value, source_strategy)
    }

    pub fn labelled(
        kind: MetricKind,
        label: impl Into<String>,
        value: f64,
        source_strategy: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            value,
            collected_at: Utc::now(),
            source_strategy: source_strategy.into(),
        }
    }

    /// Checks the value range for the sample's kind. Strategies drop samples
    /// that fail this check instead of reporting them.
    pub fn is_valid(&self) -> bool {
        if !self.value.is_finite() || self.value < 0.0 {
            return false;
        }
        !self.kind.is_percentage() || self.value <= 100.0
    }
}
