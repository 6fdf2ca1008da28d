use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::{MetricKind, MetricSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
}

impl Severity {
    /// Strict comparison, a value equal to its threshold is still fine.
    pub fn classify(value: f64, threshold: f64) -> Severity {
        if value > threshold {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => f.write_str("OK"),
            Severity::Warning => f.write_str("WARNING"),
        }
    }
}

/// Classified sample, handed to the alert sink exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub kind: MetricKind,
    pub label: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

pub fn evaluate(sample: &MetricSample, threshold: f64) -> AlertEvent {
    let severity = Severity::classify(sample.value, threshold);

    AlertEvent {
        kind: sample.kind,
        label: sample.label.clone(),
        value: sample.value,
        threshold,
        severity,
        message: describe(sample, threshold),
        timestamp: Utc::now(),
    }
}

/// Picks the threshold for the sample's kind. Load is compared against the
/// per-core ceiling, every other kind against its percentage threshold.
pub fn threshold_for(kind: MetricKind, thresholds: &ThresholdConfig) -> f64 {
    match kind {
        MetricKind::Cpu => thresholds.cpu_pct as f64,
        MetricKind::Memory => thresholds.memory_pct as f64,
        MetricKind::Disk => thresholds.disk_pct as f64,
        MetricKind::Load => thresholds.load_per_core_ceiling,
    }
}

pub fn evaluate_with(sample: &MetricSample, thresholds: &ThresholdConfig) -> AlertEvent {
    evaluate(sample, threshold_for(sample.kind, thresholds))
}

fn describe(sample: &MetricSample, threshold: f64) -> String {
    match sample.kind {
        MetricKind::Cpu => format!(
            "CPU usage is {:.1}% (threshold: {threshold}%)",
            sample.value
        ),
        MetricKind::Memory => format!(
            "Memory usage is {:.0}% (threshold: {threshold}%)",
            sample.value
        ),
        MetricKind::Disk => format!(
            "Disk usage on {} is {:.0}% (threshold: {threshold}%)",
            sample.label, sample.value
        ),
        MetricKind::Load => format!(
            "Load per core is {:.2} (ceiling: {threshold})",
            sample.value
        ),
    }
}
