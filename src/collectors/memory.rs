use async_trait::async_trait;
use sysinfo::System;

use super::{CollectorContext, Strategy};
use crate::{MetricKind, MetricSample};

/// Used memory as a whole-number percentage of the total.
pub fn used_percent(used: u64, total: u64) -> Option<f64> {
    if total == 0 || used > total {
        return None;
    }
    Some((used as f64 * 100.0 / total as f64).round())
}

/// Reads `total` and `used` from the `Mem:` row of `free`.
pub fn parse_free(output: &str) -> Option<f64> {
    let row = output
        .lines()
        .find(|line| line.trim_start().starts_with("Mem:"))?;

    let mut columns = row.split_whitespace().skip(1);
    let total = columns.next()?.parse::<u64>().ok()?;
    let used = columns.next()?.parse::<u64>().ok()?;

    used_percent(used, total)
}

pub struct FreeSummary {
    ctx: CollectorContext,
}

impl FreeSummary {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for FreeSummary {
    fn name(&self) -> &'static str {
        "free"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let output = self.ctx.stdout_of("free", &[]).await?;
        let percent = parse_free(&output)?;
        Some(vec![MetricSample::new(MetricKind::Memory, percent, self.name())])
    }
}

pub struct NativeMemory;

#[async_trait]
impl Strategy for NativeMemory {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let mut sys = System::new();
        sys.refresh_memory();
        let percent = used_percent(sys.used_memory(), sys.total_memory())?;
        Some(vec![MetricSample::new(MetricKind::Memory, percent, self.name())])
    }
}
