use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use sysinfo::System;
use tracing::debug;

use super::{CollectorContext, Strategy};
use crate::procfs::parse_cpu_times;
use crate::{MetricKind, MetricSample};

const PROC_STAT: &str = "/proc/stat";

/// Gap between the two `/proc/stat` snapshots.
const STAT_SAMPLE_GAP: Duration = Duration::from_millis(250);

// matches "95.2 id" (procps), "95.2%id" (old procps) and "96% idle" (busybox)
static IDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+(?:[.,][0-9]+)?)\s*%?\s*id(?:le)?\b").expect("idle pattern is valid")
});

/// Busy percentage from the summary line of a single `top` iteration.
pub fn parse_top(output: &str) -> Option<f64> {
    let line = output.lines().find(|line| {
        let line = line.trim_start();
        line.starts_with("%Cpu") || line.starts_with("Cpu(s)") || line.starts_with("CPU:")
    })?;

    let idle = IDLE.captures(line)?.get(1)?.as_str().replace(',', ".");
    let idle = idle.parse::<f64>().ok()?;

    Some(100.0 - idle)
}

/// First choice: one batch iteration of `top`.
pub struct TopSnapshot {
    ctx: CollectorContext,
}

impl TopSnapshot {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for TopSnapshot {
    fn name(&self) -> &'static str {
        "top"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let output = self.ctx.stdout_of("top", &["-bn1"]).await?;
        let busy = parse_top(&output)?;
        let sample = MetricSample::new(MetricKind::Cpu, busy, self.name());
        sample.is_valid().then(|| vec![sample])
    }
}

/// Second choice: delta of the aggregate counters in `/proc/stat`.
pub struct ProcStatDelta {
    ctx: CollectorContext,
    gap: Duration,
}

impl ProcStatDelta {
    pub fn new(ctx: CollectorContext) -> Self {
        Self {
            ctx,
            gap: STAT_SAMPLE_GAP,
        }
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    fn snapshot(&self) -> Option<crate::procfs::CpuTimes> {
        match self.ctx.fs.read_to_string(Path::new(PROC_STAT)) {
            Ok(content) => parse_cpu_times(&content),
            Err(e) => {
                debug!("{PROC_STAT}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Strategy for ProcStatDelta {
    fn name(&self) -> &'static str {
        "/proc/stat"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let earlier = self.snapshot()?;
        tokio::time::sleep(self.gap).await;
        let later = self.snapshot()?;

        let busy = later.busy_since(&earlier)?;
        let sample = MetricSample::new(MetricKind::Cpu, busy, self.name());
        sample.is_valid().then(|| vec![sample])
    }
}

/// Last resort: global CPU usage as computed by `sysinfo`.
pub struct NativeCpu;

#[async_trait]
impl Strategy for NativeCpu {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let usage = tokio::task::spawn_blocking(|| {
            let mut sys = System::new();
            sys.refresh_cpu_usage();
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_cpu_usage();
            (!sys.cpus().is_empty()).then(|| sys.global_cpu_usage())
        })
        .await
        .ok()??;

        let sample = MetricSample::new(MetricKind::Cpu, usage as f64, self.name());
        sample.is_valid().then(|| vec![sample])
    }
}
