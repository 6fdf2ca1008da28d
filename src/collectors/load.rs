use std::path::Path;

use async_trait::async_trait;
use sysinfo::System;
use tracing::debug;

use super::{CollectorContext, Strategy};
use crate::procfs::parse_loadavg;
use crate::{MetricKind, MetricSample};

const PROC_LOADAVG: &str = "/proc/loadavg";

/// Number of online processors: `nproc`, then the runtime's view, then 1.
pub async fn core_count(ctx: &CollectorContext) -> usize {
    if let Some(output) = ctx.stdout_of("nproc", &[]).await
        && let Ok(cores) = output.trim().parse::<usize>()
        && cores > 0
    {
        return cores;
    }

    std::thread::available_parallelism()
        .map(|cores| cores.get())
        .unwrap_or(1)
}

fn per_core(load: f64, cores: usize, source: &'static str) -> Option<Vec<MetricSample>> {
    let sample = MetricSample::new(MetricKind::Load, load / cores.max(1) as f64, source);
    sample.is_valid().then(|| vec![sample])
}

/// 1-minute load average from `/proc/loadavg`, divided by the core count.
pub struct ProcLoadavg {
    ctx: CollectorContext,
}

impl ProcLoadavg {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for ProcLoadavg {
    fn name(&self) -> &'static str {
        "/proc/loadavg"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let content = match self.ctx.fs.read_to_string(Path::new(PROC_LOADAVG)) {
            Ok(content) => content,
            Err(e) => {
                debug!("{PROC_LOADAVG}: {e}");
                return None;
            }
        };
        let load = parse_loadavg(&content)?;
        let cores = core_count(&self.ctx).await;
        per_core(load, cores, self.name())
    }
}

pub struct NativeLoad {
    ctx: CollectorContext,
}

impl NativeLoad {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for NativeLoad {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let load = System::load_average().one;
        let cores = core_count(&self.ctx).await;
        per_core(load, cores, self.name())
    }
}
