//! Fallback chains of collection strategies.
//!
//! No single data source is guaranteed to exist on a host, so every metric
//! kind owns an ordered list of [`Strategy`] implementations. The chain
//! tries them in order and the first one that yields a valid value wins.
//!
//! ```text
//! CPU     top -bn1      → /proc/stat delta → sysinfo
//! Memory  free          → sysinfo
//! Disk    df -PT        → df -P            → sysinfo
//! Load    /proc/loadavg → sysinfo          (÷ core count)
//! ```
//!
//! A strategy never fails loudly: a missing tool, a timeout or unparseable
//! output all end up as "no value" and the next strategy runs.

pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use crate::command::{CommandRunner, SystemRunner};
use crate::procfs::{FileSystem, RealFs};
use crate::{MetricKind, MetricSample};

/// One way of obtaining a metric from the operating system.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Name recorded as the sample's source.
    fn name(&self) -> &'static str;

    /// Returns `None` if this strategy cannot produce a value on this host.
    ///
    /// Single-valued kinds return exactly one sample. Disk returns one
    /// sample per filesystem, and an empty list is a valid answer.
    async fn try_collect(&self) -> Option<Vec<MetricSample>>;
}

/// Everything strategies need to reach the host.
#[derive(Clone)]
pub struct CollectorContext {
    pub runner: Arc<dyn CommandRunner>,
    pub fs: Arc<dyn FileSystem>,
    pub timeout: Duration,
    /// Append the `sysinfo` based strategies to the end of every chain.
    pub native_fallback: bool,
}

impl CollectorContext {
    pub fn new(runner: Arc<dyn CommandRunner>, fs: Arc<dyn FileSystem>, timeout: Duration) -> Self {
        Self {
            runner,
            fs,
            timeout,
            native_fallback: false,
        }
    }

    /// Real processes, the real `/proc` and the native fallbacks.
    pub fn system(timeout: Duration) -> Self {
        Self {
            native_fallback: true,
            ..Self::new(Arc::new(SystemRunner), Arc::new(RealFs), timeout)
        }
    }

    pub fn with_native_fallback(mut self, enabled: bool) -> Self {
        self.native_fallback = enabled;
        self
    }

    /// Runs a tool and returns its stdout if it exited successfully.
    pub(crate) async fn stdout_of(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.runner.run(program, args, self.timeout).await {
            Ok(output) if output.is_success() => Some(output.stdout),
            Ok(output) => {
                debug!("{program} exited with {}", output.exit_code);
                None
            }
            Err(e) => {
                debug!("{program}: {e}");
                None
            }
        }
    }

    /// Runs a tool and returns its stdout whatever the exit status.
    ///
    /// For tools that report a partial failure through the exit status but
    /// still print every row they could read, such as `df` with one
    /// unreadable mount. The caller's parser decides if the output is usable.
    pub(crate) async fn stdout_lenient(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.runner.run(program, args, self.timeout).await {
            Ok(output) => {
                if !output.is_success() {
                    debug!(
                        "{program} exited with {}, using its output: {}",
                        output.exit_code,
                        output.stderr.trim()
                    );
                }
                Some(output.stdout)
            }
            Err(e) => {
                debug!("{program}: {e}");
                None
            }
        }
    }
}

/// Outcome of running a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    /// Samples of the first successful strategy.
    Collected(Vec<MetricSample>),

    /// No strategy produced a value.
    Unavailable { kind: MetricKind, note: String },
}

pub struct CollectorChain {
    kind: MetricKind,
    strategies: Vec<Box<dyn Strategy>>,
    timeout: Duration,
}

impl CollectorChain {
    pub fn new(kind: MetricKind, strategies: Vec<Box<dyn Strategy>>, timeout: Duration) -> Self {
        Self {
            kind,
            strategies,
            timeout,
        }
    }

    pub fn cpu(ctx: &CollectorContext) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(cpu::TopSnapshot::new(ctx.clone())),
            Box::new(cpu::ProcStatDelta::new(ctx.clone())),
        ];
        if ctx.native_fallback {
            strategies.push(Box::new(cpu::NativeCpu));
        }
        Self::new(MetricKind::Cpu, strategies, ctx.timeout)
    }

    pub fn memory(ctx: &CollectorContext) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> =
            vec![Box::new(memory::FreeSummary::new(ctx.clone()))];
        if ctx.native_fallback {
            strategies.push(Box::new(memory::NativeMemory));
        }
        Self::new(MetricKind::Memory, strategies, ctx.timeout)
    }

    pub fn disk(ctx: &CollectorContext) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(disk::DfTyped::new(ctx.clone())),
            Box::new(disk::DfPortable::new(ctx.clone())),
        ];
        if ctx.native_fallback {
            strategies.push(Box::new(disk::NativeDisks));
        }
        Self::new(MetricKind::Disk, strategies, ctx.timeout)
    }

    pub fn load(ctx: &CollectorContext) -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> =
            vec![Box::new(load::ProcLoadavg::new(ctx.clone()))];
        if ctx.native_fallback {
            strategies.push(Box::new(load::NativeLoad::new(ctx.clone())));
        }
        Self::new(MetricKind::Load, strategies, ctx.timeout)
    }

    /// The four chains of a monitoring pass, in collection order.
    pub fn all(ctx: &CollectorContext) -> Vec<CollectorChain> {
        vec![
            Self::cpu(ctx),
            Self::memory(ctx),
            Self::disk(ctx),
            Self::load(ctx),
        ]
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn collect(&self) -> Collection {
        for strategy in &self.strategies {
            let name = strategy.name();

            let samples = match tokio::time::timeout(self.timeout, strategy.try_collect()).await {
                Ok(Some(samples)) => samples,
                Ok(None) => {
                    debug!("strategy {name} produced no value");
                    continue;
                }
                Err(_elapsed) => {
                    debug!("strategy {name} timed out after {:?}", self.timeout);
                    continue;
                }
            };

            if let Some(samples) = self.accept(samples) {
                trace!("strategy {name} produced {} sample(s)", samples.len());
                return Collection::Collected(samples);
            }

            debug!("strategy {name} produced out-of-range values");
        }

        Collection::Unavailable {
            kind: self.kind,
            note: format!(
                "no collection strategy produced a value (tried: {})",
                self.strategy_names().join(", ")
            ),
        }
    }

    /// Drops samples that are out of range or of the wrong kind. A
    /// single-valued chain needs exactly one usable sample.
    fn accept(&self, samples: Vec<MetricSample>) -> Option<Vec<MetricSample>> {
        let valid = samples
            .into_iter()
            .filter(|sample| sample.kind == self.kind && sample.is_valid())
            .collect::<Vec<_>>();

        match self.kind {
            MetricKind::Disk => Some(valid),
            _ => valid.into_iter().next().map(|sample| vec![sample]),
        }
    }
}
