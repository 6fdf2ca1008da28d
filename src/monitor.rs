//! One monitoring pass.
//!
//! ```text
//! Init → Collect(CPU) → Collect(Memory) → Collect(Disk) → Collect(Load) → Summarize → Done
//! ```
//!
//! Collection of the four kinds is independent and runs concurrently unless
//! the pass is configured to be sequential. Evaluation, output and the
//! summary always happen in the order above, once every chain has finished.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::collectors::{Collection, CollectorChain, CollectorContext};
use crate::config::MonitorConfig;
use crate::evaluator::{Severity, evaluate_with};
use crate::sink::{AlertSink, Level};
use crate::MetricKind;

/// Every metric is within its threshold.
pub const EXIT_OK: i32 = 0;
/// At least one metric breached its threshold.
pub const EXIT_ALERT: i32 = 1;
/// Invalid configuration, nothing was collected.
pub const EXIT_CONFIG: i32 = 2;

pub const SUMMARY_NORMAL: &str = "All systems normal";
pub const SUMMARY_ALERT: &str = "Alerts detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Collect(MetricKind),
    Summarize,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Init => f.write_str("init"),
            RunState::Collect(kind) => write!(f, "collect({kind})"),
            RunState::Summarize => f.write_str("summarize"),
            RunState::Done => f.write_str("done"),
        }
    }
}

/// Outcome for one metric, or one filesystem for disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricOutcome {
    pub kind: MetricKind,
    pub label: String,
    pub severity: Severity,
    /// `None` if the metric could not be collected.
    pub value: Option<f64>,
    pub source_strategy: Option<String>,
    /// Set when the metric could not be collected.
    pub note: Option<String>,
}

impl MetricOutcome {
    pub fn is_available(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub per_metric: Vec<MetricOutcome>,
    pub exit_status: i32,
}

impl RunResult {
    pub fn new(per_metric: Vec<MetricOutcome>) -> Self {
        let exit_status = exit_status_of(per_metric.iter().map(|outcome| outcome.severity));
        Self {
            per_metric,
            exit_status,
        }
    }

    pub fn has_alerts(&self) -> bool {
        self.exit_status != EXIT_OK
    }

    pub fn warnings(&self) -> impl Iterator<Item = &MetricOutcome> {
        self.per_metric
            .iter()
            .filter(|outcome| outcome.severity == Severity::Warning)
    }
}

/// `0` if every severity is OK, `1` as soon as one is a warning.
pub fn exit_status_of(severities: impl IntoIterator<Item = Severity>) -> i32 {
    if severities
        .into_iter()
        .any(|severity| severity == Severity::Warning)
    {
        EXIT_ALERT
    } else {
        EXIT_OK
    }
}

pub struct MonitorRun {
    config: MonitorConfig,
    chains: Vec<CollectorChain>,
    sink: Arc<dyn AlertSink>,
}

impl MonitorRun {
    pub fn new(config: MonitorConfig, chains: Vec<CollectorChain>, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            config,
            chains,
            sink,
        }
    }

    /// Uses the default chain of every metric kind.
    pub fn with_context(
        config: MonitorConfig,
        ctx: &CollectorContext,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        Self::new(config, CollectorChain::all(ctx), sink)
    }

    /// Collects from the live host.
    pub fn system(config: MonitorConfig, sink: Arc<dyn AlertSink>) -> Self {
        let ctx = CollectorContext::system(config.strategy_timeout);
        Self::with_context(config, &ctx, sink)
    }

    fn transition(&self, state: RunState) {
        trace!("monitor state: {state}");
    }

    #[instrument(skip(self), fields(parallel = self.config.parallel))]
    pub async fn run(&self) -> RunResult {
        self.transition(RunState::Init);

        let collections = if self.config.parallel {
            join_all(self.chains.iter().map(|chain| async move {
                self.transition(RunState::Collect(chain.kind()));
                chain.collect().await
            }))
            .await
        } else {
            let mut collections = Vec::with_capacity(self.chains.len());
            for chain in &self.chains {
                self.transition(RunState::Collect(chain.kind()));
                collections.push(chain.collect().await);
            }
            collections
        };

        let mut per_metric = vec![];
        for (chain, collection) in self.chains.iter().zip(collections) {
            per_metric.extend(self.report(chain.kind(), collection));
        }

        self.transition(RunState::Summarize);
        let result = RunResult::new(per_metric);

        if result.has_alerts() {
            self.sink.write(Level::Warning, SUMMARY_ALERT);
        } else {
            self.sink.write(Level::Ok, SUMMARY_NORMAL);
        }

        debug!(
            "pass finished with {} warning(s), exit status {}",
            result.warnings().count(),
            result.exit_status
        );
        self.transition(RunState::Done);

        result
    }

    /// Evaluates the collected samples and writes one line per sample.
    fn report(&self, kind: MetricKind, collection: Collection) -> Vec<MetricOutcome> {
        match collection {
            Collection::Collected(samples) if samples.is_empty() => {
                self.sink
                    .write(Level::Ok, &format!("{kind}: no filesystems to check"));
                vec![]
            }
            Collection::Collected(samples) => samples
                .into_iter()
                .map(|sample| {
                    let event = evaluate_with(&sample, &self.config.thresholds);
                    trace!(
                        "{}: {} from {} -> {}",
                        event.label, event.value, sample.source_strategy, event.severity
                    );
                    self.sink.emit(&event);

                    MetricOutcome {
                        kind,
                        label: event.label,
                        severity: event.severity,
                        value: Some(event.value),
                        source_strategy: Some(sample.source_strategy),
                        note: None,
                    }
                })
                .collect(),
            Collection::Unavailable { kind, note } => {
                self.sink
                    .write(Level::Unavailable, &format!("{kind}: unavailable, {note}"));

                vec![MetricOutcome {
                    kind,
                    label: kind.name().to_string(),
                    severity: Severity::Ok,
                    value: None,
                    source_strategy: None,
                    note: Some(note),
                }]
            }
        }
    }
}
