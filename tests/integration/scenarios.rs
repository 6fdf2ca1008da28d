//! End-to-end monitoring passes against fake hosts

use std::sync::Arc;

use assert_matches::assert_matches;
use health_monitor::{
    MetricKind,
    config::{ConfigError, ThresholdConfig},
    evaluator::Severity,
    monitor::{EXIT_ALERT, EXIT_OK, MonitorRun, SUMMARY_ALERT, SUMMARY_NORMAL},
    sink::{Level, MemorySink},
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn severities(result: &health_monitor::monitor::RunResult) -> Vec<(MetricKind, String, Severity)> {
    result
        .per_metric
        .iter()
        .map(|outcome| (outcome.kind, outcome.label.clone(), outcome.severity))
        .collect()
}

#[tokio::test]
async fn test_mixed_breaches_fail_the_run() {
    let host = FakeHost::new()
        .cpu(81.0)
        .memory(70)
        .disks(&[("/", 50), ("/boot", 95)])
        .load(1.2, 4);
    let (_, ctx) = host.context();
    let sink = Arc::new(MemorySink::new());

    let result = MonitorRun::with_context(default_config(), &ctx, sink.clone())
        .run()
        .await;

    assert_eq!(
        severities(&result),
        vec![
            (MetricKind::Cpu, "CPU".to_string(), Severity::Warning),
            (MetricKind::Memory, "Memory".to_string(), Severity::Ok),
            (MetricKind::Disk, "/".to_string(), Severity::Ok),
            (MetricKind::Disk, "/boot".to_string(), Severity::Warning),
            (MetricKind::Load, "Load".to_string(), Severity::Ok),
        ]
    );
    assert_eq!(result.exit_status, EXIT_ALERT);

    let load = &result.per_metric[4];
    assert!((load.value.unwrap() - 0.3).abs() < 1e-9);

    let lines = sink.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[5], (Level::Warning, SUMMARY_ALERT.to_string()));
}

#[tokio::test]
async fn test_all_clear() {
    let host = FakeHost::new()
        .cpu(20.0)
        .memory(40)
        .disks(&[("/", 30)])
        .load(0.5, 2);
    let (_, ctx) = host.context();
    let sink = Arc::new(MemorySink::new());

    let result = MonitorRun::with_context(default_config(), &ctx, sink.clone())
        .run()
        .await;

    assert_eq!(result.exit_status, EXIT_OK);
    assert!(result.per_metric.iter().all(|o| o.severity == Severity::Ok));
    assert_eq!(sink.messages().last().unwrap(), SUMMARY_NORMAL);
}

#[tokio::test]
async fn test_missing_cpu_tools_do_not_abort_the_run() {
    // no top and no /proc/stat on this host
    let host = FakeHost::new().memory(90).disks(&[("/", 10)]).load(0.4, 4);
    let (runner, ctx) = host.context();
    let sink = Arc::new(MemorySink::new());

    let result = MonitorRun::with_context(default_config(), &ctx, sink.clone())
        .run()
        .await;

    let cpu = &result.per_metric[0];
    assert_eq!(cpu.kind, MetricKind::Cpu);
    assert_eq!(cpu.severity, Severity::Ok);
    assert!(!cpu.is_available());
    assert!(cpu.note.as_deref().unwrap().contains("top, /proc/stat"));

    // memory still evaluated and breached
    assert_eq!(result.per_metric[1].severity, Severity::Warning);
    assert_eq!(result.exit_status, EXIT_ALERT);

    assert!(runner.calls().contains(&"top -bn1".to_string()));
    assert_matches!(sink.lines()[0], (Level::Unavailable, _));
}

#[tokio::test]
async fn test_unavailable_metrics_alone_keep_exit_status_ok() {
    let host = FakeHost::new();
    let (_, ctx) = host.context();
    let sink = Arc::new(MemorySink::new());

    let result = MonitorRun::with_context(default_config(), &ctx, sink.clone())
        .run()
        .await;

    assert_eq!(result.exit_status, EXIT_OK);
    assert_eq!(result.per_metric.len(), 4);
    assert!(result.per_metric.iter().all(|o| !o.is_available()));
    assert_eq!(
        sink.lines()
            .iter()
            .filter(|(level, _)| *level == Level::Unavailable)
            .count(),
        4
    );
}

#[tokio::test]
async fn test_host_without_real_filesystems() {
    let host = FakeHost::new().cpu(10.0).memory(10).disks(&[]).load(0.1, 1);
    let (_, ctx) = host.context();
    let sink = Arc::new(MemorySink::new());

    let result = MonitorRun::with_context(default_config(), &ctx, sink.clone())
        .run()
        .await;

    assert!(result.per_metric.iter().all(|o| o.kind != MetricKind::Disk));
    assert_eq!(result.exit_status, EXIT_OK);
    assert!(sink.messages().iter().any(|m| m.contains("no filesystems")));
}

#[tokio::test]
async fn test_custom_thresholds_are_applied() {
    let host = FakeHost::new()
        .cpu(50.0)
        .memory(50)
        .disks(&[("/", 50)])
        .load(0.1, 1);
    let (_, ctx) = host.context();

    let thresholds = ThresholdConfig::from_args(Some("50"), Some("49"), Some("50")).unwrap();
    let config = health_monitor::config::MonitorConfig::new(
        thresholds,
        std::time::Duration::from_secs(2),
        false,
    )
    .unwrap();

    let result = MonitorRun::with_context(config, &ctx, Arc::new(MemorySink::new()))
        .run()
        .await;

    // equal to the threshold is fine, above is not
    assert_eq!(result.per_metric[0].severity, Severity::Ok);
    assert_eq!(result.per_metric[1].severity, Severity::Warning);
    assert_eq!(result.per_metric[2].severity, Severity::Ok);
}

#[test]
fn test_out_of_range_threshold_fails_before_collection() {
    let result = ThresholdConfig::from_args(None, None, Some("150"));
    assert_matches!(
        result,
        Err(ConfigError::OutOfRange {
            name: "disk",
            value: 150
        })
    );
}
