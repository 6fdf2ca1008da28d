//! Durable log handling during full passes

use std::sync::Arc;

use health_monitor::{
    config::SinkConfig,
    monitor::{EXIT_ALERT, MonitorRun},
    sink::ConsoleLogSink,
};

use crate::helpers::*;

fn breaching_host() -> FakeHost {
    FakeHost::new()
        .cpu(95.0)
        .memory(30)
        .disks(&[("/", 20)])
        .load(0.2, 2)
}

#[tokio::test]
async fn test_unwritable_log_keeps_console_output() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("no-such-dir").join("system-health.log");
    let buffer = SharedBuffer::default();

    let sink = ConsoleLogSink::with_writer(
        &SinkConfig {
            log_path: log_path.clone(),
            color: false,
        },
        Box::new(buffer.clone()),
    );
    assert!(!sink.has_durable_log());

    let (_, ctx) = breaching_host().context();
    let result = MonitorRun::with_context(default_config(), &ctx, Arc::new(sink))
        .run()
        .await;

    assert_eq!(result.exit_status, EXIT_ALERT);
    assert!(!log_path.exists());

    let console = buffer.contents();
    assert!(console.contains("[WARNING] CPU usage is 95.0% (threshold: 80%)"));
    assert!(console.ends_with("[WARNING] Alerts detected\n"));
    assert_eq!(console.lines().count(), 5);
}

#[tokio::test]
async fn test_writable_log_receives_timestamped_lines() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("system-health.log");

    let sink = ConsoleLogSink::with_writer(
        &SinkConfig {
            log_path: log_path.clone(),
            color: false,
        },
        Box::new(std::io::sink()),
    );
    assert!(sink.has_durable_log());

    let (_, ctx) = breaching_host().context();
    MonitorRun::with_context(default_config(), &ctx, Arc::new(sink))
        .run()
        .await;

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines = log.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 5);
    assert!(lines.iter().all(|line| line.contains(" - ")));
    assert!(lines[0].ends_with("WARNING: CPU usage is 95.0% (threshold: 80%)"));
    assert!(lines[4].ends_with("WARNING: Alerts detected"));
}
