//! Exit codes of the binary for invalid configuration
//!
//! Only configuration failures are exercised here, they exit before any
//! metric of the host running the tests is collected.

use std::process::Command;

fn monitor(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_health-monitor"))
        .args(args)
        .env("HEALTH_MONITOR_LOG", "/nonexistent/health-monitor-test.log")
        .output()
        .unwrap()
}

#[test]
fn test_out_of_range_threshold_exits_with_config_status() {
    let output = monitor(&["80", "85", "150"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("disk threshold"));
}

#[test]
fn test_non_numeric_threshold_exits_with_config_status() {
    let output = monitor(&["high"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cpu threshold"));
}

#[test]
fn test_negative_threshold_exits_with_config_status() {
    let output = monitor(&["80", "-5"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("memory threshold"));
}

#[test]
fn test_zero_timeout_exits_with_config_status() {
    let output = monitor(&["--timeout", "0"]);
    assert_eq!(output.status.code(), Some(2));
}
