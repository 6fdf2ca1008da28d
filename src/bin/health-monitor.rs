use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use health_monitor::{
    config::{MonitorConfig, SinkConfig, ThresholdConfig},
    monitor::{EXIT_CONFIG, MonitorRun},
    sink::ConsoleLogSink,
    util::{get_log_path, get_timeout},
};
use tracing::{error, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Checks CPU, memory, disk and load against thresholds.
///
/// Exits with 0 if everything is within its threshold, 1 if at least one
/// metric breached it and 2 on invalid arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "health-monitor", version, allow_negative_numbers = true)]
struct Args {
    /// CPU usage threshold in percent
    cpu_threshold: Option<String>,

    /// Memory usage threshold in percent
    memory_threshold: Option<String>,

    /// Disk usage threshold in percent, applied to every filesystem
    disk_threshold: Option<String>,

    /// Log file to append alerts to [env: HEALTH_MONITOR_LOG]
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Timeout for a single collection strategy in seconds [env: HEALTH_MONITOR_TIMEOUT]
    #[arg(long)]
    timeout: Option<u64>,

    /// Collect one metric after the other
    #[arg(long)]
    sequential: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Print the result as JSON after the summary
    #[arg(long)]
    json: bool,

    /// Increase diagnostic output on stderr
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_target("health_monitor", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn configure(args: &Args) -> anyhow::Result<MonitorConfig> {
    let thresholds = ThresholdConfig::from_args(
        args.cpu_threshold.as_deref(),
        args.memory_threshold.as_deref(),
        args.disk_threshold.as_deref(),
    )?;

    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(get_timeout);

    Ok(MonitorConfig::new(thresholds, timeout, !args.sequential)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = match configure(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            eprintln!("configuration error: {e:#}");
            return ExitCode::from(EXIT_CONFIG as u8);
        }
    };

    let sink = ConsoleLogSink::new(&SinkConfig {
        log_path: args.log_file.clone().unwrap_or_else(get_log_path),
        color: !args.no_color,
    });
    trace!(
        "durable log {}: {}",
        sink.log_path().display(),
        sink.has_durable_log()
    );

    let result = MonitorRun::system(config, Arc::new(sink)).run().await;

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("failed to serialize result: {e}"),
        }
    }

    ExitCode::from(result.exit_status as u8)
}
