use std::path::PathBuf;
use std::time::Duration;

const LOG_FILE: &str = "HEALTH_MONITOR_LOG";

const DEFAULT_LOG_FILE: &str = "/var/log/system-health.log";

pub fn get_default_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

pub fn get_log_path() -> PathBuf {
    let path_from_env = std::env::var(LOG_FILE);
    path_from_env
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map_or_else(get_default_log_path, PathBuf::from)
}

const STRATEGY_TIMEOUT: &str = "HEALTH_MONITOR_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: u64 = 5;

pub fn get_default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

pub fn get_timeout() -> Duration {
    let timeout_from_env = std::env::var(STRATEGY_TIMEOUT);
    timeout_from_env.map_or_else(
        |_| get_default_timeout(),
        |res| {
            res.parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map_or_else(get_default_timeout, Duration::from_secs)
        },
    )
}
