//! Access to the kernel statistics files under `/proc`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Read access to files, so `/proc` readers can run against fixtures.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory files. A path may hold a sequence of contents: each read
/// returns the next one and the last one repeats.
#[derive(Debug, Default)]
pub struct MockFs {
    files: Mutex<HashMap<PathBuf, Vec<String>>>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.with_sequence(path, &[content])
    }

    pub fn with_sequence(self, path: impl Into<PathBuf>, contents: &[&str]) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(
                path.into(),
                contents.iter().map(|content| content.to_string()).collect(),
            );
        }
        self
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("mock filesystem poisoned"))?;

        let Some(contents) = files.get_mut(path) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ));
        };

        match contents.len() {
            0 => Ok(String::new()),
            1 => Ok(contents[0].clone()),
            _ => Ok(contents.remove(0)),
        }
    }
}

/// Aggregate `cpu` counters of `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Busy percentage between two snapshots, `None` if no ticks elapsed
    /// or the counters went backwards.
    pub fn busy_since(&self, earlier: &CpuTimes) -> Option<f64> {
        let total = self.total.checked_sub(earlier.total)?;
        let idle = self.idle.checked_sub(earlier.idle)?;
        if total == 0 || idle > total {
            return None;
        }
        Some((total - idle) as f64 * 100.0 / total as f64)
    }
}

/// Parses the aggregate `cpu` line of `/proc/stat`. Idle time includes
/// iowait; guest time is already part of user time and is not counted twice.
pub fn parse_cpu_times(content: &str) -> Option<CpuTimes> {
    let line = content
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .map(|field| field.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    if fields.len() < 4 {
        return None;
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total = fields.iter().take(8).sum();

    Some(CpuTimes { idle, total })
}

/// First field of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}
