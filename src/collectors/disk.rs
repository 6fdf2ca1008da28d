use std::path::Path;

use async_trait::async_trait;
use sysinfo::Disks;

use super::{CollectorContext, Strategy};
use crate::{MetricKind, MetricSample};

/// Filesystem types that never hold persistent data.
const PSEUDO_TYPES: &[&str] = &[
    "tmpfs",
    "devtmpfs",
    "overlay",
    "squashfs",
    "proc",
    "sysfs",
    "devpts",
    "cgroup",
    "cgroup2",
    "ramfs",
    "autofs",
    "efivarfs",
    "tracefs",
    "debugfs",
    "securityfs",
    "nsfs",
    "fusectl",
    "iso9660",
];

/// Sources used by pseudo mounts, for `df` variants without a type column.
const PSEUDO_SOURCES: &[&str] = &["tmpfs", "devtmpfs", "udev", "none", "overlay", "shm", "run"];

pub fn is_pseudo(source: &str, fs_type: Option<&str>) -> bool {
    if let Some(fs_type) = fs_type
        && PSEUDO_TYPES.contains(&fs_type)
    {
        return true;
    }
    PSEUDO_SOURCES.contains(&source) || source.starts_with("/dev/loop")
}

/// Parses POSIX `df` output. With `typed` the second column is the
/// filesystem type (`df -PT`).
///
/// Rows with a non-numeric capacity are skipped. Mount points may
/// contain spaces, so the label is everything after the capacity column.
pub fn parse_df(output: &str, typed: bool) -> Option<Vec<(String, f64)>> {
    let mut lines = output.lines();
    let header = lines.next()?;
    if !header.contains("Mounted on") {
        return None;
    }

    let capacity_column = if typed { 5 } else { 4 };

    let usage = lines
        .filter_map(|line| {
            let columns = line.split_whitespace().collect::<Vec<_>>();
            if columns.len() <= capacity_column + 1 {
                return None;
            }

            let fs_type = typed.then(|| columns[1]);
            if is_pseudo(columns[0], fs_type) {
                return None;
            }

            let percent = columns[capacity_column]
                .strip_suffix('%')?
                .parse::<f64>()
                .ok()?;
            let mount = columns[capacity_column + 1..].join(" ");

            Some((mount, percent))
        })
        .collect();

    Some(usage)
}

fn samples(usage: Vec<(String, f64)>, source: &'static str) -> Vec<MetricSample> {
    usage
        .into_iter()
        .map(|(mount, percent)| MetricSample::labelled(MetricKind::Disk, mount, percent, source))
        .filter(MetricSample::is_valid)
        .collect()
}

/// `df -PT`, which lets pseudo filesystems be excluded by type.
pub struct DfTyped {
    ctx: CollectorContext,
}

impl DfTyped {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for DfTyped {
    fn name(&self) -> &'static str {
        "df -PT"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let output = self.ctx.stdout_lenient("df", &["-PT"]).await?;
        let usage = parse_df(&output, true)?;
        Some(samples(usage, self.name()))
    }
}

/// Plain `df -P` for implementations without `-T`.
pub struct DfPortable {
    ctx: CollectorContext,
}

impl DfPortable {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Strategy for DfPortable {
    fn name(&self) -> &'static str {
        "df -P"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let output = self.ctx.stdout_lenient("df", &["-P"]).await?;
        let usage = parse_df(&output, false)?;
        Some(samples(usage, self.name()))
    }
}

/// Capacity as `df` reports it: `used / (used + available)`, rounded up.
///
/// Blocks reserved for root count neither as used nor as available.
pub fn df_capacity(used: u64, available: u64) -> Option<f64> {
    let usable = used as u128 + available as u128;
    if usable == 0 {
        return None;
    }
    Some((used as u128 * 100).div_ceil(usable) as f64)
}

/// Used and available blocks of the filesystem mounted at `mount`.
#[cfg(unix)]
fn block_usage(mount: &Path) -> Option<(u64, u64)> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let path = CString::new(mount.as_os_str().as_bytes()).ok()?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();

    // SAFETY: `path` is NUL terminated and `stat` is only read after a successful call
    if unsafe { libc::statvfs(path.as_ptr(), stat.as_mut_ptr()) } != 0 {
        return None;
    }
    let stat = unsafe { stat.assume_init() };

    let used = (stat.f_blocks as u64).saturating_sub(stat.f_bfree as u64);
    Some((used, stat.f_bavail as u64))
}

#[cfg(not(unix))]
fn block_usage(_mount: &Path) -> Option<(u64, u64)> {
    None
}

pub struct NativeDisks;

#[async_trait]
impl Strategy for NativeDisks {
    fn name(&self) -> &'static str {
        "sysinfo"
    }

    async fn try_collect(&self) -> Option<Vec<MetricSample>> {
        let disks = Disks::new_with_refreshed_list();

        let usage = disks
            .list()
            .iter()
            .filter(|disk| {
                let fs_type = disk.file_system().to_string_lossy();
                let source = disk.name().to_string_lossy();
                disk.total_space() > 0 && !is_pseudo(&source, Some(fs_type.as_ref()))
            })
            .filter_map(|disk| {
                // sysinfo has no free figure, without statvfs reserved blocks count as used
                let (used, available) = block_usage(disk.mount_point()).unwrap_or_else(|| {
                    let available = disk.available_space();
                    (disk.total_space().saturating_sub(available), available)
                });
                let percent = df_capacity(used, available)?;
                Some((disk.mount_point().display().to_string(), percent))
            })
            .collect();

        Some(samples(usage, self.name()))
    }
}
