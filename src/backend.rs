//! Detect-then-dispatch for package managers.
//!
//! A backend is resolved once from the tools present on the host. After
//! that, a unified command name maps to a single invocation of that tool.
//! The health monitor itself does not use this.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::command::{CommandError, CommandRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
    Apk,
}

impl BackendId {
    /// Probe order, newer tools before their predecessors.
    pub const PROBE_ORDER: [BackendId; 6] = [
        BackendId::Apt,
        BackendId::Dnf,
        BackendId::Yum,
        BackendId::Pacman,
        BackendId::Zypper,
        BackendId::Apk,
    ];

    pub fn program(&self) -> &'static str {
        match self {
            BackendId::Apt => "apt-get",
            BackendId::Dnf => "dnf",
            BackendId::Yum => "yum",
            BackendId::Pacman => "pacman",
            BackendId::Zypper => "zypper",
            BackendId::Apk => "apk",
        }
    }

    /// Tool arguments for a unified command, before the package names.
    fn verb(&self, command: PackageCommand) -> &'static [&'static str] {
        use PackageCommand::*;

        match (self, command) {
            (BackendId::Apt, Install) => &["install", "-y"],
            (BackendId::Apt, Remove) => &["remove", "-y"],
            (BackendId::Apt, Update) => &["update"],
            (BackendId::Apt, Search) => &["search"],
            (BackendId::Dnf | BackendId::Yum, Install) => &["install", "-y"],
            (BackendId::Dnf | BackendId::Yum, Remove) => &["remove", "-y"],
            (BackendId::Dnf | BackendId::Yum, Update) => &["makecache"],
            (BackendId::Dnf | BackendId::Yum, Search) => &["search"],
            (BackendId::Pacman, Install) => &["-S", "--noconfirm"],
            (BackendId::Pacman, Remove) => &["-R", "--noconfirm"],
            (BackendId::Pacman, Update) => &["-Sy"],
            (BackendId::Pacman, Search) => &["-Ss"],
            (BackendId::Zypper, Install) => &["--non-interactive", "install"],
            (BackendId::Zypper, Remove) => &["--non-interactive", "remove"],
            (BackendId::Zypper, Update) => &["refresh"],
            (BackendId::Zypper, Search) => &["search"],
            (BackendId::Apk, Install) => &["add"],
            (BackendId::Apk, Remove) => &["del"],
            (BackendId::Apk, Update) => &["update"],
            (BackendId::Apk, Search) => &["search"],
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageCommand {
    Install,
    Remove,
    Update,
    Search,
}

impl std::str::FromStr for PackageCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(PackageCommand::Install),
            "remove" => Ok(PackageCommand::Remove),
            "update" => Ok(PackageCommand::Update),
            "search" => Ok(PackageCommand::Search),
            other => Err(format!("unknown package command '{other}'")),
        }
    }
}

/// First backend whose tool exists, `None` if there is none.
pub fn resolve_backend(runner: &dyn CommandRunner) -> Option<BackendId> {
    let backend = BackendId::PROBE_ORDER
        .into_iter()
        .find(|backend| runner.exists(backend.program()));
    debug!("resolved package backend: {backend:?}");
    backend
}

/// Runs `command` through `backend`, returning stdout and the exit code.
#[instrument(skip(runner))]
pub async fn dispatch(
    runner: &dyn CommandRunner,
    backend: BackendId,
    command: PackageCommand,
    args: &[&str],
    timeout: Duration,
) -> Result<(String, i32), CommandError> {
    let mut full_args: Vec<&str> = backend.verb(command).to_vec();
    full_args.extend_from_slice(args);

    let output = runner.run(backend.program(), &full_args, timeout).await?;
    Ok((output.stdout, output.exit_code))
}
