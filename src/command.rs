//! Execution of external tools.
//!
//! Collection strategies and backend dispatch both shell out to system
//! tools (`top`, `free`, `df`, package managers, ...). The [`CommandRunner`]
//! trait hides the process handling so strategies can be tested against
//! canned output.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug)]
pub enum CommandError {
    /// The program could not be started (usually: not installed)
    Spawn(std::io::Error),

    /// The program did not finish within the allowed time
    Timeout { program: String, after: Duration },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Spawn(err) => write!(f, "failed to start command: {err}"),
            CommandError::Timeout { program, after } => {
                write!(f, "{program} did not finish within {after:?}")
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and waits at most `timeout` for it.
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Whether `program` can be found on the search path.
    fn exists(&self, program: &str) -> bool;
}

/// Runs real processes through tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        trace!("running {program} {args:?}");

        // the child is killed when the timeout drops the wait future
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("LC_ALL", "C")
            .kill_on_drop(true)
            .spawn()
            .map_err(CommandError::Spawn)?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            }),
            Ok(Err(e)) => Err(CommandError::Spawn(e)),
            Err(_elapsed) => Err(CommandError::Timeout {
                program: program.to_string(),
                after: timeout,
            }),
        }
    }

    fn exists(&self, program: &str) -> bool {
        find_in_path(program)
    }
}

fn find_in_path(program: &str) -> bool {
    if program.contains('/') {
        return Path::new(program).is_file();
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };

    std::env::split_paths(&paths).any(|dir| dir.join(program).is_file())
}

/// What a [`CannedRunner`] answers for one command line.
#[derive(Debug, Clone)]
pub enum CannedResponse {
    Output(CommandOutput),
    Missing,
    Timeout,
}

/// Replays prepared output instead of starting processes.
///
/// Commands are keyed by their full command line (`"df -PT"`). Unknown
/// commands behave like a missing program. Every call is recorded.
#[derive(Debug, Default)]
pub struct CannedRunner {
    responses: HashMap<String, CannedResponse>,
    calls: Mutex<Vec<String>>,
}

impl CannedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, command_line: &str, stdout: &str) -> Self {
        self.responses.insert(
            command_line.to_string(),
            CannedResponse::Output(CommandOutput::success(stdout)),
        );
        self
    }

    pub fn with_response(mut self, command_line: &str, response: CannedResponse) -> Self {
        self.responses.insert(command_line.to_string(), response);
        self
    }

    /// Command lines executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for CannedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let command_line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command_line.clone());
        }

        match self.responses.get(&command_line) {
            Some(CannedResponse::Output(output)) => Ok(output.clone()),
            Some(CannedResponse::Timeout) => Err(CommandError::Timeout {
                program: program.to_string(),
                after: timeout,
            }),
            Some(CannedResponse::Missing) | None => Err(CommandError::Spawn(
                std::io::Error::new(std::io::ErrorKind::NotFound, program.to_string()),
            )),
        }
    }

    fn exists(&self, program: &str) -> bool {
        self.responses.iter().any(|(line, response)| {
            line.split_whitespace().next() == Some(program)
                && !matches!(response, CannedResponse::Missing)
        })
    }
}
