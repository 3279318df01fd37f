//! External tool invocation
//!
//! Every external process (kops, kubectl, make, git) is run through this
//! module so stdout and stderr are always captured separately and non-zero
//! exits are wrapped with the originating command for diagnostics.
//!
//! Two flavours exist:
//!
//! - [`run_captured`] blocks until the tool exits. Used for create/apply/
//!   install invocations, which may legitimately run for many minutes and
//!   are bounded by the orchestrator's polling budgets instead.
//! - [`run_with_deadline`] bounds the call with a short deadline and kills
//!   the process on expiry. Deadline expiry is reported as a distinct
//!   `Timeout` error, never conflated with a tool failure, so callers can
//!   surface a clear credentials/connectivity diagnostic.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};

/// Interval between exit polls while waiting under a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured output of a completed tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Specification of one external tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<std::path::PathBuf>,
}

impl ToolCommand {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, envs: &BTreeMap<String, String>) -> Self {
        self.env.extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// The command line as it would be typed, for logs and errors.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Our env vars extend the user's existing environment.
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

/// Run a tool to completion, treating a non-zero exit as an error.
pub fn run_captured(command: &ToolCommand) -> Result<ToolOutput> {
    let output = run_tolerant(command)?;

    if !output.success {
        return Err(Error::ExternalTool {
            command: command.display(),
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    Ok(output)
}

/// Run a tool to completion, reporting the exit status instead of failing
/// on it. Spawn failures are still errors.
pub fn run_tolerant(command: &ToolCommand) -> Result<ToolOutput> {
    debug!("Executing: {}", command.display());

    let output = command.build().output().map_err(|e| Error::ExternalTool {
        command: command.display(),
        stdout: String::new(),
        stderr: format!("failed to start: {}", e),
    })?;

    Ok(ToolOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a tool under a deadline, killing it and returning a `Timeout` error
/// if it does not exit in time.
///
/// `task` describes the operation for the timeout message; `hint` is an
/// optional pointer at the likely cause (credentials, connectivity).
pub fn run_with_deadline(
    command: &ToolCommand,
    deadline: Duration,
    task: &str,
    hint: Option<&str>,
) -> Result<ToolOutput> {
    debug!(
        "Executing with {}s deadline: {}",
        deadline.as_secs(),
        command.display()
    );

    let mut child = command.build().spawn().map_err(|e| Error::ExternalTool {
        command: command.display(),
        stdout: String::new(),
        stderr: format!("failed to start: {}", e),
    })?;

    let started = Instant::now();

    loop {
        match child.try_wait()? {
            Some(status) => {
                let (stdout, stderr) = drain_output(&mut child);
                return Ok(ToolOutput {
                    success: status.success(),
                    stdout,
                    stderr,
                });
            }
            None => {
                if started.elapsed() >= deadline {
                    // Expired: kill the child and surface a distinct error.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        task: task.to_string(),
                        hint: hint.map(|h| h.to_string()),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn drain_output(child: &mut Child) -> (String, String) {
    let mut stdout = String::new();
    let mut stderr = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        let _ = pipe.read_to_string(&mut stdout);
    }
    if let Some(mut pipe) = child.stderr.take() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    (stdout, stderr)
}
