// src/process/mod.rs

//! External tool execution
//!
//! Every external program (ssh-keygen, openssl, the RPM generator script,
//! fakeroot/alien) is launched through the [`ProcessRunner`] trait so the
//! pipeline can be driven by a fake in tests. Key features of the system
//! runner:
//!
//! - stdin nullification to prevent hangs on prompts
//! - stdout/stderr captured on reader threads
//! - Timeout protection, expiry kills the child
//! - Secret arguments masked when the command line is logged

use crate::error::{Error, Result, ToolFailure};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::Read;
use std::os::unix::ffi::OsStringExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;
use zeroize::{Zeroize, Zeroizing};

/// Default timeout for a single external tool invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const REDACTED: &str = "********";

/// How an external process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited normally with the given code
    Exited(i32),
    /// Terminated by a signal
    Signaled(i32),
    /// Killed after exceeding the runner's timeout
    TimedOut(Duration),
    /// Could not be started
    LaunchFailed(String),
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited(code),
            (None, Some(signal)) => Self::Signaled(signal),
            (None, None) => Self::Exited(-1),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {}", code),
            Self::Signaled(signal) => write!(f, "terminated by signal {}", signal),
            Self::TimedOut(after) => write!(f, "timed out after {} seconds", after.as_secs()),
            Self::LaunchFailed(reason) => write!(f, "could not be launched: {}", reason),
        }
    }
}

/// A single external command to run
///
/// Arguments added with [`secret_arg`](Self::secret_arg) are masked in
/// [`display_command`](Self::display_command) and wiped when the request is
/// dropped. Environment values are always treated as secret.
pub struct ProcessRequest {
    program: PathBuf,
    args: Vec<OsString>,
    secret_args: Vec<usize>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, Zeroizing<String>)>,
}

impl ProcessRequest {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret_args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Add an argument that must never be logged
    pub fn secret_arg(mut self, arg: &str) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(OsString::from(arg));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Pass a secret value through the child's environment
    pub fn secret_env(mut self, key: &str, value: &str) -> Self {
        self.env
            .push((key.to_string(), Zeroizing::new(value.to_string())));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Program name without its directory, used in error messages
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Look up an environment value by key
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Command line with secret arguments masked
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        for (index, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&index) {
                parts.push(REDACTED.to_string());
            } else {
                parts.push(arg.to_string_lossy().into_owned());
            }
        }
        parts.join(" ")
    }
}

impl fmt::Debug for ProcessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRequest")
            .field("command", &self.display_command())
            .field("working_dir", &self.working_dir)
            .field("env", &self.env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for ProcessRequest {
    fn drop(&mut self) {
        for &index in &self.secret_args {
            if let Some(arg) = self.args.get_mut(index) {
                let mut bytes = std::mem::take(arg).into_vec();
                bytes.zeroize();
            }
        }
    }
}

/// Captured result of a process that was started
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub outcome: ExitOutcome,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.outcome.success()
    }

    /// Turn a non-successful outcome into [`Error::ExternalTool`]
    ///
    /// Captured output is logged at debug level and kept inside the error.
    pub fn into_result(self, tool: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }

        debug!("{} {}", tool, self.outcome);
        debug!("{}: stdout: {}", tool, self.stdout);
        debug!("{}: stderr: {}", tool, self.stderr);
        Err(Error::ExternalTool(ToolFailure::new(
            tool,
            self.outcome,
            self.stdout,
            self.stderr,
        )))
    }
}

/// Capability to run external commands synchronously
///
/// A launch failure is reported as `Err`; a process that started but did not
/// exit cleanly is reported as `Ok` with a non-success [`ExitOutcome`].
pub trait ProcessRunner: Send + Sync {
    fn execute(&self, request: &ProcessRequest) -> Result<ProcessOutput>;
}

/// Runs commands on the host with `std::process::Command`
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set a custom timeout, `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for SystemRunner {
    fn execute(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        let tool = request.program_name();
        debug!(
            "Spawning in {}: {}",
            request
                .working_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string()),
            request.display_command()
        );

        let mut command = Command::new(request.program());
        command
            .args(request.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = request.working_dir() {
            command.current_dir(dir);
        }
        for (key, value) in &request.env {
            command.env(key, value.as_str());
        }

        let mut child = command
            .spawn()
            .map_err(|e| Error::ExternalTool(ToolFailure::launch(&tool, e)))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout) {
                Ok(Some(status)) => ExitOutcome::from_status(status),
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    // Grandchildren may still hold the pipes open, so the
                    // reader threads are left detached.
                    return Ok(ProcessOutput {
                        outcome: ExitOutcome::TimedOut(timeout),
                        stdout: String::new(),
                        stderr: String::new(),
                    });
                }
                Err(e) => return Err(abandon(&mut child, e)),
            },
            None => match child.wait() {
                Ok(status) => ExitOutcome::from_status(status),
                Err(e) => return Err(abandon(&mut child, e)),
            },
        };

        let output = ProcessOutput {
            outcome,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };
        debug!("{} returned: {}", tool, output.outcome);
        Ok(output)
    }
}

/// Kill and reap a child whose wait failed, then hand back the wait error
fn abandon(child: &mut Child, error: std::io::Error) -> Error {
    debug!("Killing process {} after wait failure: {}", child.id(), error);
    let _ = child.kill();
    let _ = child.wait();
    Error::from(error)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

/// Runner backed by a closure, for unit tests of the tool wrappers
#[cfg(test)]
pub(crate) struct FnRunner<F>(F);

#[cfg(test)]
impl<F> FnRunner<F>
where
    F: Fn(&ProcessRequest) -> Result<ProcessOutput> + Send + Sync,
{
    pub(crate) fn new(f: F) -> Self {
        Self(f)
    }
}

#[cfg(test)]
impl<F> ProcessRunner for FnRunner<F>
where
    F: Fn(&ProcessRequest) -> Result<ProcessOutput> + Send + Sync,
{
    fn execute(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        (self.0)(request)
    }
}

#[cfg(test)]
pub(crate) fn exited(code: i32) -> ProcessOutput {
    ProcessOutput {
        outcome: ExitOutcome::Exited(code),
        stdout: String::new(),
        stderr: String::new(),
    }
}
