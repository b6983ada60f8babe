//! Subprocess execution
//!
//! Checks run external commands with every standard stream attached to the
//! null device and observe only the exit status. The child is owned by a
//! [`ScopedChild`] guard that kills and reaps it if the caller leaves early
//! (error return or unwinding), so no zombie outlives a check.
//!
//! The smoke driver uses [`capture`], an async variant built on
//! `tokio::process` that keeps stdout/stderr for diagnostics.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use tracing::{debug, trace, warn};

/// Guard owning a spawned child process
///
/// Dropping the guard before [`ScopedChild::wait`] completes kills the child
/// and waits for it.
#[derive(Debug)]
pub struct ScopedChild {
    program: String,
    child: Option<Child>,
}

impl ScopedChild {
    /// Spawn `program` with `args`, discarding all output
    pub fn spawn_silenced<P, S>(program: P, args: &[S]) -> io::Result<Self>
    where
        P: AsRef<OsStr>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let program = program.to_string_lossy().into_owned();
        trace!(program = %program, pid = child.id(), "spawned silenced child");
        Ok(Self {
            program,
            child: Some(child),
        })
    }

    /// OS process id, if the child has not been reaped yet
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Block until the child exits and return its status
    pub fn wait(mut self) -> io::Result<ExitStatus> {
        match self.child.as_mut() {
            Some(child) => {
                let status = child.wait()?;
                // Reaped; nothing left for Drop to clean up.
                self.child = None;
                Ok(status)
            }
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} was already reaped", self.program),
            )),
        }
    }
}

impl Drop for ScopedChild {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                // InvalidInput means it already exited
                if err.kind() != io::ErrorKind::InvalidInput {
                    warn!(program = %self.program, "failed to kill child: {}", err);
                }
            }
            let _ = child.wait();
        }
    }
}

/// Run `program` with `args` to completion with all output suppressed
///
/// Returns the exit status. A spawn failure (for example, the program does
/// not exist) is returned as an `io::Error` for the caller to classify.
pub fn run_silenced<P, S>(program: P, args: &[S]) -> io::Result<ExitStatus>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    ScopedChild::spawn_silenced(program, args)?.wait()
}

/// Resolve a command name the way `command -v` does for external programs
///
/// Names containing a path separator are checked directly, relative to the
/// current directory. Otherwise each entry of `search_path` (a `PATH`-style
/// list) is tried in order and the first executable file wins.
pub fn resolve_on_path(command: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match ::which::which_in(command, search_path, cwd) {
        Ok(path) => {
            debug!("Resolved {} to {}", command, path.display());
            Some(path)
        }
        Err(err) => {
            trace!("{} not resolved: {}", command, err);
            None
        }
    }
}

/// Resolve against the current process `PATH`
pub fn which(command: &str) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }
    ::which::which(command).ok()
}

/// Output of a captured external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
}

impl CapturedOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout if non-empty, otherwise stderr
    pub fn text(&self) -> &str {
        if !self.stdout.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Run a command asynchronously and capture its output
///
/// `env` entries are added on top of the inherited environment and `cwd`
/// sets the working directory. The child is killed if the returned future
/// is dropped before completion.
pub async fn capture<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    env: &[(String, String)],
    cwd: Option<&Path>,
) -> io::Result<CapturedOutput> {
    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in env {
        command.env(key, value);
    }
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!(
        "Running: {} {}",
        program,
        args.iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = command.output().await?;
    Ok(CapturedOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
