//! Check predicates
//!
//! A [`Probe`] is the data form of one check: what to test, independent of
//! the name it is reported under. Evaluating a probe never fails; every
//! problem (missing program, permission denied, non-zero exit) collapses to
//! `false`.

use crate::process;
use crate::versions::VersionTable;
use std::ffi::{OsStr, OsString};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::debug;

/// Prefix for scratch files created by writability probes
const WRITE_PROBE_PREFIX: &str = ".smokecheck-write-";

/// A single predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Run an external command; passes on exit status 0
    ///
    /// Arguments are passed to the OS unchanged, so they need not be UTF-8.
    Command {
        program: OsString,
        args: Vec<OsString>,
    },
    /// Command resolves on `PATH`
    Exists { command: String },
    /// Command's version invocation exits 0
    Version { command: String },
    /// Environment variable is present and non-empty
    EnvSet { var: String },
    /// Directory exists and a file can be created in it
    DirWritable { path: PathBuf },
    /// Directory exists
    DirExists { path: PathBuf },
    /// Regular file exists
    FileExists { path: PathBuf },
    /// Regular file exists and can be opened for appending
    FileWritable { path: PathBuf },
}

impl Probe {
    /// Build a command probe from an argv slice
    ///
    /// Returns `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Probe::Command {
            program: program.into(),
            args: args.iter().map(OsString::from).collect(),
        })
    }

    /// Name used when the caller does not supply one
    pub fn default_name(&self) -> String {
        match self {
            Probe::Command { program, args } => shell_words::join(
                std::iter::once(program)
                    .chain(args)
                    .map(|word| word.to_string_lossy()),
            ),
            Probe::Exists { command } => format!("{} exists", command),
            Probe::Version { command } => format!("{} version", command),
            Probe::EnvSet { var } => format!("{} is set", var),
            Probe::DirWritable { path } => format!("{} is writable", path.display()),
            Probe::DirExists { path } => format!("{} directory exists", path.display()),
            Probe::FileExists { path } => format!("{} exists", path.display()),
            Probe::FileWritable { path } => format!("{} is writable", path.display()),
        }
    }

    /// Evaluate the predicate
    pub fn evaluate(&self, versions: &VersionTable) -> bool {
        match self {
            Probe::Command { program, args } => run_command(program, args),
            Probe::Exists { command } => process::which(command).is_some(),
            Probe::Version { command } => {
                let invocation = versions.resolve(command);
                run_command(OsStr::new(&invocation.program), &invocation.args)
            }
            Probe::EnvSet { var } => std::env::var_os(var).is_some_and(|v| !v.is_empty()),
            Probe::DirWritable { path } => {
                if !path.is_dir() {
                    debug!("{} is not a directory", path.display());
                    return false;
                }
                match tempfile::Builder::new()
                    .prefix(WRITE_PROBE_PREFIX)
                    .tempfile_in(path)
                {
                    Ok(_scratch) => true,
                    Err(err) => {
                        debug!("cannot create file in {}: {}", path.display(), err);
                        false
                    }
                }
            }
            Probe::DirExists { path } => path.is_dir(),
            Probe::FileExists { path } => path.is_file(),
            Probe::FileWritable { path } => {
                path.is_file() && OpenOptions::new().append(true).open(path).is_ok()
            }
        }
    }
}

fn run_command<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> bool {
    match process::run_silenced(program, args) {
        Ok(status) => {
            debug!("{} exited with {}", program.to_string_lossy(), status);
            status.success()
        }
        Err(err) => {
            debug!("{} could not be run: {}", program.to_string_lossy(), err);
            false
        }
    }
}
