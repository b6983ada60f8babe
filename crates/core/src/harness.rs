//! Check harness
//!
//! A [`Harness`] owns the pass/fail counters and the ordered list of failed
//! check names for one run. Every check goes through a single code path
//! ([`Harness::run_check`]): evaluate the probe, record the outcome, print a
//! PASS or FAIL line. A failing check never aborts the run; failure is only
//! communicated by the exit code of the final report.
//!
//! Lifecycle: a fresh harness has zero counters, checks mutate it, and
//! [`Harness::finish`] or [`Harness::report`] consume it. Because both take
//! `self`, no check can be recorded after the report.
//!
//! ```no_run
//! use smokecheck_core::harness::Harness;
//!
//! let mut harness = Harness::new();
//! harness.check_command_exists("git");
//! harness.check_quiet("git status", "git", &["status"]);
//! harness.report();
//! ```

use crate::probe::Probe;
use crate::versions::VersionTable;
use console::style;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Glyph set used for PASS/FAIL lines and the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// ✅ / ❌ markers
    #[default]
    Emoji,
    /// PASS: / FAIL: prefixes
    Plain,
}

impl Style {
    fn banner(self, name: &str) -> String {
        match self {
            Style::Emoji => format!("🧪 Testing {}...", name),
            Style::Plain => format!("Testing {}...", name),
        }
    }

    fn pass_line(self, name: &str, colored: bool) -> String {
        let marker = match self {
            Style::Emoji => "✅",
            Style::Plain => "PASS:",
        };
        format!("{} {}", style(marker).green().force_styling(colored), name)
    }

    fn fail_line(self, name: &str, colored: bool) -> String {
        let marker = match self {
            Style::Emoji => style("❌").red(),
            Style::Plain => style("FAIL:").red().bold(),
        };
        format!("{} {}", marker.force_styling(colored), name)
    }

    fn success_message(self, colored: bool) -> String {
        let text = match self {
            Style::Emoji => "🎉 All tests passed!",
            Style::Plain => "All tests passed!",
        };
        style(text).green().bold().force_styling(colored).to_string()
    }

    fn failure_message(self, colored: bool) -> String {
        let text = match self {
            Style::Emoji => "💥 Failed tests:",
            Style::Plain => "Failed tests:",
        };
        style(text).red().bold().force_styling(colored).to_string()
    }
}

/// Whether a check prints a banner before running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Banner line, then the PASS/FAIL line
    Verbose,
    /// PASS/FAIL line only
    Quiet,
}

/// Outcome of one recorded check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
}

/// Counters for one harness
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessState {
    pub pass_count: usize,
    pub fail_count: usize,
    /// Names of failed checks, in call order
    pub failed_names: Vec<String>,
}

impl HarnessState {
    /// Number of checks recorded so far
    pub fn total(&self) -> usize {
        self.pass_count + self.fail_count
    }
}

/// Final summary of a harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
    pub failed_names: Vec<String>,
    pub results: Vec<TestResult>,
}

impl Report {
    /// Whether every check passed
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// 0 when every check passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Pass/fail accounting over a sequence of checks
pub struct Harness<W: Write = io::Stdout> {
    state: HarnessState,
    results: Vec<TestResult>,
    style: Style,
    colored: bool,
    versions: VersionTable,
    out: W,
}

impl Harness<io::Stdout> {
    /// Harness printing to stdout with the default style
    pub fn new() -> Self {
        Self::with_style(Style::default())
    }

    /// Harness printing to stdout with the given style
    ///
    /// Colors follow the terminal, see [`console::colors_enabled`].
    pub fn with_style(style: Style) -> Self {
        Self::with_writer(io::stdout(), style).with_colors(console::colors_enabled())
    }
}

impl Default for Harness<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Harness<W> {
    /// Harness printing to an arbitrary writer, uncolored
    pub fn with_writer(out: W, style: Style) -> Self {
        Self {
            state: HarnessState::default(),
            results: Vec::new(),
            style,
            colored: false,
            versions: VersionTable::default(),
            out,
        }
    }

    /// Enable or disable ANSI colors on PASS/FAIL lines and the summary
    pub fn with_colors(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Replace the version invocation table
    pub fn with_versions(mut self, versions: VersionTable) -> Self {
        self.versions = versions;
        self
    }

    /// Mutable access to the version invocation table
    pub fn versions_mut(&mut self) -> &mut VersionTable {
        &mut self.versions
    }

    /// Current counters
    pub fn state(&self) -> &HarnessState {
        &self.state
    }

    /// Recorded results in call order
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Output style
    pub fn style(&self) -> Style {
        self.style
    }

    /// Run an external command as a check, printing a banner first
    pub fn check<S: AsRef<OsStr>>(&mut self, name: &str, program: &str, args: &[S]) -> bool {
        self.run_check(name, CheckMode::Verbose, &command_probe(program, args))
    }

    /// Run an external command as a check without a banner
    pub fn check_quiet<S: AsRef<OsStr>>(
        &mut self,
        name: &str,
        program: &str,
        args: &[S],
    ) -> bool {
        self.run_check(name, CheckMode::Quiet, &command_probe(program, args))
    }

    /// Evaluate `probe` and record the outcome under `name`
    ///
    /// Returns whether the check passed.
    pub fn run_check(&mut self, name: &str, mode: CheckMode, probe: &Probe) -> bool {
        if mode == CheckMode::Verbose {
            let banner = self.style.banner(name);
            self.emit(&banner);
        }
        debug!(check = name, ?probe, "running check");
        let passed = probe.evaluate(&self.versions);
        self.record(name, passed)
    }

    /// Record an outcome computed by the caller
    pub fn record(&mut self, name: &str, passed: bool) -> bool {
        if passed {
            self.state.pass_count += 1;
            let line = self.style.pass_line(name, self.colored);
            self.emit(&line);
        } else {
            self.state.fail_count += 1;
            self.state.failed_names.push(name.to_string());
            let line = self.style.fail_line(name, self.colored);
            self.emit(&line);
        }
        debug!(check = name, passed, "check recorded");
        self.results.push(TestResult {
            name: name.to_string(),
            passed,
        });
        passed
    }

    /// Does `command` resolve on `PATH`
    pub fn check_command_exists(&mut self, command: &str) -> bool {
        let probe = Probe::Exists {
            command: command.to_string(),
        };
        self.run_default_named(&probe)
    }

    /// Does `command`'s version invocation succeed
    pub fn check_version(&mut self, command: &str) -> bool {
        let probe = Probe::Version {
            command: command.to_string(),
        };
        self.run_default_named(&probe)
    }

    /// Is environment variable `var` set to a non-empty value
    pub fn check_env_set(&mut self, var: &str) -> bool {
        let probe = Probe::EnvSet {
            var: var.to_string(),
        };
        self.run_default_named(&probe)
    }

    /// Can a file be created in directory `path`
    pub fn check_dir_writable(&mut self, path: impl AsRef<Path>) -> bool {
        let probe = Probe::DirWritable {
            path: path.as_ref().to_path_buf(),
        };
        self.run_default_named(&probe)
    }

    /// Does directory `path` exist
    pub fn check_dir_exists(&mut self, path: impl AsRef<Path>) -> bool {
        let probe = Probe::DirExists {
            path: path.as_ref().to_path_buf(),
        };
        self.run_default_named(&probe)
    }

    /// Does regular file `path` exist
    pub fn check_file_exists(&mut self, path: impl AsRef<Path>) -> bool {
        let probe = Probe::FileExists {
            path: path.as_ref().to_path_buf(),
        };
        self.run_default_named(&probe)
    }

    /// Can regular file `path` be opened for appending
    pub fn check_file_writable(&mut self, path: impl AsRef<Path>) -> bool {
        let probe = Probe::FileWritable {
            path: path.as_ref().to_path_buf(),
        };
        self.run_default_named(&probe)
    }

    fn run_default_named(&mut self, probe: &Probe) -> bool {
        let name = probe.default_name();
        self.run_check(&name, CheckMode::Quiet, probe)
    }

    /// Print the summary and return it
    pub fn finish(mut self) -> Report {
        let state = std::mem::take(&mut self.state);
        let summary = [
            String::new(),
            style("Test Results:")
                .bold()
                .force_styling(self.colored)
                .to_string(),
            format!("  Passed: {}", state.pass_count),
            format!("  Failed: {}", state.fail_count),
            format!("  Total:  {}", state.total()),
        ];
        for line in &summary {
            self.emit(line);
        }

        if state.fail_count == 0 {
            let message = self.style.success_message(self.colored);
            self.emit(&message);
        } else {
            let message = self.style.failure_message(self.colored);
            self.emit(&message);
            for name in &state.failed_names {
                self.emit(&format!("  - {}", name));
            }
        }
        if let Err(err) = self.out.flush() {
            warn!("failed to flush harness output: {}", err);
        }

        Report {
            passed: state.pass_count,
            failed: state.fail_count,
            total: state.total(),
            failed_names: state.failed_names,
            results: self.results,
        }
    }

    /// Print the summary and terminate the process with its exit code
    pub fn report(self) -> ! {
        let report = self.finish();
        std::process::exit(report.exit_code())
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{}", line) {
            warn!("failed to write harness output: {}", err);
        }
    }
}

fn command_probe<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Probe {
    Probe::Command {
        program: program.into(),
        args: args.iter().map(|a| a.as_ref().to_os_string()).collect(),
    }
}
