//! Check commands
//!
//! `run`, `check`, and the convenience predicates all build one harness,
//! feed it checks, and turn the final report into an exit code.

use super::ChecksFailed;
use anyhow::{Context, Result};
use smokecheck_core::features::FeatureTest;
use smokecheck_core::harness::{CheckMode, Harness, Report, Style};
use smokecheck_core::probe::Probe;
use smokecheck_core::suite::Suite;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Convenience predicate selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Exists,
    Version,
    Env,
    Writable,
}

/// Load every suite, then run them in order on a single harness
#[instrument(level = "debug", skip(suites))]
pub fn execute_run(
    suites: &[PathBuf],
    style: Option<Style>,
    verbose: bool,
    json: bool,
) -> Result<()> {
    let loaded = suites
        .iter()
        .map(|path| {
            Suite::load(path).with_context(|| format!("Failed to load suite {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let style = style
        .or_else(|| loaded.iter().find_map(|s| s.style))
        .unwrap_or_default();
    debug!("Running {} suite(s) with {:?} style", loaded.len(), style);

    if json {
        // Check lines go to stderr so stdout carries only the JSON report
        let mut harness = Harness::with_writer(io::stderr(), style);
        run_suites(&loaded, &mut harness, verbose);
        let report = harness.finish();
        print_json(&report)?;
        finish(report)
    } else {
        let mut harness = Harness::with_style(style);
        run_suites(&loaded, &mut harness, verbose);
        finish(harness.finish())
    }
}

fn run_suites<W: Write>(suites: &[Suite], harness: &mut Harness<W>, verbose: bool) {
    for suite in suites {
        run_suite(suite, harness, verbose);
    }
}

fn run_suite<W: Write>(suite: &Suite, harness: &mut Harness<W>, verbose: bool) {
    if verbose {
        let mut suite = suite.clone();
        for check in &mut suite.checks {
            check.mode = CheckMode::Verbose;
        }
        suite.run(harness);
    } else {
        suite.run(harness);
    }
}

/// Run a single command as a check
pub fn execute_check(
    name: Option<&str>,
    command: &[String],
    style: Option<Style>,
    verbose: bool,
) -> Result<()> {
    let probe = Probe::from_argv(command).context("A command to run is required")?;
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| probe.default_name());
    let mode = if verbose {
        CheckMode::Verbose
    } else {
        CheckMode::Quiet
    };

    let mut harness = Harness::with_style(style.unwrap_or_default());
    harness.run_check(&name, mode, &probe);
    finish(harness.finish())
}

/// Run one convenience predicate per argument
pub fn execute_helpers(helper: Helper, targets: &[String], style: Option<Style>) -> Result<()> {
    let mut harness = Harness::with_style(style.unwrap_or_default());
    for target in targets {
        match helper {
            Helper::Exists => harness.check_command_exists(target),
            Helper::Version => harness.check_version(target),
            Helper::Env => harness.check_env_set(target),
            Helper::Writable => harness.check_dir_writable(target),
        };
    }
    finish(harness.finish())
}

/// Run feature tests by name
///
/// Every name is validated before any test runs.
pub fn execute_features(names: &[String], style: Option<Style>) -> Result<()> {
    let features = names
        .iter()
        .map(|name| name.parse::<FeatureTest>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut harness = Harness::with_style(style.unwrap_or_default());
    for feature in features {
        feature.run(&mut harness);
    }
    finish(harness.finish())
}

fn print_json(report: &Report) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;
    Ok(())
}

fn finish(report: Report) -> Result<()> {
    if report.success() {
        Ok(())
    } else {
        Err(ChecksFailed(report.exit_code()).into())
    }
}
