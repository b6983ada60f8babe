//! Suite files
//!
//! A suite is a TOML file listing checks for one template or image. Each
//! `[[check]]` table names exactly one probe key; `name` is optional and
//! defaults to the probe's derived name.
//!
//! ```toml
//! name = "python"
//! style = "plain"
//! features = ["shell-history"]
//!
//! [versions]
//! compose = ["docker", "compose", "version"]
//!
//! [[check]]
//! exists = "git"
//!
//! [[check]]
//! name = "pip imports"
//! run = "python3 -c 'import pip'"
//! ```

use crate::errors::{Result, SuiteError};
use crate::features::FeatureTest;
use crate::harness::{CheckMode, Harness, Style};
use crate::probe::Probe;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Raw suite file as deserialized from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    style: Option<Style>,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    versions: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "check")]
    checks: Vec<CheckSpec>,
}

/// One `[[check]]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    verbose: Option<bool>,
    #[serde(default)]
    run: Option<String>,
    #[serde(default)]
    argv: Option<Vec<String>>,
    #[serde(default)]
    exists: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    env: Option<String>,
    #[serde(default)]
    writable: Option<PathBuf>,
    #[serde(default)]
    dir: Option<PathBuf>,
    #[serde(default)]
    file: Option<PathBuf>,
}

impl CheckSpec {
    fn into_probe(self, index: usize) -> std::result::Result<Probe, SuiteError> {
        let mut probes = Vec::new();
        if let Some(line) = self.run {
            let argv = shell_words::split(&line).map_err(|e| SuiteError::Validation {
                message: format!("check #{}: cannot split `run` command: {}", index + 1, e),
            })?;
            probes.push(Probe::from_argv(&argv).ok_or_else(|| SuiteError::Validation {
                message: format!("check #{}: `run` command is empty", index + 1),
            })?);
        }
        if let Some(argv) = self.argv {
            probes.push(Probe::from_argv(&argv).ok_or_else(|| SuiteError::Validation {
                message: format!("check #{}: `argv` is empty", index + 1),
            })?);
        }
        if let Some(command) = self.exists {
            probes.push(Probe::Exists { command });
        }
        if let Some(command) = self.version {
            probes.push(Probe::Version { command });
        }
        if let Some(var) = self.env {
            probes.push(Probe::EnvSet { var });
        }
        if let Some(path) = self.writable {
            probes.push(Probe::DirWritable { path });
        }
        if let Some(path) = self.dir {
            probes.push(Probe::DirExists { path });
        }
        if let Some(path) = self.file {
            probes.push(Probe::FileExists { path });
        }

        let count = probes.len();
        match (probes.pop(), count) {
            (Some(probe), 1) => Ok(probe),
            (None, _) => Err(SuiteError::Validation {
                message: format!(
                    "check #{} has no probe (expected one of: run, argv, exists, version, env, writable, dir, file)",
                    index + 1
                ),
            }),
            _ => Err(SuiteError::Validation {
                message: format!(
                    "check #{} names {} probes; expected exactly one",
                    index + 1,
                    count
                ),
            }),
        }
    }
}

/// A validated check ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteCheck {
    pub name: String,
    pub mode: CheckMode,
    pub probe: Probe,
}

/// A validated suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub name: String,
    pub style: Option<Style>,
    pub checks: Vec<SuiteCheck>,
    pub features: Vec<FeatureTest>,
    /// Version invocation overrides, command -> argv
    pub versions: BTreeMap<String, Vec<String>>,
}

impl Suite {
    /// Load and validate a suite file
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SuiteError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = fs::read_to_string(path).map_err(SuiteError::Io)?;
        let fallback_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "suite".to_string());
        Self::parse(&content, &path.display().to_string(), &fallback_name)
    }

    /// Parse suite TOML; `origin` is used in error messages and
    /// `fallback_name` when the file has no `name`
    pub fn parse(content: &str, origin: &str, fallback_name: &str) -> Result<Self> {
        let file: SuiteFile = toml::from_str(content).map_err(|e| SuiteError::Parsing {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

        let default_mode = if file.verbose {
            CheckMode::Verbose
        } else {
            CheckMode::Quiet
        };

        let mut checks = Vec::with_capacity(file.checks.len());
        for (index, spec) in file.checks.into_iter().enumerate() {
            let name = spec.name.clone().filter(|n| !n.trim().is_empty());
            let mode = match spec.verbose {
                Some(true) => CheckMode::Verbose,
                Some(false) => CheckMode::Quiet,
                None => default_mode,
            };
            let probe = spec.into_probe(index)?;
            checks.push(SuiteCheck {
                name: name.unwrap_or_else(|| probe.default_name()),
                mode,
                probe,
            });
        }

        let features = file
            .features
            .iter()
            .map(|f| f.parse::<FeatureTest>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (command, argv) in &file.versions {
            if argv.is_empty() {
                return Err(SuiteError::Validation {
                    message: format!("version override for '{}' is empty", command),
                }
                .into());
            }
        }

        let suite = Suite {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            style: file.style,
            checks,
            features,
            versions: file.versions,
        };
        debug!(
            "Parsed suite '{}' with {} checks and {} feature tests",
            suite.name,
            suite.checks.len(),
            suite.features.len()
        );
        Ok(suite)
    }

    /// Number of checks and feature groups
    pub fn len(&self) -> usize {
        self.checks.len() + self.features.len()
    }

    /// Whether the suite has nothing to run
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every check in file order, then every feature test
    ///
    /// Version overrides are installed into the harness first and stay in
    /// effect for later suites run on the same harness.
    pub fn run<W: Write>(&self, harness: &mut Harness<W>) {
        info!("Running suite '{}'", self.name);
        for (command, argv) in &self.versions {
            harness.versions_mut().set_override(command, argv);
        }
        for check in &self.checks {
            harness.run_check(&check.name, check.mode, &check.probe);
        }
        for feature in &self.features {
            feature.run(harness);
        }
    }
}
