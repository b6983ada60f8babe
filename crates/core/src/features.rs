//! Feature tests
//!
//! Grouped checks validating one devcontainer capability. Each group is a
//! fixed sequence of harness helper calls; it adds no state of its own.

use crate::errors::SuiteError;
use crate::harness::{CheckMode, Harness};
use crate::probe::Probe;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// History directory used when `HISTFILE` has no parent
pub const DEFAULT_HISTORY_DIR: &str = "/dc/shellhistory";

/// History files looked for in the history directory
pub const HISTORY_FILES: &[&str] = &[".bash_history", ".zsh_history"];

/// Database file pre-commit keeps in its cache directory
pub const PRE_COMMIT_DB: &str = "db.db";

/// A named group of checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureTest {
    /// Persistent shell history on a shared volume
    ShellHistory,
    /// Shared pre-commit hook cache
    PreCommitCache,
    /// pre-commit can install hooks into a fresh repository
    PreCommitHooks,
}

impl FeatureTest {
    /// All known feature tests
    pub const ALL: &'static [FeatureTest] = &[
        FeatureTest::ShellHistory,
        FeatureTest::PreCommitCache,
        FeatureTest::PreCommitHooks,
    ];

    /// Name used in suite files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            FeatureTest::ShellHistory => "shell-history",
            FeatureTest::PreCommitCache => "pre-commit-cache",
            FeatureTest::PreCommitHooks => "pre-commit-hooks",
        }
    }

    /// Run the group against `harness`; true when every check in it passed
    pub fn run<W: Write>(self, harness: &mut Harness<W>) -> bool {
        info!("Running feature test: {}", self.name());
        let before = harness.state().fail_count;
        match self {
            FeatureTest::ShellHistory => shell_history(harness, &env_lookup),
            FeatureTest::PreCommitCache => pre_commit_cache(harness, &env_lookup),
            FeatureTest::PreCommitHooks => pre_commit_hooks(harness),
        }
        harness.state().fail_count == before
    }
}

impl FromStr for FeatureTest {
    type Err = SuiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureTest::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| SuiteError::Validation {
                message: format!(
                    "Unknown feature test '{}' (expected one of: {})",
                    s,
                    FeatureTest::ALL
                        .iter()
                        .map(|f| f.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Directory holding shell history files
pub fn history_dir(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    lookup("HISTFILE")
        .map(PathBuf::from)
        .and_then(|f| f.parent().map(|p| p.to_path_buf()))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DIR))
}

/// Directory pre-commit uses for its cache
///
/// `PRE_COMMIT_HOME`, then `$XDG_CACHE_HOME/pre-commit`, then
/// `$HOME/.cache/pre-commit`.
pub fn pre_commit_home(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(home) = lookup("PRE_COMMIT_HOME") {
        return Some(PathBuf::from(home));
    }
    if let Some(cache) = lookup("XDG_CACHE_HOME") {
        return Some(PathBuf::from(cache).join("pre-commit"));
    }
    lookup("HOME").map(|home| PathBuf::from(home).join(".cache").join("pre-commit"))
}

fn shell_history<W: Write>(harness: &mut Harness<W>, lookup: &dyn Fn(&str) -> Option<String>) {
    harness.check_env_set("HISTFILE");

    let dir = history_dir(lookup);
    harness.check_dir_exists(&dir);
    harness.check_dir_writable(&dir);

    let present: Vec<PathBuf> = HISTORY_FILES
        .iter()
        .map(|f| dir.join(f))
        .filter(|p| p.is_file())
        .collect();
    harness.record(
        &format!("history files present in {}", dir.display()),
        !present.is_empty(),
    );
    for file in present {
        harness.check_file_writable(&file);
    }
}

fn pre_commit_cache<W: Write>(harness: &mut Harness<W>, lookup: &dyn Fn(&str) -> Option<String>) {
    harness.check_env_set("PRE_COMMIT_HOME");

    match pre_commit_home(lookup) {
        Some(dir) => {
            harness.check_dir_exists(&dir);
            harness.check_dir_writable(&dir);
            harness.check_command_exists("pre-commit");
            harness.check_version("pre-commit");
            harness.check_file_exists(dir.join(PRE_COMMIT_DB));
        }
        None => {
            warn!("Cannot locate the pre-commit cache directory");
            harness.record("pre-commit cache directory resolvable", false);
        }
    }
}

fn pre_commit_hooks<W: Write>(harness: &mut Harness<W>) {
    let repo = match tempfile::Builder::new().prefix("smokecheck-repo-").tempdir() {
        Ok(dir) => dir,
        Err(err) => {
            warn!("Cannot create temporary repository: {}", err);
            harness.record("temporary git repository created", false);
            return;
        }
    };
    let repo_path = repo.path().as_os_str().to_os_string();

    let init = Probe::Command {
        program: "git".into(),
        args: vec!["-C".into(), repo_path.clone(), "init".into(), "-q".into()],
    };
    if !harness.run_check("temporary git repository created", CheckMode::Quiet, &init) {
        return;
    }

    let install = Probe::Command {
        program: "sh".into(),
        args: vec![
            "-c".into(),
            "cd \"$1\" && pre-commit install".into(),
            "sh".into(),
            repo_path,
        ],
    };
    harness.run_check("pre-commit install", CheckMode::Quiet, &install);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::Style;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_parse_feature_names() {
        assert_eq!(
            "shell-history".parse::<FeatureTest>().unwrap(),
            FeatureTest::ShellHistory
        );
        assert_eq!(
            "pre-commit-cache".parse::<FeatureTest>().unwrap(),
            FeatureTest::PreCommitCache
        );
        let err = "bogus".parse::<FeatureTest>().unwrap_err();
        assert!(err.to_string().contains("Unknown feature test 'bogus'"));
        assert!(err.to_string().contains("shell-history"));
    }

    #[test]
    fn test_history_dir_resolution() {
        assert_eq!(
            history_dir(&lookup_from(&[("HISTFILE", "/dc/shellhistory/.bash_history")])),
            PathBuf::from("/dc/shellhistory")
        );
        assert_eq!(
            history_dir(&lookup_from(&[("HISTFILE", ".bash_history")])),
            PathBuf::from(DEFAULT_HISTORY_DIR)
        );
        assert_eq!(
            history_dir(&lookup_from(&[])),
            PathBuf::from(DEFAULT_HISTORY_DIR)
        );
    }

    #[test]
    fn test_pre_commit_home_resolution() {
        assert_eq!(
            pre_commit_home(&lookup_from(&[
                ("PRE_COMMIT_HOME", "/cache/pc"),
                ("HOME", "/home/vscode")
            ])),
            Some(PathBuf::from("/cache/pc"))
        );
        assert_eq!(
            pre_commit_home(&lookup_from(&[("XDG_CACHE_HOME", "/xdg")])),
            Some(PathBuf::from("/xdg/pre-commit"))
        );
        assert_eq!(
            pre_commit_home(&lookup_from(&[("HOME", "/home/vscode")])),
            Some(PathBuf::from("/home/vscode/.cache/pre-commit"))
        );
        assert_eq!(pre_commit_home(&lookup_from(&[])), None);
    }

    #[test]
    fn test_shell_history_group_against_temp_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(".zsh_history"), "").unwrap();
        let histfile = dir.path().join(".zsh_history");
        let histfile = histfile.to_string_lossy().into_owned();
        let lookup = lookup_from(&[("HISTFILE", histfile.as_str())]);

        let mut buf = Vec::new();
        let mut harness = Harness::with_writer(&mut buf, Style::Plain);
        shell_history(&mut harness, &lookup);
        let report = harness.finish();

        // HISTFILE is read from the real environment by check_env_set; the
        // directory and file checks come from the lookup.
        let non_env_failures: Vec<_> = report
            .failed_names
            .iter()
            .filter(|n| n.as_str() != "HISTFILE is set")
            .collect();
        assert!(non_env_failures.is_empty(), "{:?}", non_env_failures);
        assert_eq!(report.total, 5);
    }

    #[test]
    fn test_shell_history_group_without_history_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let histfile = dir.path().join(".bash_history");
        let histfile = histfile.to_string_lossy().into_owned();
        let lookup = lookup_from(&[("HISTFILE", histfile.as_str())]);

        let mut buf = Vec::new();
        let mut harness = Harness::with_writer(&mut buf, Style::Plain);
        shell_history(&mut harness, &lookup);
        let report = harness.finish();

        assert!(report
            .failed_names
            .iter()
            .any(|n| n.starts_with("history files present in")));
    }

    #[test]
    fn test_pre_commit_cache_unresolvable_records_failure() {
        let mut buf = Vec::new();
        let mut harness = Harness::with_writer(&mut buf, Style::Plain);
        pre_commit_cache(&mut harness, &lookup_from(&[]));
        let report = harness.finish();
        assert!(report
            .failed_names
            .contains(&"pre-commit cache directory resolvable".to_string()));
    }
}
