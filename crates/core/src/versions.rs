//! Version invocation table
//!
//! Most tools print their version with `<tool> --version`. The exceptions
//! are listed in [`BUILTIN_OVERRIDES`] as plain data and resolved by lookup,
//! falling back to the default flag.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Flag appended when a command has no override
pub const DEFAULT_VERSION_FLAG: &str = "--version";

/// Commands whose version invocation differs from `<cmd> --version`
///
/// Each entry maps a command name to the full argument list passed to it.
pub const BUILTIN_OVERRIDES: &[(&str, &[&str])] = &[
    ("go", &["version"]),
    ("java", &["-version"]),
    ("javac", &["-version"]),
    ("ssh", &["-V"]),
    ("terraform", &["version"]),
    ("kubectl", &["version", "--client"]),
    ("helm", &["version"]),
    ("gcloud", &["version"]),
    ("az", &["version"]),
    ("dotnet", &["--version"]),
];

static BUILTIN_TABLE: Lazy<HashMap<String, Invocation>> = Lazy::new(|| {
    BUILTIN_OVERRIDES
        .iter()
        .map(|(cmd, args)| {
            (
                (*cmd).to_string(),
                Invocation {
                    program: (*cmd).to_string(),
                    args: args.iter().map(|a| (*a).to_string()).collect(),
                },
            )
        })
        .collect()
});

/// A concrete program + arguments pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Lookup table from command name to version invocation
#[derive(Debug, Clone)]
pub struct VersionTable {
    entries: HashMap<String, Invocation>,
}

impl Default for VersionTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN_TABLE.clone(),
        }
    }
}

impl VersionTable {
    /// A table without any overrides; every command uses `--version`
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace the invocation for `command`
    ///
    /// `argv[0]` is the program to run (it may differ from `command`, e.g. a
    /// wrapper); the rest are its arguments. An empty `argv` removes any
    /// override so the default applies again.
    pub fn set_override(&mut self, command: &str, argv: &[String]) {
        match argv.split_first() {
            Some((program, args)) => {
                self.entries.insert(
                    command.to_string(),
                    Invocation {
                        program: program.clone(),
                        args: args.to_vec(),
                    },
                );
            }
            None => {
                self.entries.remove(command);
            }
        }
    }

    /// Resolve the version invocation for `command`
    pub fn resolve(&self, command: &str) -> Invocation {
        self.entries.get(command).cloned().unwrap_or_else(|| Invocation {
            program: command.to_string(),
            args: vec![DEFAULT_VERSION_FLAG.to_string()],
        })
    }

    /// Whether `command` has an explicit entry
    pub fn has_override(&self, command: &str) -> bool {
        self.entries.contains_key(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flag_fallback() {
        let table = VersionTable::default();
        let inv = table.resolve("node");
        assert_eq!(inv.program, "node");
        assert_eq!(inv.args, vec!["--version"]);
        assert!(!table.has_override("node"));
    }

    #[test]
    fn test_builtin_overrides() {
        let table = VersionTable::default();
        assert_eq!(table.resolve("go").args, vec!["version"]);
        assert_eq!(table.resolve("java").args, vec!["-version"]);
        assert_eq!(table.resolve("kubectl").args, vec!["version", "--client"]);
    }

    #[test]
    fn test_set_and_clear_override() {
        let mut table = VersionTable::empty();
        table.set_override(
            "compose",
            &["docker".to_string(), "compose".to_string(), "version".to_string()],
        );
        let inv = table.resolve("compose");
        assert_eq!(inv.program, "docker");
        assert_eq!(inv.args, vec!["compose", "version"]);

        table.set_override("compose", &[]);
        assert_eq!(table.resolve("compose").args, vec!["--version"]);
    }

    #[test]
    fn test_empty_table_has_no_overrides() {
        let table = VersionTable::empty();
        assert_eq!(table.resolve("go").args, vec!["--version"]);
    }
}
