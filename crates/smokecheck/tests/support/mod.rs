//! Shared test utilities for smokecheck CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};

/// `smokecheck` binary with logging kept quiet and colors off
pub fn smokecheck() -> Command {
    let mut cmd = Command::cargo_bin("smokecheck").unwrap();
    cmd.env_remove("SMOKECHECK_LOG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0");
    cmd
}

/// Write `content` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Write an executable shell script `dir/name`
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = write_file(dir, name, &format!("#!/bin/sh\n{}\n", body));
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// `dir` prepended to the current `PATH`
pub fn path_with(dir: &Path) -> String {
    match std::env::var("PATH") {
        Ok(current) if !current.is_empty() => format!("{}:{}", dir.display(), current),
        _ => dir.display().to_string(),
    }
}

/// Extract the JSON document from stdout that may carry stray lines
pub fn extract_json_from_output(output: &str) -> Result<serde_json::Value, serde_json::Error> {
    match output.find('{') {
        Some(start) => serde_json::from_str(output[start..].trim()),
        None => serde_json::from_str(output.trim()),
    }
}
