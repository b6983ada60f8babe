//! Template smoke driver
//!
//! Two actions drive a template through the devcontainer CLI:
//!
//! - **build**: prepare a workspace, ensure the devcontainer CLI is
//!   installed, and bring the container up under a per-template id label.
//! - **test**: run the workspace's `test/test.sh` inside that container,
//!   then remove the labelled containers and the workspace directory.
//!
//! All container work is delegated to the external `devcontainer` and
//! `docker` CLIs, invoked one at a time.

use crate::errors::{ProcessError, Result, TemplateError};
use crate::process::{self, CapturedOutput};
use crate::workspace::{self, SMOKE_FILE, WORKSPACE_TEST_DIR};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};

/// Label key identifying smoke containers
pub const SMOKE_LABEL: &str = "test-container";

/// npm package providing the devcontainer CLI
pub const DEVCONTAINER_CLI_PACKAGE: &str = "@devcontainers/cli";

/// Output that means the target container is gone
const NO_SUCH_CONTAINER: &str = "No such container";

/// External programs used by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub devcontainer: String,
    pub docker: String,
    pub npm: Option<String>,
}

impl Tools {
    /// Resolve tools on the current `PATH`, falling back to bare names
    pub fn detect() -> Self {
        let resolve = |name: &str| {
            process::which(name)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string())
        };
        Self {
            devcontainer: resolve("devcontainer"),
            docker: resolve("docker"),
            npm: process::which("npm").map(|p| p.to_string_lossy().into_owned()),
        }
    }
}

/// Options for the build action
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Template repository root (contains `src/` and `test/`)
    pub root: PathBuf,
    pub template_id: String,
    /// Parent for the temporary workspace; system temp dir when `None`
    pub tmp_parent: Option<PathBuf>,
    /// Run `npm install -g @devcontainers/cli` first
    pub install_cli: bool,
}

/// `test-container=<template_id>`
pub fn id_label(template_id: &str) -> String {
    format!("{}={}", SMOKE_LABEL, template_id)
}

/// Shell snippet run inside the container by the test action
pub fn smoke_script() -> String {
    let script = format!("{}/{}", WORKSPACE_TEST_DIR, SMOKE_FILE);
    format!(
        "if [ -f {script} ]; then chmod +x {script} && {script}; else echo 'No tests to run'; fi",
        script = script
    )
}

/// Prepare the workspace and bring the dev container up
///
/// Returns the workspace directory, which the test action needs.
#[instrument(level = "info", skip(tools))]
pub async fn build(options: &BuildOptions, tools: &Tools) -> Result<PathBuf> {
    info!("Building template: {}", options.template_id);
    let prepared = workspace::prepare_workspace(
        &options.root,
        &options.template_id,
        options.tmp_parent.as_deref(),
    )?;
    workspace::copy_test_directory(&options.root, &options.template_id, &prepared.dir)?;

    let env = vec![("DOCKER_BUILDKIT".to_string(), "1".to_string())];
    if options.install_cli {
        ensure_devcontainer_cli(tools, &env).await?;
    }

    let workspace_arg = prepared.dir.to_string_lossy().into_owned();
    let label = id_label(&options.template_id);
    let output = run_tool(
        &tools.devcontainer,
        &[
            "up",
            "--id-label",
            label.as_str(),
            "--workspace-folder",
            workspace_arg.as_str(),
        ],
        &env,
    )
    .await?;
    if !output.success() {
        error!("Container failed to start");
        return Err(failed(&tools.devcontainer, &output));
    }
    debug!("Container started");
    Ok(prepared.dir)
}

/// Run the smoke script inside the container, then clean up
///
/// Returns the script's output, falling back to stderr when stdout is
/// empty. Cleanup only happens after a successful run so a failing
/// container can still be inspected.
#[instrument(level = "info", skip(tools))]
pub async fn test(workspace_dir: &Path, template_id: &str, tools: &Tools) -> Result<String> {
    info!("Testing template: {}", template_id);
    let workspace_arg = workspace_dir.to_string_lossy().into_owned();
    let label = id_label(template_id);
    let script = smoke_script();
    let output = run_tool(
        &tools.devcontainer,
        &[
            "exec",
            "--workspace-folder",
            workspace_arg.as_str(),
            "--id-label",
            label.as_str(),
            "/bin/sh",
            "-c",
            script.as_str(),
        ],
        &[],
    )
    .await?;

    if !output.success() || output.text().contains(NO_SUCH_CONTAINER) {
        error!("Tests failed inside the Dev Container");
        return Err(ProcessError::Action {
            message: format!(
                "Tests failed inside the Dev Container: {}",
                if output.stderr.is_empty() {
                    &output.stdout
                } else {
                    &output.stderr
                }
            ),
        }
        .into());
    }

    let removed = cleanup_containers(tools, template_id).await?;
    debug!("Removed {} container(s)", removed);

    debug!("Cleaning up workspace directory");
    if let Err(err) = std::fs::remove_dir_all(workspace_dir) {
        debug!(
            "Could not remove workspace {}: {}",
            workspace_dir.display(),
            err
        );
    }

    info!("Test completed");
    Ok(output.text().to_string())
}

/// Remove every container carrying the template's smoke label
///
/// Returns the number of containers removed.
pub async fn cleanup_containers(tools: &Tools, template_id: &str) -> Result<usize> {
    let filter = format!("label={}", id_label(template_id));
    let listed = run_tool(
        &tools.docker,
        &["ps", "-a", "-q", "--filter", filter.as_str()],
        &[],
    )
    .await?;
    if !listed.success() {
        return Err(failed(&tools.docker, &listed));
    }

    let ids: Vec<&str> = listed
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if ids.is_empty() {
        debug!("No containers found with label {}", id_label(template_id));
        return Ok(0);
    }

    debug!("Removing containers: {}", ids.join(" "));
    let mut args = vec!["rm", "-f"];
    args.extend(ids.iter().copied());
    let removed = run_tool(&tools.docker, &args, &[]).await?;
    if !removed.success() {
        return Err(failed(&tools.docker, &removed));
    }
    Ok(ids.len())
}

/// Append `workspace=<dir>` to a GitHub Actions output file
pub fn write_github_output(output_file: &Path, workspace_dir: &Path) -> Result<()> {
    debug!(
        "Writing workspace path to GITHUB_OUTPUT: {}",
        output_file.display()
    );
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_file)
        .map_err(|e| file_error(output_file, e))?;
    writeln!(file, "workspace={}", workspace_dir.display()).map_err(|e| file_error(output_file, e))
}

async fn ensure_devcontainer_cli(tools: &Tools, env: &[(String, String)]) -> Result<()> {
    debug!("Installing {}", DEVCONTAINER_CLI_PACKAGE);
    let npm = tools.npm.as_deref().ok_or_else(|| ProcessError::ToolMissing {
        tool: "npm".to_string(),
    })?;
    let output = run_tool(npm, &["install", "-g", DEVCONTAINER_CLI_PACKAGE], env).await?;
    if !output.success() {
        return Err(failed(npm, &output));
    }
    Ok(())
}

async fn run_tool(
    program: &str,
    args: &[&str],
    env: &[(String, String)],
) -> Result<CapturedOutput> {
    process::capture(program, args, env, None)
        .await
        .map_err(|source| {
            ProcessError::Spawn {
                program: program.to_string(),
                source,
            }
            .into()
        })
}

fn failed(program: &str, output: &CapturedOutput) -> crate::errors::SmokeError {
    error!("{} failed with exit code {:?}", program, output.code);
    ProcessError::Failed {
        program: program.to_string(),
        code: output.code,
        stderr: output.stderr.clone(),
    }
    .into()
}

fn file_error(path: &Path, err: std::io::Error) -> crate::errors::SmokeError {
    TemplateError::FileOperation {
        message: format!("Error writing to GITHUB_OUTPUT {}: {}", path.display(), err),
    }
    .into()
}
