//! `smokecheck smoke` actions
//!
//! Thin wrapper over [`smokecheck_core::smoke`]: resolves tools and paths,
//! then reports the workspace directory the way CI expects it.

use crate::cli::SmokeCommands;
use anyhow::{Context, Result};
use smokecheck_core::smoke::{self, BuildOptions, Tools};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Execute a smoke build or test action
#[instrument(level = "debug", skip(action))]
pub async fn execute_smoke(action: SmokeCommands) -> Result<()> {
    let tools = Tools::detect();
    debug!("Resolved tools: {:?}", tools);

    match action {
        SmokeCommands::Build {
            template_id,
            root,
            tmpdir,
            skip_cli_install,
        } => {
            let root = match root {
                Some(root) => root,
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            let options = BuildOptions {
                root,
                template_id,
                tmp_parent: tmpdir,
                install_cli: !skip_cli_install,
            };
            let workspace = smoke::build(&options, &tools).await?;
            report_workspace(&workspace)
        }
        SmokeCommands::Test {
            template_id,
            tmpdir,
        } => {
            let output = smoke::test(&tmpdir, &template_id, &tools).await?;
            let mut stdout = std::io::stdout().lock();
            if !output.is_empty() {
                writeln!(stdout, "{}", output)?;
            }
            stdout.flush()?;
            Ok(())
        }
    }
}

/// Append to `GITHUB_OUTPUT` when running in Actions, otherwise print
fn report_workspace(workspace: &std::path::Path) -> Result<()> {
    match std::env::var_os("GITHUB_OUTPUT").filter(|v| !v.is_empty()) {
        Some(file) => {
            smoke::write_github_output(&PathBuf::from(file), workspace)?;
            Ok(())
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", workspace.display())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
