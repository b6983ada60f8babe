//! Smoke workspace preparation
//!
//! Layout of a template repository:
//!
//! ```text
//! src/<template-id>/...            template sources
//! test/<template-id>/test.sh       smoke script for the template
//! test/utils/test-utils.sh         helpers shared by every smoke script
//! ```
//!
//! A prepared workspace is a fresh temporary copy of `src/<template-id>`
//! with template options configured and the test files merged into
//! `<workspace>/test`.

use crate::errors::{Result, TemplateError};
use crate::templates::{configure_template_options, ConfigureReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Directory holding template sources
pub const WORKSPACE_SRC: &str = "src";
/// Directory holding per-template smoke tests
pub const SMOKE_DIRECTORY: &str = "test";
/// Shared helpers under [`SMOKE_DIRECTORY`]
pub const SMOKE_UTILS_DIRECTORY: &str = "utils";
/// Destination of test files inside the workspace
pub const WORKSPACE_TEST_DIR: &str = "test";
/// Smoke script run inside the container
pub const SMOKE_FILE: &str = "test.sh";
/// Prefix of the temporary directory holding workspaces
pub const WORKSPACE_PREFIX: &str = "smoke_";

/// A template copied into a temporary location
#[derive(Debug, Clone)]
pub struct PreparedWorkspace {
    /// `<temp dir>/<template-id>`
    pub dir: PathBuf,
    /// Result of option configuration
    pub options: ConfigureReport,
}

/// Copy `root/src/<template_id>` into a fresh temporary directory and
/// configure its options
///
/// The temporary directory is created under `tmp_parent` (the system temp
/// directory when `None`) and is not removed automatically; the test action
/// deletes it once the container has been exercised.
#[instrument(level = "debug")]
pub fn prepare_workspace(
    root: &Path,
    template_id: &str,
    tmp_parent: Option<&Path>,
) -> Result<PreparedWorkspace> {
    let source_dir = root.join(WORKSPACE_SRC).join(template_id);
    if !source_dir.is_dir() {
        return Err(TemplateError::SourceNotFound {
            path: source_dir.display().to_string(),
        }
        .into());
    }

    let parent = tmp_parent
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    let base = tempfile::Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir_in(&parent)
        .map_err(TemplateError::Io)?
        .keep();
    let workspace_dir = base.join(template_id);
    debug!("Preparing workspace at: {}", workspace_dir.display());

    copy_tree(&source_dir, &workspace_dir)?;
    let options = configure_template_options(&workspace_dir)?;
    info!(
        "Prepared workspace for '{}' at {}",
        template_id,
        workspace_dir.display()
    );

    Ok(PreparedWorkspace {
        dir: workspace_dir,
        options,
    })
}

/// Copy `root/test/<template_id>` and `root/test/utils` into
/// `<workspace>/test`
///
/// Returns false when the template has no test directory, in which case
/// nothing is copied.
#[instrument(level = "debug")]
pub fn copy_test_directory(root: &Path, template_id: &str, workspace_dir: &Path) -> Result<bool> {
    let test_dir = root.join(SMOKE_DIRECTORY).join(template_id);
    if !test_dir.is_dir() {
        debug!("No test directory for '{}'", template_id);
        return Ok(false);
    }

    let dest_dir = workspace_dir.join(WORKSPACE_TEST_DIR);
    copy_contents(&test_dir, &dest_dir)?;

    let utils_dir = root.join(SMOKE_DIRECTORY).join(SMOKE_UTILS_DIRECTORY);
    if utils_dir.is_dir() {
        copy_contents(&utils_dir, &dest_dir)?;
    }
    Ok(true)
}

/// Replace `dst` with a recursive copy of `src`, preserving symlinks
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        fs::remove_dir_all(dst).map_err(|e| file_error("remove", dst, e))?;
    }
    copy_dir(src, dst)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| file_error("create", dst, e))?;
    for entry in fs::read_dir(src).map_err(TemplateError::Io)? {
        let entry = entry.map_err(TemplateError::Io)?;
        let file_type = entry.file_type().map_err(TemplateError::Io)?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else if file_type.is_dir() {
            copy_dir(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to).map_err(|e| file_error("copy", &from, e))?;
        }
    }
    Ok(())
}

/// Merge the children of `src_dir` into `dest_dir`
///
/// Directories are merged, regular files overwritten, special files skipped.
pub fn copy_contents(src_dir: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir).map_err(|e| file_error("create", dest_dir, e))?;
    for entry in fs::read_dir(src_dir).map_err(TemplateError::Io)? {
        let entry = entry.map_err(TemplateError::Io)?;
        let child = entry.path();
        let target = dest_dir.join(entry.file_name());
        if child.is_dir() {
            copy_dir(&child, &target)?;
        } else if child.is_file() {
            fs::copy(&child, &target).map_err(|e| file_error("copy", &child, e))?;
        } else {
            debug!("Skipping special file: {}", child.display());
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = fs::read_link(from).map_err(TemplateError::Io)?;
    if to.symlink_metadata().is_ok() {
        fs::remove_file(to).map_err(|e| file_error("remove", to, e))?;
    }
    std::os::unix::fs::symlink(&link, to).map_err(|e| file_error("link", to, e))
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        copy_dir(from, to)
    } else {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| file_error("copy", from, e))
    }
}

fn file_error(op: &str, path: &Path, err: std::io::Error) -> crate::errors::SmokeError {
    TemplateError::FileOperation {
        message: format!("Failed to {} {}: {}", op, path.display(), err),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::TEMPLATE_METADATA_FILE;
    use tempfile::TempDir;

    fn template_repo() -> anyhow::Result<TempDir> {
        let root = TempDir::new()?;
        let src = root.path().join("src/python/.devcontainer");
        fs::create_dir_all(&src)?;
        fs::write(
            root.path().join("src/python").join(TEMPLATE_METADATA_FILE),
            r#"{ "id": "python", "options": { "imageVariant": { "default": "3.12" } } }"#,
        )?;
        fs::write(
            src.join("devcontainer.json"),
            r#"{ "image": "python:${templateOption:imageVariant}" }"#,
        )?;
        fs::create_dir_all(root.path().join("test/python"))?;
        fs::write(root.path().join("test/python/test.sh"), "#!/bin/sh\n")?;
        fs::create_dir_all(root.path().join("test/utils"))?;
        fs::write(root.path().join("test/utils/test-utils.sh"), "check() {}\n")?;
        Ok(root)
    }

    #[test]
    fn test_prepare_workspace_copies_and_configures() -> anyhow::Result<()> {
        let root = template_repo()?;
        let tmp = TempDir::new()?;
        let prepared = prepare_workspace(root.path(), "python", Some(tmp.path()))?;

        assert!(prepared.dir.ends_with("python"));
        assert!(prepared.dir.starts_with(tmp.path()));
        let parent_name = prepared.dir.parent().unwrap().file_name().unwrap();
        assert!(parent_name.to_string_lossy().starts_with(WORKSPACE_PREFIX));
        assert_eq!(
            fs::read_to_string(prepared.dir.join(".devcontainer/devcontainer.json"))?,
            r#"{ "image": "python:3.12" }"#
        );
        // Sources stay untouched
        assert!(
            fs::read_to_string(root.path().join("src/python/.devcontainer/devcontainer.json"))?
                .contains("${templateOption:imageVariant}")
        );
        Ok(())
    }

    #[test]
    fn test_prepare_workspace_missing_source() {
        let root = TempDir::new().unwrap();
        let err = prepare_workspace(root.path(), "ghost", None).unwrap_err();
        assert!(err.to_string().contains("Source template directory not found"));
    }

    #[test]
    fn test_copy_test_directory_merges_utils() -> anyhow::Result<()> {
        let root = template_repo()?;
        let ws = TempDir::new()?;
        assert!(copy_test_directory(root.path(), "python", ws.path())?);
        assert!(ws.path().join("test/test.sh").is_file());
        assert!(ws.path().join("test/test-utils.sh").is_file());

        assert!(!copy_test_directory(root.path(), "node", ws.path())?);
        Ok(())
    }

    #[test]
    fn test_copy_tree_replaces_destination() -> anyhow::Result<()> {
        let src = TempDir::new()?;
        fs::create_dir_all(src.path().join("a/b"))?;
        fs::write(src.path().join("a/b/file.txt"), "new")?;
        let dst_root = TempDir::new()?;
        let dst = dst_root.path().join("copy");
        fs::create_dir_all(&dst)?;
        fs::write(dst.join("stale.txt"), "old")?;

        copy_tree(src.path(), &dst)?;
        assert!(!dst.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(dst.join("a/b/file.txt"))?, "new");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_preserves_symlinks() -> anyhow::Result<()> {
        let src = TempDir::new()?;
        fs::write(src.path().join("target.txt"), "x")?;
        std::os::unix::fs::symlink("target.txt", src.path().join("link.txt"))?;
        let dst_root = TempDir::new()?;
        let dst = dst_root.path().join("copy");

        copy_tree(src.path(), &dst)?;
        let meta = fs::symlink_metadata(dst.join("link.txt"))?;
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(dst.join("link.txt"))?, PathBuf::from("target.txt"));
        Ok(())
    }
}
