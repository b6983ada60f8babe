//! Template option configuration
//!
//! A devcontainer template declares options in `devcontainer-template.json`
//! and references them in its files as `${templateOption:<key>}`. Before a
//! template can be brought up for smoke testing, every such token is replaced
//! by the option's declared default.

use crate::errors::{Result, TemplateError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Template metadata file name
pub const TEMPLATE_METADATA_FILE: &str = "devcontainer-template.json";

static UNRESOLVED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{templateOption:([^}]*)\}").expect("placeholder pattern is valid")
});

/// Template metadata structure representing devcontainer-template.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    /// Template identifier (required)
    pub id: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Template options keyed by option id; `null` reads as no options
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: BTreeMap<String, TemplateOption>,
}

fn null_as_empty<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, TemplateOption>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// One declared template option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOption {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub proposals: Option<Vec<Value>>,

    #[serde(default, rename = "enum")]
    pub choices: Option<Vec<Value>>,
}

impl TemplateOption {
    /// Text substituted for this option, `None` when there is no usable default
    ///
    /// Strings are used verbatim; blank strings and `null` count as missing.
    /// Other JSON values are rendered as JSON text (`true`, `3`).
    pub fn default_text(&self) -> Option<String> {
        match self.default.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl TemplateMetadata {
    /// Validate the template metadata
    pub fn validate(&self) -> std::result::Result<(), TemplateError> {
        if self.id.is_empty() {
            return Err(TemplateError::Validation {
                message: "Template id is required and cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Placeholder token for option `key`
pub fn placeholder(key: &str) -> String {
    format!("${{templateOption:{}}}", key)
}

/// Parse template metadata from a devcontainer-template.json file
#[instrument(level = "debug")]
pub fn parse_template_metadata(path: &Path) -> Result<TemplateMetadata> {
    if !path.exists() {
        return Err(TemplateError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(path).map_err(TemplateError::Io)?;
    let metadata: TemplateMetadata =
        serde_json::from_str(&content).map_err(|e| TemplateError::Parsing {
            message: e.to_string(),
        })?;

    debug!(
        "Parsed template: id={}, options={}",
        metadata.id,
        metadata.options.len()
    );
    metadata.validate()?;
    Ok(metadata)
}

/// Summary of a configuration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureReport {
    /// Option key -> number of files it was substituted into
    pub replaced: BTreeMap<String, usize>,
    /// Files still containing a `${templateOption:...}` token afterwards
    pub unresolved: Vec<PathBuf>,
}

/// Replace every `${templateOption:<key>}` under `workspace_dir` with defaults
///
/// Reads `devcontainer-template.json` from the workspace root. Templates
/// without options are left untouched.
#[instrument(level = "debug")]
pub fn configure_template_options(workspace_dir: &Path) -> Result<ConfigureReport> {
    let metadata = parse_template_metadata(&workspace_dir.join(TEMPLATE_METADATA_FILE))?;
    let mut report = ConfigureReport::default();
    if metadata.options.is_empty() {
        return Ok(report);
    }

    let template_name = workspace_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| metadata.id.clone());
    debug!("Configuring template options for '{}'", template_name);

    for (key, option) in &metadata.options {
        let value = option
            .default_text()
            .ok_or_else(|| TemplateError::MissingDefault {
                template: template_name.clone(),
                option: key.clone(),
            })?;
        let token = placeholder(key);
        debug!("Replacing '{}' with '{}'", token, value);
        let count = replace_in_files(workspace_dir, &token, &value)?;
        report.replaced.insert(key.clone(), count);
    }

    report.unresolved = find_unresolved(workspace_dir)?;
    for path in &report.unresolved {
        warn!(
            "Unresolved template option placeholder remains in {}",
            path.display()
        );
    }
    Ok(report)
}

/// Literal byte-level replacement across all regular files under `root`
///
/// Returns the number of files changed. Symlinks are not followed.
pub fn replace_in_files(root: &Path, search: &str, replacement: &str) -> Result<usize> {
    let mut changed = 0;
    let needle = search.as_bytes();
    visit_files(root, &mut |path: &Path| -> std::result::Result<(), TemplateError> {
        let content = fs::read(path).map_err(TemplateError::Io)?;
        if let Some(updated) = replace_bytes(&content, needle, replacement.as_bytes()) {
            fs::write(path, updated).map_err(|e| TemplateError::FileOperation {
                message: format!("Failed to write {}: {}", path.display(), e),
            })?;
            debug!("Replaced in: {}", path.strip_prefix(root).unwrap_or(path).display());
            changed += 1;
        }
        Ok(())
    })?;
    Ok(changed)
}

fn find_unresolved(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    visit_files(root, &mut |path: &Path| -> std::result::Result<(), TemplateError> {
        let content = fs::read(path).map_err(TemplateError::Io)?;
        let text = String::from_utf8_lossy(&content);
        if UNRESOLVED_PLACEHOLDER.is_match(&text) {
            found.push(path.to_path_buf());
        }
        Ok(())
    })?;
    Ok(found)
}

fn visit_files(
    dir: &Path,
    visit: &mut dyn FnMut(&Path) -> std::result::Result<(), TemplateError>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(TemplateError::Io)?;
    for entry in entries {
        let entry = entry.map_err(TemplateError::Io)?;
        let file_type = entry.file_type().map_err(TemplateError::Io)?;
        let path = entry.path();
        if file_type.is_dir() {
            visit_files(&path, visit)?;
        } else if file_type.is_file() {
            visit(&path)?;
        }
    }
    Ok(())
}

/// Replace all occurrences of `needle`; `None` when there are none
fn replace_bytes(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Option<Vec<u8>> {
    if needle.is_empty() {
        return None;
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut found = false;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        found = true;
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }
    if !found {
        return None;
    }
    out.extend_from_slice(rest);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replace_bytes() {
        assert_eq!(replace_bytes(b"abc", b"x", b"y"), None);
        assert_eq!(
            replace_bytes(b"a${k}b${k}", b"${k}", b"--"),
            Some(b"a--b--".to_vec())
        );
        assert_eq!(replace_bytes(b"abc", b"", b"y"), None);
        assert_eq!(
            replace_bytes(&[0xff, b'x', 0xfe], b"x", b"yy"),
            Some(vec![0xff, b'y', b'y', 0xfe])
        );
    }

    #[test]
    fn test_default_text() {
        let opt = |v: Option<Value>| TemplateOption {
            kind: None,
            description: None,
            default: v,
            proposals: None,
            choices: None,
        };
        assert_eq!(opt(None).default_text(), None);
        assert_eq!(opt(Some(Value::Null)).default_text(), None);
        assert_eq!(opt(Some(Value::String("  ".into()))).default_text(), None);
        assert_eq!(
            opt(Some(Value::String("3.12".into()))).default_text(),
            Some("3.12".to_string())
        );
        assert_eq!(
            opt(Some(Value::Bool(true))).default_text(),
            Some("true".to_string())
        );
        assert_eq!(
            opt(Some(serde_json::json!(3))).default_text(),
            Some("3".to_string())
        );
    }

    #[test]
    fn test_parse_template_metadata() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(TEMPLATE_METADATA_FILE);
        fs::write(
            &path,
            r#"{
  "id": "python",
  "version": "1.0.0",
  "name": "Python",
  "options": {
    "imageVariant": { "type": "string", "default": "3.12-bookworm", "proposals": ["3.12-bookworm"] },
    "installTools": { "type": "boolean", "default": true }
  }
}"#,
        )?;
        let metadata = parse_template_metadata(&path)?;
        assert_eq!(metadata.id, "python");
        assert_eq!(metadata.options.len(), 2);
        assert_eq!(
            metadata.options["imageVariant"].kind.as_deref(),
            Some("string")
        );
        Ok(())
    }

    #[test]
    fn test_parse_rejects_empty_id() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(TEMPLATE_METADATA_FILE);
        fs::write(&path, r#"{ "id": "" }"#)?;
        let err = parse_template_metadata(&path).unwrap_err();
        assert!(err.to_string().contains("Template id is required"));
        Ok(())
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let err = parse_template_metadata(Path::new("/nonexistent/devcontainer-template.json"))
            .unwrap_err();
        assert!(err.to_string().contains("Template metadata file not found"));
    }

    #[test]
    fn test_configure_replaces_nested_files() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let ws = dir.path().join("python");
        fs::create_dir_all(ws.join(".devcontainer"))?;
        fs::write(
            ws.join(TEMPLATE_METADATA_FILE),
            r#"{ "id": "python", "options": { "imageVariant": { "type": "string", "default": "3.12" } } }"#,
        )?;
        fs::write(
            ws.join(".devcontainer/devcontainer.json"),
            r#"{ "image": "python:${templateOption:imageVariant}" }"#,
        )?;
        fs::write(ws.join("README.md"), "no tokens here")?;

        let report = configure_template_options(&ws)?;
        assert_eq!(report.replaced.get("imageVariant"), Some(&1));
        assert!(report.unresolved.is_empty());
        assert_eq!(
            fs::read_to_string(ws.join(".devcontainer/devcontainer.json"))?,
            r#"{ "image": "python:3.12" }"#
        );
        assert_eq!(fs::read_to_string(ws.join("README.md"))?, "no tokens here");
        Ok(())
    }

    #[test]
    fn test_configure_reports_unresolved_tokens() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let ws = dir.path().join("node");
        fs::create_dir_all(&ws)?;
        fs::write(
            ws.join(TEMPLATE_METADATA_FILE),
            r#"{ "id": "node", "options": { "a": { "default": "1" } } }"#,
        )?;
        fs::write(ws.join("Dockerfile"), "FROM node:${templateOption:b}\n")?;

        let report = configure_template_options(&ws)?;
        assert_eq!(report.replaced.get("a"), Some(&0));
        assert_eq!(report.unresolved, vec![ws.join("Dockerfile")]);
        Ok(())
    }

    #[test]
    fn test_configure_missing_default_is_error() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let ws = dir.path().join("go");
        fs::create_dir_all(&ws)?;
        fs::write(
            ws.join(TEMPLATE_METADATA_FILE),
            r#"{ "id": "go", "options": { "goVersion": { "type": "string", "default": "" } } }"#,
        )?;

        let err = configure_template_options(&ws).unwrap_err();
        assert!(matches!(
            err,
            crate::errors::SmokeError::Template(TemplateError::MissingDefault { .. })
        ));
        assert!(err
            .to_string()
            .contains("Template 'go' is missing a default value for option 'goVersion'"));
        Ok(())
    }

    #[test]
    fn test_configure_without_options_is_noop() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join(TEMPLATE_METADATA_FILE), r#"{ "id": "plain" }"#)?;
        let report = configure_template_options(dir.path())?;
        assert_eq!(report, ConfigureReport::default());
        Ok(())
    }

    #[test]
    fn test_null_options_are_treated_as_empty() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join(TEMPLATE_METADATA_FILE),
            r#"{ "id": "x", "options": null }"#,
        )?;
        fs::write(dir.path().join("Dockerfile"), "FROM debian\n")?;

        let report = configure_template_options(dir.path())?;
        assert_eq!(report, ConfigureReport::default());
        assert_eq!(fs::read_to_string(dir.path().join("Dockerfile"))?, "FROM debian\n");
        Ok(())
    }
}
