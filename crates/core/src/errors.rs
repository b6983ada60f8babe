//! Error types and handling
//!
//! The check harness itself never raises: a failing check is recorded and
//! surfaced only through the final report. Everything around the harness
//! (suite loading, template preparation, smoke orchestration) uses the
//! domain-specific enums below, wrapped in [`SmokeError`] for unified handling.

use thiserror::Error;

/// Suite file errors
#[derive(Error, Debug)]
pub enum SuiteError {
    /// Suite file parsing error
    #[error("Failed to parse suite file {path}: {message}")]
    Parsing { path: String, message: String },

    /// Suite validation error
    #[error("Suite validation error: {message}")]
    Validation { message: String },

    /// Suite file I/O error
    #[error("Failed to read suite file")]
    Io(#[from] std::io::Error),

    /// Suite file not found
    #[error("Suite file not found: {path}")]
    NotFound { path: String },
}

/// Template preparation errors
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template metadata parsing error
    #[error("Failed to parse template metadata: {message}")]
    Parsing { message: String },

    /// Template metadata validation error
    #[error("Template validation error: {message}")]
    Validation { message: String },

    /// Template metadata file not found
    #[error("Template metadata file not found: {path}")]
    NotFound { path: String },

    /// Template source directory not found
    #[error("Source template directory not found: {path}")]
    SourceNotFound { path: String },

    /// An option placeholder has no usable default
    #[error("Template '{template}' is missing a default value for option '{option}'")]
    MissingDefault { template: String, option: String },

    /// File operation error during workspace preparation
    #[error("Template file operation error: {message}")]
    FileOperation { message: String },

    /// Template I/O error
    #[error("Template I/O error")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error")]
    Json(#[from] serde_json::Error),
}

/// External process errors raised by the smoke driver
#[derive(Error, Debug)]
pub enum ProcessError {
    /// A required tool does not resolve on PATH
    #[error("{tool} is required but was not found on PATH")]
    ToolMissing { tool: String },

    /// The process could not be spawned
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully
    #[error("{program} failed with exit code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A smoke action failed for a reason reported by the tool's output
    #[error("{message}")]
    Action { message: String },
}

/// Internal/generic fallback errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Generic internal error
    #[error("Internal error: {message}")]
    Generic { message: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum SmokeError {
    /// Suite file errors
    #[error("Suite error: {0}")]
    Suite(#[from] SuiteError),

    /// Template preparation errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// External process errors
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Internal/generic errors
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
}

/// Convenience type alias for Results with SmokeError
pub type Result<T> = std::result::Result<T, SmokeError>;
