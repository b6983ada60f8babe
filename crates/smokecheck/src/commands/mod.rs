//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod checks;
pub mod smoke;

/// Error carrying the process exit code of a failed check run
///
/// `main` downcasts to this and exits with the code instead of printing an
/// error, since the harness has already reported every failure.
#[derive(Debug)]
pub struct ChecksFailed(pub i32);

impl std::fmt::Display for ChecksFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Exit with code {} due to failed checks", self.0)
    }
}

impl std::error::Error for ChecksFailed {}
