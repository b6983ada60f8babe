//! Core library for the smokecheck CLI
//!
//! This crate contains the check harness (counters, probes, reporting), suite
//! file loading, feature tests, and the template smoke driver, along with
//! logging and error handling shared with the binary.

pub mod errors;
pub mod features;
pub mod harness;
pub mod logging;
pub mod probe;
pub mod process;
pub mod smoke;
pub mod suite;
pub mod templates;
pub mod versions;
pub mod workspace;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
