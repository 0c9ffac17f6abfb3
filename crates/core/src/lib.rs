//! fingerprint-core
//!
//! Core library for opcode-fingerprint extraction from ARM disassembly listings.
//!
//! This crate defines the internal IR (model), the objdump-listing parser, the
//! positional fingerprint engine, the similarity classifier, the coverage
//! analyzer, and the feature-table persistence helpers.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, batch pipelines, etc.).

pub mod classify;
pub mod config;
pub mod coverage;
pub mod features;
pub mod fingerprint;
pub mod model;
pub mod parser;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
