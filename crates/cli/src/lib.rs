//! Shared helpers for the asm-fingerprint CLI.
//!
//! All substantive logic lives in `fingerprint-core`; this crate only loads
//! inputs, wires configuration, and formats output.

pub mod commands;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fingerprint_core::config::AnalysisConfig;

/// Read a disassembly listing into a UTF-8 string.
///
/// A `.zst` input is transparently decompressed; listings are large and are
/// commonly stored compressed next to their feature tables.
pub fn read_listing(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read listing at {}", path.display()))?;

    let bytes = if path.extension().and_then(|e| e.to_str()) == Some("zst") {
        zstd::stream::decode_all(&bytes[..])
            .with_context(|| format!("Failed to decompress listing at {}", path.display()))?
    } else {
        bytes
    };

    String::from_utf8(bytes)
        .with_context(|| format!("Listing at {} is not valid UTF-8", path.display()))
}

/// Load the analysis configuration, falling back to built-in defaults when
/// the file does not exist.
pub fn load_analysis_config(path: &str) -> Result<AnalysisConfig> {
    let config_path = Path::new(path);
    if !config_path.exists() {
        tracing::debug!(path, "config file not found; using built-in defaults");
        return Ok(AnalysisConfig::default());
    }
    AnalysisConfig::load(config_path)
        .with_context(|| format!("Failed to load config at {}", config_path.display()))
}
