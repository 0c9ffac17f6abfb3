//! Analysis configuration loaded from a YAML file.
//!
//! The configuration controls three things:
//! - which mnemonics count as control-transfer (branch) instructions,
//! - which sections of a listing are analyzed (empty list = all sections),
//! - whether instructions are bucketed by mnemonic or by raw opcode bytes.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Branch mnemonics used when a config file provides none.
///
/// These are the ARM/Thumb call and branch forms emitted by the toolchains
/// whose listings this crate was built against.
pub const DEFAULT_BRANCH_OPS: &[&str] = &[
    "b", "bl", "blcc", "blcs", "ble.n", "ble.w", "bleq", "blge", "blls", "bllt", "blmi", "blne",
    "bls.n", "bls.w", "blt.n", "blt.w", "blvs", "blx",
];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Which value buckets instructions for fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpcodeKey {
    /// First whitespace-delimited token of the assembly text (e.g. `mov`).
    #[default]
    Mnemonic,
    /// Raw opcode hex string with internal spaces removed (e.g. `e1a00000`).
    RawOpcode,
}

/// Settings for parsing and fingerprinting a disassembly listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Mnemonics treated as control-transfer instructions.
    pub branch_ops: HashSet<String>,
    /// Section names to analyze. Empty means every section is included.
    pub select_sections: Vec<String>,
    /// Bucketing key for the fingerprint engine.
    pub opcode_key: OpcodeKey,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            branch_ops: DEFAULT_BRANCH_OPS.iter().map(|s| s.to_string()).collect(),
            select_sections: Vec::new(),
            opcode_key: OpcodeKey::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        serde_yaml::from_str(&body)
            .map_err(|source| ConfigError::Yaml { path: path.display().to_string(), source })
    }

    /// Whether instructions in `section` should be analyzed.
    pub fn section_selected(&self, section: &str) -> bool {
        self.select_sections.is_empty() || self.select_sections.iter().any(|s| s == section)
    }

    /// Whether `mnemonic` names a control-transfer instruction.
    pub fn is_branch_op(&self, mnemonic: &str) -> bool {
        self.branch_ops.contains(mnemonic)
    }
}
