//! Canonical hashing of per-opcode offset patterns.
//!
//! An opcode's fingerprint is the SHA-256 digest of its ordered offset-triple
//! list, serialized as compact JSON: `[[0,0,0],[0,4,16]]`, an array of
//! arrays with no whitespace. The encoding is purely positional:
//! two files with the same instruction layout hash identically regardless of
//! absolute addresses, and any positional or ordering difference changes the
//! digest.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::{DisasmFile, OffsetTriple};

/// One row of a feature table: opcode key and its fingerprint digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRow {
    pub opcode: String,
    pub digest: String,
}

/// Serialize an offset list into its canonical form.
///
/// Compact JSON of integer arrays is already deterministic; keeping it as the
/// literal encoding preserves digest compatibility with feature tables built
/// by earlier tooling.
pub fn canonical_form(offsets: &[OffsetTriple]) -> Result<String, serde_json::Error> {
    serde_json::to_string(offsets)
}

/// SHA-256 of the canonical form, as a 64-character lowercase hex digest.
pub fn hash_offset_list(offsets: &[OffsetTriple]) -> Result<String, serde_json::Error> {
    let canonical = canonical_form(offsets)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(format!("{digest:x}"))
}

/// Fingerprint every opcode of a parsed file, in first-encounter order.
pub fn fingerprint_file(file: &DisasmFile) -> Result<Vec<FeatureRow>, serde_json::Error> {
    let mut rows = Vec::with_capacity(file.offsets.len());
    for (opcode, offsets) in file.offsets.iter() {
        rows.push(FeatureRow { opcode: opcode.to_string(), digest: hash_offset_list(offsets)? });
    }
    Ok(rows)
}
