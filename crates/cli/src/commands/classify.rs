//! `classify` command: match a listing against a corpus of feature tables.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fingerprint_core::classify::classify;
use fingerprint_core::features::load_corpus;
use fingerprint_core::fingerprint::fingerprint_file;
use fingerprint_core::parser::parse_listing;

use crate::{load_analysis_config, read_listing};

/// Fingerprint a listing and report the closest project in `features_dir`.
pub fn classify_command(
    input: &str,
    features_dir: &str,
    json: bool,
    config_path: &str,
) -> Result<()> {
    let config = load_analysis_config(config_path)?;
    let content = read_listing(Path::new(input))?;

    let files = parse_listing(&content, &config)
        .with_context(|| format!("Failed to parse listing at {input}"))?;
    let file = files
        .first()
        .ok_or_else(|| anyhow!("No `file format` header found in {input}"))?;

    let target: HashMap<String, String> = fingerprint_file(file)
        .context("Failed to serialize offset lists")?
        .into_iter()
        .map(|row| (row.opcode, row.digest))
        .collect();

    let corpus = load_corpus(Path::new(features_dir))
        .with_context(|| format!("Failed to load feature tables from {features_dir}"))?;
    let result = classify(&target, &corpus);

    if json {
        let serialized =
            serde_json::to_string_pretty(&result).context("Failed to serialize match result")?;
        println!("{}", serialized);
        return Ok(());
    }

    match result {
        Some(m) if m.is_exact() => {
            println!("Exact match: {} ({}/{} fingerprints)", m.project, m.matched, m.total);
        }
        Some(m) => {
            println!("Closest project: {}", m.project);
            println!("  Similarity: {:.2}% ({}/{} fingerprints)", m.similarity * 100.0, m.matched, m.total);
        }
        None => {
            println!("No match: corpus at {features_dir} contains no usable feature tables.");
        }
    }

    Ok(())
}
