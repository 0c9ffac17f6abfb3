//! `extract` command: listing in, feature table out.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fingerprint_core::features::write_feature_table;
use fingerprint_core::fingerprint::fingerprint_file;
use fingerprint_core::parser::parse_listing;

use crate::{load_analysis_config, read_listing};

/// Parse a disassembly listing and write its opcode fingerprints as a CSV
/// feature table. With `--json`, also dump the raw offset lists.
pub fn extract_command(
    input: &str,
    output: &str,
    json: Option<String>,
    config_path: &str,
) -> Result<()> {
    let config = load_analysis_config(config_path)?;
    let content = read_listing(Path::new(input))?;

    let files = parse_listing(&content, &config)
        .with_context(|| format!("Failed to parse listing at {input}"))?;
    let file = files
        .first()
        .ok_or_else(|| anyhow!("No `file format` header found in {input}"))?;
    if files.len() > 1 {
        tracing::warn!(
            count = files.len(),
            "listing contains multiple files; extracting features for the first only"
        );
    }

    let rows = fingerprint_file(file).context("Failed to serialize offset lists")?;
    write_feature_table(Path::new(output), &rows)
        .with_context(|| format!("Failed to write feature table at {output}"))?;

    if let Some(json_path) = json {
        let mut map = serde_json::Map::new();
        for (opcode, offsets) in file.offsets.iter() {
            map.insert(opcode.to_string(), serde_json::to_value(offsets)?);
        }
        let pretty = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
        fs::write(&json_path, pretty)
            .with_context(|| format!("Failed to write offset dump at {json_path}"))?;
    }

    println!("Extracted features:");
    println!("  File: {} ({})", file.name, file.file_type);
    println!("  Sections: {}", file.sections().len());
    println!("  Opcodes: {}", rows.len());
    println!("  Table: {output}");

    Ok(())
}
