//! `coverage` command: per-opcode rarity ratios for one or more listings.

use std::path::Path;

use anyhow::{Context, Result};
use fingerprint_core::coverage::CoverageAnalyzer;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{load_analysis_config, read_listing};

/// Scan the given listings into one accumulator and print the rarity report.
///
/// Ratios are complements: 0.0 means the opcode touches every code block (or
/// branch target), 1.0 means it touches none.
pub fn coverage_command(
    inputs: &[String],
    json: bool,
    quiet: bool,
    config_path: &str,
) -> Result<()> {
    let config = load_analysis_config(config_path)?;
    let mut analyzer = CoverageAnalyzer::new();

    for input in inputs {
        let content = read_listing(Path::new(input))?;

        let pb = if quiet || json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(content.lines().count() as u64)
        };
        pb.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} lines {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(input.clone());

        let mut update = |done: usize, _total: usize| pb.set_position(done as u64);
        let name = analyzer
            .scan(&content, &config, Some(&mut update))
            .with_context(|| format!("Failed to scan listing at {input}"))?;
        pb.finish_and_clear();

        tracing::debug!(
            input,
            file = name.as_deref().unwrap_or("<unnamed>"),
            blocks = analyzer.block_universe_len(),
            targets = analyzer.target_universe_len(),
            "scanned listing"
        );
    }

    let report = analyzer.report().context("Failed to compute coverage report")?;

    if json {
        let serialized =
            serde_json::to_string_pretty(&report).context("Failed to serialize coverage report")?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Coverage report:");
    println!("  Code blocks: {}", analyzer.block_universe_len());
    println!("  Branch targets: {}", analyzer.target_universe_len());
    println!();
    println!("  {:<12} {:>10} {:>10}", "Opcode", "cb", "branch");

    let mut opcodes: Vec<&String> = report.cb_coverage.keys().collect();
    opcodes.sort();
    for opcode in opcodes {
        let cb = report.cb_coverage[opcode];
        match report.branch_coverage.get(opcode) {
            Some(branch) => println!("  {opcode:<12} {cb:>10.4} {branch:>10.4}"),
            None => println!("  {opcode:<12} {cb:>10.4} {:>10}", "-"),
        }
    }

    Ok(())
}
