//! Per-opcode rarity statistics across code blocks and branch targets.
//!
//! This is the lighter-weight traversal: no `Instruction`/`Branch` objects
//! are built, only address sets. For every opcode the analyzer records which
//! code blocks it occurs in and which branch targets it reaches, alongside
//! the global universes of both. The reported ratio is the *complement*
//! (fraction of the universe the opcode does NOT touch): 0.0 means the opcode
//! appears everywhere, 1.0 means it appears nowhere. Callers use this as a
//! rarity/selectivity score; the polarity is part of the contract.
//!
//! Accumulator state is owned by the analyzer instance and deliberately
//! persists across multiple `scan` calls so corpus-wide statistics can be
//! built; use a fresh instance for each independent corpus run.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::model::ModelError;
use crate::parser::{classify, is_undecodable, opcode_key, parse_branch, Line, ParseError};

/// Error type for coverage reporting.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Opcodes were recorded but the code-block universe is empty.
    #[error("no code blocks recorded; cb_coverage is undefined")]
    EmptyBlockUniverse,

    /// Opcodes were recorded but the branch-target universe is empty.
    #[error("no branch targets recorded; branch_coverage is undefined")]
    EmptyTargetUniverse,
}

/// Complement ratios per opcode, both in [0.0, 1.0].
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub cb_coverage: HashMap<String, f64>,
    pub branch_coverage: HashMap<String, f64>,
}

/// Progress callback: `(lines processed, total lines)`. UI responsiveness
/// only; it has no effect on the computed result.
pub type ProgressFn<'a> = dyn FnMut(usize, usize) + 'a;

/// Accumulates opcode/block/target sets across one or more listings.
#[derive(Debug, Default)]
pub struct CoverageAnalyzer {
    op_blocks: HashMap<String, HashSet<u64>>,
    op_targets: HashMap<String, HashSet<u64>>,
    all_blocks: HashSet<u64>,
    all_targets: HashSet<u64>,
}

impl CoverageAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one listing, folding its opcode occurrences into the accumulator.
    ///
    /// Returns the derived file name from the listing header, when present.
    /// `progress` is invoked once per input line, including ignorable ones.
    pub fn scan(
        &mut self,
        content: &str,
        config: &AnalysisConfig,
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<Option<String>, ParseError> {
        let total_lines = content.lines().count();
        let mut file_name: Option<String> = None;
        let mut file_ordinal: usize = 0;
        let mut in_selected_section = false;
        let mut current_section = String::new();
        let mut current_block: Option<u64> = None;
        // Duplicate-address detection per (file, section), matching the
        // structural invariant of the full parser.
        let mut seen_blocks: HashMap<(usize, String), HashSet<u64>> = HashMap::new();

        for (idx, raw_line) in content.lines().enumerate() {
            if let Some(progress) = progress.as_deref_mut() {
                progress(idx + 1, total_lines);
            }

            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            match classify(line)? {
                Line::FileHeader { name, .. } => {
                    if file_name.is_none() {
                        file_name = Some(name);
                    }
                    file_ordinal += 1;
                    in_selected_section = false;
                    current_block = None;
                }

                Line::SectionHeader { name } => {
                    in_selected_section = file_ordinal > 0 && config.section_selected(&name);
                    current_section = name;
                    current_block = None;
                }

                Line::BlockLabel { address, .. } => {
                    if !in_selected_section {
                        continue;
                    }
                    let seen = seen_blocks
                        .entry((file_ordinal, current_section.clone()))
                        .or_default();
                    if !seen.insert(address) {
                        return Err(ParseError::Model(ModelError::DuplicateBlock {
                            section: current_section.clone(),
                            address,
                        }));
                    }
                    current_block = Some(address);
                }

                Line::Instruction(parts) => {
                    if !in_selected_section {
                        continue;
                    }
                    let Some(block_address) = current_block else {
                        continue;
                    };

                    let key = opcode_key(&parts.asm, &parts.raw_opcode, config.opcode_key);
                    if is_undecodable(&key, &parts.asm) {
                        continue;
                    }

                    self.op_blocks.entry(key.clone()).or_default().insert(block_address);
                    self.all_blocks.insert(block_address);

                    if let Some(branch) = parse_branch(line, config) {
                        self.op_targets.entry(key).or_default().insert(branch.target_address);
                        self.all_targets.insert(branch.target_address);
                    }
                }

                Line::Ignored => {}
            }
        }

        Ok(file_name)
    }

    /// Compute the complement ratios for everything accumulated so far.
    pub fn report(&self) -> Result<CoverageReport, CoverageError> {
        let mut report = CoverageReport::default();

        for (opcode, blocks) in &self.op_blocks {
            if self.all_blocks.is_empty() {
                return Err(CoverageError::EmptyBlockUniverse);
            }
            let untouched = self.all_blocks.difference(blocks).count();
            report
                .cb_coverage
                .insert(opcode.clone(), untouched as f64 / self.all_blocks.len() as f64);
        }

        for (opcode, targets) in &self.op_targets {
            if self.all_targets.is_empty() {
                return Err(CoverageError::EmptyTargetUniverse);
            }
            let untouched = self.all_targets.difference(targets).count();
            report
                .branch_coverage
                .insert(opcode.clone(), untouched as f64 / self.all_targets.len() as f64);
        }

        Ok(report)
    }

    /// Number of distinct code blocks seen so far, across all scans.
    pub fn block_universe_len(&self) -> usize {
        self.all_blocks.len()
    }

    /// Number of distinct branch targets seen so far, across all scans.
    pub fn target_universe_len(&self) -> usize {
        self.all_targets.len()
    }
}
