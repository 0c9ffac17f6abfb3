//! Single-pass parser building the `DisasmFile` model from listing text.
//!
//! The builder is a small state machine over classified lines: a file header
//! opens a new file, a section header opens (or skips) a section, a block
//! label opens a code block, and instruction lines attach to the current
//! block. Lines that fit no shape are skipped; the input is best-effort
//! toolchain output, not a grammar.
//!
//! Two sizing rules are deliberately asymmetric:
//! - mid-stream, a new block label back-fills the previous block's size as
//!   `new.address - previous.address`, even across section boundaries;
//! - at end of input, the final block's size is set from the block *before*
//!   it (`final.address - previous.address`), not from any successor.
//! Fingerprints of existing corpora depend on both behaviors.

mod lines;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AnalysisConfig, OpcodeKey};
use crate::model::{Branch, CodeBlock, DisasmFile, Instruction, ModelError};

pub(crate) use lines::{classify, parse_branch, parse_opcode_value, Line};

/// Error type for listing parsing.
///
/// Either variant aborts the file being parsed; the partially built model is
/// discarded, never returned.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The header path does not carry enough tokens to derive the file name.
    #[error("malformed file header line: `{0}`")]
    MalformedHeader(String),

    /// Structural violation while building the model.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Location of a code block inside the file list being built.
#[derive(Debug, Clone, Copy)]
struct BlockRef {
    file: usize,
    section: usize,
    block: usize,
}

/// Parse a whole listing blob into its disassembly files.
///
/// A blob usually holds one file, but concatenated listings are modeled as
/// they come: each `file format` header starts a new `DisasmFile`, in
/// encounter order.
pub fn parse_listing(
    content: &str,
    config: &AnalysisConfig,
) -> Result<Vec<DisasmFile>, ParseError> {
    let mut files: Vec<DisasmFile> = Vec::new();
    let mut current_file: Option<usize> = None;
    // (file index, section index) of the currently selected section.
    let mut current_section: Option<(usize, usize)> = None;
    // Block that instruction lines attach to. Cleared on every section header:
    // an instruction is only valid under a block label of its own section.
    let mut current_block: Option<BlockRef> = None;
    // Most recently created block, target of the mid-stream size back-fill.
    // Unlike `current_block` this survives section headers.
    let mut newest_block: Option<BlockRef> = None;
    // Block created before `newest_block`, used by the end-of-input rule.
    let mut previous_block: Option<BlockRef> = None;
    // Only the first block of a file sets its section's base address.
    let mut base_address_set = false;

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        match classify(line)? {
            Line::FileHeader { name, file_type } => {
                files.push(DisasmFile::new(name, file_type));
                current_file = Some(files.len() - 1);
                current_section = None;
                current_block = None;
                base_address_set = false;
            }

            Line::SectionHeader { name } => {
                current_section = None;
                current_block = None;
                let Some(file_idx) = current_file else {
                    continue;
                };
                if config.section_selected(&name) {
                    let section_idx = files[file_idx].add_section(&name);
                    current_section = Some((file_idx, section_idx));
                } else {
                    debug!(section = %name, "skipping unselected section");
                }
            }

            Line::BlockLabel { address, label } => {
                let Some((file_idx, section_idx)) = current_section else {
                    continue;
                };

                // Back-fill the size of the previously created block.
                if let Some(prev) = newest_block {
                    let block = files[prev.file].section_mut(prev.section).block_mut(prev.block);
                    block.size = address as i64 - block.address as i64;
                }

                if !base_address_set {
                    files[file_idx].section_mut(section_idx).base_address = address;
                    base_address_set = true;
                }

                let base = files[file_idx].sections()[section_idx].base_address;
                let block_idx = files[file_idx]
                    .section_mut(section_idx)
                    .add_block(CodeBlock::new(address, label, base))?;

                previous_block = newest_block.take();
                let created = BlockRef { file: file_idx, section: section_idx, block: block_idx };
                newest_block = Some(created);
                current_block = Some(created);
            }

            Line::Instruction(parts) => {
                if current_section.is_none() {
                    continue;
                }
                let Some(at) = current_block else {
                    warn!(address = parts.address, "instruction before any block label; skipped");
                    continue;
                };

                let (block_address, block_offset) = {
                    let block = &files[at.file].sections()[at.section].blocks()[at.block];
                    (block.address, block.offset)
                };

                let branch = parse_branch(line, config).map(|bp| Branch {
                    address: bp.address,
                    offset: bp.address as i64 - block_address as i64,
                    target_address: bp.target_address,
                    target_offset: bp.target_address as i64 - block_address as i64,
                    opcode: parse_opcode_value(&bp.raw_opcode),
                    mnemonic: bp.mnemonic,
                    label: bp.label,
                });

                let instruction = Instruction {
                    address: parts.address,
                    offset: parts.address as i64 - block_address as i64,
                    opcode: parse_opcode_value(&parts.raw_opcode),
                    mnemonic: parts.asm.split(' ').next().unwrap_or("").to_string(),
                    asm: parts.asm.clone(),
                    comment: parts.comment,
                    branch: branch.clone(),
                };

                let target_offset = branch.as_ref().map(|b| b.target_offset).unwrap_or(0);
                let instruction_offset = instruction.offset;

                {
                    let section = files[at.file].section_mut(at.section);
                    section.instruction_count += 1;
                    if let Some(branch) = branch {
                        section.branch_count += 1;
                        section.block_mut(at.block).branches.push(branch);
                    }
                    section.block_mut(at.block).instructions.push(instruction);
                }

                let key = opcode_key(&parts.asm, &parts.raw_opcode, config.opcode_key);
                if is_undecodable(&key, &parts.asm) {
                    continue;
                }
                files[at.file].offsets.push(&key, (block_offset, instruction_offset, target_offset));
            }

            Line::Ignored => {}
        }
    }

    // End-of-input rule: the final block is sized against the block created
    // before it. Its size was never back-filled by a successor.
    if let (Some(cur), Some(prev)) = (newest_block, previous_block) {
        let prev_address = files[prev.file].sections()[prev.section].blocks()[prev.block].address;
        let block = files[cur.file].section_mut(cur.section).block_mut(cur.block);
        block.size = block.address as i64 - prev_address as i64;
    }

    Ok(files)
}

/// Scan a listing only far enough to derive its file name from the header.
pub fn derive_listing_name(content: &str) -> Result<Option<String>, ParseError> {
    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Line::FileHeader { name, .. } = classify(line)? {
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// The bucketing key for one instruction.
pub(crate) fn opcode_key(asm: &str, raw_opcode: &str, mode: OpcodeKey) -> String {
    match mode {
        OpcodeKey::Mnemonic => asm.split(' ').next().unwrap_or("").to_string(),
        OpcodeKey::RawOpcode => raw_opcode.replace(' ', ""),
    }
}

/// An `@ <UNDEFINED>` row marks bytes the disassembler could not decode.
/// The instruction stays in the model but is excluded from fingerprinting.
pub(crate) fn is_undecodable(key: &str, asm: &str) -> bool {
    key == "@" && asm.split(' ').any(|token| token == "<UNDEFINED>")
}
