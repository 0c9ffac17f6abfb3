//! Core data model (IR) for a parsed disassembly listing.
//!
//! The hierarchy is `DisasmFile` -> `Section` -> `CodeBlock` ->
//! `Instruction` / `Branch`. The whole tree is built in one pass over the
//! listing text and is read-only afterwards; only derived data (fingerprints,
//! coverage ratios) outlives it.
//!
//! All offsets are computed once, relative to the section base or owning code
//! block at the time the entity is created, and are never re-based. Offsets
//! are signed: a branch may target an address below its own block.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Positional record for one instruction occurrence:
/// `(block offset in section, instruction offset in block, branch target offset in block)`.
///
/// The third component is `0` for non-branch instructions. The branch target
/// offset is relative to the *source* block, not the destination block; this
/// convention must not change or fingerprints stop matching existing corpora.
pub type OffsetTriple = (i64, i64, i64);

/// Error type for model construction.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A code block with this start address already exists in the section.
    #[error("code block at {address:#x} already exists in section `{section}`")]
    DuplicateBlock { section: String, address: u64 },
}

/// Control-transfer detail for a branch instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub address: u64,
    /// `address - owning block start address`.
    pub offset: i64,
    pub target_address: u64,
    /// `target_address - owning block start address` (source-relative).
    pub target_offset: i64,
    /// Raw opcode value parsed from the hex byte string (0 when empty).
    pub opcode: u64,
    pub mnemonic: String,
    /// Symbol label of the target, empty when the listing has none.
    pub label: String,
}

/// One disassembled operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub address: u64,
    /// `address - owning block start address`.
    pub offset: i64,
    /// Raw opcode value parsed from the hex byte string (0 when empty).
    pub opcode: u64,
    /// Assembly text with tab fields re-joined by single spaces.
    pub asm: String,
    /// First whitespace-delimited token of `asm`.
    pub mnemonic: String,
    /// Trailing `@ ...` comment, empty when absent.
    pub comment: String,
    /// Present iff the mnemonic is in the configured branch set.
    pub branch: Option<Branch>,
}

/// A labeled contiguous run of instructions (function or basic-block entry).
#[derive(Debug, Clone, Serialize)]
pub struct CodeBlock {
    pub address: u64,
    pub label: String,
    /// `address - section base address` at creation time.
    pub offset: i64,
    /// `next_block.address - address`, back-filled when the next block in the
    /// listing is seen. Stays 0 for a block that is never back-filled.
    pub size: i64,
    pub instructions: Vec<Instruction>,
    /// Branch details of the control-transfer instructions, in encounter order.
    pub branches: Vec<Branch>,
}

impl CodeBlock {
    pub(crate) fn new(address: u64, label: String, section_base: u64) -> Self {
        Self {
            address,
            label,
            offset: address as i64 - section_base as i64,
            size: 0,
            instructions: Vec::new(),
            branches: Vec::new(),
        }
    }
}

/// A named region of the binary, owning its code blocks.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub name: String,
    /// Address of the first code block seen while this section was current,
    /// 0 until set.
    pub base_address: u64,
    pub instruction_count: usize,
    pub branch_count: usize,
    blocks: Vec<CodeBlock>,
    #[serde(skip)]
    block_index: HashMap<u64, usize>,
}

impl Section {
    fn new(name: String) -> Self {
        Self {
            name,
            base_address: 0,
            instruction_count: 0,
            branch_count: 0,
            blocks: Vec::new(),
            block_index: HashMap::new(),
        }
    }

    /// Register a code block. Start addresses are unique within a section;
    /// a duplicate is a structural error, not an overwrite.
    pub(crate) fn add_block(&mut self, block: CodeBlock) -> Result<usize, ModelError> {
        if self.block_index.contains_key(&block.address) {
            return Err(ModelError::DuplicateBlock {
                section: self.name.clone(),
                address: block.address,
            });
        }
        let idx = self.blocks.len();
        self.block_index.insert(block.address, idx);
        self.blocks.push(block);
        Ok(idx)
    }

    /// Code blocks in encounter order.
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Look up a code block by start address.
    pub fn block(&self, address: u64) -> Option<&CodeBlock> {
        self.block_index.get(&address).map(|&idx| &self.blocks[idx])
    }

    pub(crate) fn block_mut(&mut self, idx: usize) -> &mut CodeBlock {
        &mut self.blocks[idx]
    }
}

/// File-scoped, insertion-ordered map from opcode key to the list of offset
/// triples observed for that opcode.
///
/// Order is significant twice over: the triple list order feeds the canonical
/// hash, and the opcode order determines feature-table row order.
#[derive(Debug, Clone, Default)]
pub struct OffsetTable {
    entries: Vec<(String, Vec<OffsetTriple>)>,
    index: HashMap<String, usize>,
}

impl OffsetTable {
    /// Append a triple to the opcode's list, creating the list on first use.
    pub fn push(&mut self, opcode: &str, triple: OffsetTriple) {
        match self.index.get(opcode) {
            Some(&idx) => self.entries[idx].1.push(triple),
            None => {
                self.index.insert(opcode.to_string(), self.entries.len());
                self.entries.push((opcode.to_string(), vec![triple]));
            }
        }
    }

    /// Offset list for one opcode, if any instruction used it.
    pub fn get(&self, opcode: &str) -> Option<&[OffsetTriple]> {
        self.index.get(opcode).map(|&idx| self.entries[idx].1.as_slice())
    }

    /// Iterate entries in first-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[OffsetTriple])> {
        self.entries.iter().map(|(op, list)| (op.as_str(), list.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One parsed disassembly unit.
#[derive(Debug, Clone)]
pub struct DisasmFile {
    /// Synthetic name derived from the header path (see `parser`).
    pub name: String,
    /// Type string from the `file format <TYPE>` header.
    pub file_type: String,
    /// Per-opcode offset lists, cumulative across all sections of this file.
    pub offsets: OffsetTable,
    sections: Vec<Section>,
    section_index: HashMap<String, usize>,
}

impl DisasmFile {
    pub fn new(name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_type: file_type.into(),
            offsets: OffsetTable::default(),
            sections: Vec::new(),
            section_index: HashMap::new(),
        }
    }

    /// Open a section, reusing an existing one with the same name.
    /// Returns the section's index.
    pub(crate) fn add_section(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.section_index.get(name) {
            return idx;
        }
        let idx = self.sections.len();
        self.section_index.insert(name.to_string(), idx);
        self.sections.push(Section::new(name.to_string()));
        idx
    }

    /// Sections in encounter order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.section_index.get(name).map(|&idx| &self.sections[idx])
    }

    pub(crate) fn section_mut(&mut self, idx: usize) -> &mut Section {
        &mut self.sections[idx]
    }
}
