use fingerprint_core::config::AnalysisConfig;
use fingerprint_core::model::ModelError;
use fingerprint_core::parser::{derive_listing_name, parse_listing, ParseError};

const LISTING: &str = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm


Disassembly of section .text:

00008000 <start>:
    8000:\te1a00000 \tmov\tr0, r0
    8004:\teb000001 \tbl\t8010 <helper>
    8008:\te1a00000 \tmov\tr0, r0

00008010 <helper>:
    8010:\te1a01001 \tmov\tr1, r1
    8014:\te12fff1e \tbx\tlr
";

#[test]
fn builds_sections_blocks_and_instructions() {
    let files = parse_listing(LISTING, &AnalysisConfig::default()).expect("parse listing");
    assert_eq!(files.len(), 1);

    let file = &files[0];
    assert_eq!(file.name, "armv7_libdemo.so_client");
    assert_eq!(file.file_type, "elf32-littlearm");

    let section = file.section(".text").expect("section exists");
    assert_eq!(section.base_address, 0x8000);
    assert_eq!(section.instruction_count, 5);
    assert_eq!(section.branch_count, 1);
    assert_eq!(section.blocks().len(), 2);

    let start = section.block(0x8000).expect("start block");
    assert_eq!(start.label, "start");
    assert_eq!(start.offset, 0);
    assert_eq!(start.instructions.len(), 3);
    assert_eq!(start.branches.len(), 1);

    let helper = section.block(0x8010).expect("helper block");
    assert_eq!(helper.offset, 0x10);
    assert_eq!(helper.instructions.len(), 2);
    assert!(helper.branches.is_empty(), "bx is not in the default branch set");
}

#[test]
fn instruction_offsets_are_block_relative() {
    let files = parse_listing(LISTING, &AnalysisConfig::default()).unwrap();
    let section = files[0].section(".text").unwrap();

    let start = section.block(0x8000).unwrap();
    let offsets: Vec<i64> = start.instructions.iter().map(|i| i.offset).collect();
    assert_eq!(offsets, vec![0, 4, 8]);

    let bl = &start.instructions[1];
    assert_eq!(bl.mnemonic, "bl");
    let branch = bl.branch.as_ref().expect("bl carries branch detail");
    assert_eq!(branch.target_address, 0x8010);
    // Target offset is relative to the *source* block, not the target's own.
    assert_eq!(branch.target_offset, 0x10);
    assert_eq!(branch.label, "helper");
}

#[test]
fn block_sizes_follow_both_sizing_rules() {
    let files = parse_listing(LISTING, &AnalysisConfig::default()).unwrap();
    let section = files[0].section(".text").unwrap();

    // Mid-stream: start was back-filled from helper's address.
    assert_eq!(section.block(0x8000).unwrap().size, 0x10);
    // End of input: the final block is sized against the one before it,
    // not against a (nonexistent) successor.
    assert_eq!(section.block(0x8010).unwrap().size, 0x10);
}

#[test]
fn single_block_file_keeps_size_zero() {
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00008000 <only>:
    8000:\te1a00000 \tmov\tr0, r0
";
    let files = parse_listing(listing, &AnalysisConfig::default()).unwrap();
    let section = files[0].section(".text").unwrap();
    assert_eq!(section.block(0x8000).unwrap().size, 0);
}

#[test]
fn minimal_listing_yields_expected_offset_list() {
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00000000 <foo>:
    0:\te1a00000 \tmov\tr0, r0
";
    let mut config = AnalysisConfig::default();
    config.branch_ops.clear();

    let files = parse_listing(listing, &config).unwrap();
    let file = &files[0];
    assert_eq!(file.sections().len(), 1);

    let section = file.section(".text").unwrap();
    assert_eq!(section.blocks().len(), 1);
    let block = section.block(0).unwrap();
    assert_eq!(block.offset, 0);
    assert_eq!(block.instructions.len(), 1);

    let insn = &block.instructions[0];
    assert_eq!(insn.mnemonic, "mov");
    assert_eq!(insn.offset, 0);
    assert!(insn.branch.is_none());

    assert_eq!(file.offsets.get("mov"), Some(&[(0, 0, 0)][..]));
}

#[test]
fn unselected_sections_contribute_nothing() {
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00008000 <start>:
    8000:\te1a00000 \tmov\tr0, r0

Disassembly of section .data:

0000a000 <table>:
    a000:\tdeadbeef \tstr\tr0, [r1]
";
    let mut config = AnalysisConfig::default();
    config.select_sections = vec![".text".to_string()];

    let files = parse_listing(listing, &config).unwrap();
    let file = &files[0];
    assert_eq!(file.sections().len(), 1);
    assert!(file.section(".data").is_none());
    assert_eq!(file.section(".text").unwrap().instruction_count, 1);
    assert!(file.offsets.get("str").is_none());
}

#[test]
fn later_sections_keep_base_address_zero() {
    // Only the first code block of a file sets a base address; blocks in a
    // later section are offset against base 0. Fingerprints of existing
    // corpora depend on this, so it is pinned here.
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00008000 <start>:
    8000:\te1a00000 \tmov\tr0, r0

Disassembly of section .plt:

00009000 <plt0>:
    9000:\te1a00000 \tmov\tr0, r0
";
    let files = parse_listing(listing, &AnalysisConfig::default()).unwrap();
    let file = &files[0];

    let plt = file.section(".plt").unwrap();
    assert_eq!(plt.base_address, 0);
    assert_eq!(plt.block(0x9000).unwrap().offset, 0x9000);

    // The cross-section back-fill still sized the last .text block.
    let text = file.section(".text").unwrap();
    assert_eq!(text.block(0x8000).unwrap().size, 0x1000);
}

#[test]
fn undecodable_rows_stay_out_of_the_offset_table() {
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00008000 <start>:
    8000:\te1a00000 \tmov\tr0, r0
    8004:\te7f000f0 \t@\t<UNDEFINED> instruction: 0xe7f000f0
";
    let files = parse_listing(listing, &AnalysisConfig::default()).unwrap();
    let file = &files[0];

    // Recorded in the model...
    let block = file.section(".text").unwrap().block(0x8000).unwrap();
    assert_eq!(block.instructions.len(), 2);
    assert_eq!(block.instructions[1].mnemonic, "@");
    // ...but excluded from fingerprint accumulation.
    assert!(file.offsets.get("@").is_none());
    assert_eq!(file.offsets.len(), 1);
}

#[test]
fn duplicate_block_address_aborts_the_parse() {
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00008000 <a>:
    8000:\te1a00000 \tmov\tr0, r0

00008000 <b>:
    8000:\te1a00000 \tmov\tr0, r0
";
    let err = parse_listing(listing, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::Model(ModelError::DuplicateBlock { address: 0x8000, .. })
    ));
}

#[test]
fn each_file_header_starts_a_new_file() {
    let listing = "\
demo/armv7/client/libdemo.so:     file format elf32-littlearm

Disassembly of section .text:

00008000 <start>:
    8000:\te1a00000 \tmov\tr0, r0

demo/armv7/server/libdemod.so:     file format elf32-littlearm

Disassembly of section .text:

00004000 <entry>:
    4000:\te1a00000 \tmov\tr0, r0
";
    let files = parse_listing(listing, &AnalysisConfig::default()).unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "armv7_libdemo.so_client");
    assert_eq!(files[1].name, "armv7_libdemod.so_server");

    // The second file's first block sets its own section base.
    assert_eq!(files[1].section(".text").unwrap().base_address, 0x4000);
    assert_eq!(files[1].offsets.get("mov"), Some(&[(0, 0, 0)][..]));
}

#[test]
fn raw_opcode_key_buckets_by_squeezed_hex() {
    use fingerprint_core::config::OpcodeKey;

    let mut config = AnalysisConfig::default();
    config.opcode_key = OpcodeKey::RawOpcode;

    let files = parse_listing(LISTING, &config).unwrap();
    let file = &files[0];
    assert_eq!(file.offsets.get("e1a00000"), Some(&[(0, 0, 0), (0, 8, 0)][..]));
    assert!(file.offsets.get("mov").is_none());
}

#[test]
fn malformed_header_is_a_structural_error() {
    let listing = "libdemo.so:     file format elf32-littlearm\n";
    assert!(matches!(
        parse_listing(listing, &AnalysisConfig::default()),
        Err(ParseError::MalformedHeader(_))
    ));
}

#[test]
fn derive_listing_name_reads_only_the_header() {
    let name = derive_listing_name(LISTING).expect("well-formed header");
    assert_eq!(name.as_deref(), Some("armv7_libdemo.so_client"));

    assert_eq!(derive_listing_name("no header here\n").unwrap(), None);
}
