use anyhow::Result;
use asm_fingerprint::commands::{classify_command, coverage_command, extract_command, name_command};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// ARM disassembly fingerprinting CLI.
///
/// This CLI is a thin wrapper around `fingerprint-core` (exposed in code as
/// `fingerprint_core`). All substantive logic lives in the library so it can
/// be tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "asm-fingerprint",
    version,
    about = "Fingerprint, classify, and profile ARM disassembly listings",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a disassembly listing and write its opcode feature table.
    ///
    /// Each opcode's block/instruction/target offset triples are hashed into
    /// a SHA-256 fingerprint; the table is a two-column CSV usable as corpus
    /// input for `classify`.
    Extract {
        /// Path to the disassembly listing (`.zst` is decompressed on the fly).
        input: String,

        /// Output path for the CSV feature table.
        #[arg(long, default_value = "features.csv")]
        output: String,

        /// Also dump the raw per-opcode offset triples as JSON to this path.
        #[arg(long)]
        json: Option<String>,

        /// Analysis config file. Built-in defaults are used when missing.
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },

    /// Match a listing against a directory of feature tables.
    ///
    /// Reports the project with the highest fraction of exactly reproduced
    /// fingerprints; ties go to the first table in file-name order.
    Classify {
        /// Path to the disassembly listing (`.zst` is decompressed on the fly).
        input: String,

        /// Directory containing `*.csv` feature tables.
        #[arg(long)]
        features: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Analysis config file. Built-in defaults are used when missing.
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },

    /// Compute per-opcode rarity ratios across one or more listings.
    ///
    /// All listings feed a single accumulator, so the report reflects the
    /// combined universe of code blocks and branch targets.
    Coverage {
        /// Paths to disassembly listings (`.zst` is decompressed on the fly).
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Suppress the progress bar.
        #[arg(long, default_value_t = false)]
        quiet: bool,

        /// Analysis config file. Built-in defaults are used when missing.
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },

    /// Print the canonical file name derived from a listing's header path.
    Name {
        /// Path to the disassembly listing (`.zst` is decompressed on the fly).
        input: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Extract { input, output, json, config } => {
            extract_command(&input, &output, json, &config)?
        }
        Command::Classify { input, features, json, config } => {
            classify_command(&input, &features, json, &config)?
        }
        Command::Coverage { inputs, json, quiet, config } => {
            coverage_command(&inputs, json, quiet, &config)?
        }
        Command::Name { input } => name_command(&input)?,
    }

    Ok(())
}
