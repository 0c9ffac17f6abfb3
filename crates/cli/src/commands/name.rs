//! `name` command: derive the canonical file name from a listing header.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fingerprint_core::parser::derive_listing_name;

use crate::read_listing;

/// Print the normalized name the listing's header path maps to.
pub fn name_command(input: &str) -> Result<()> {
    let content = read_listing(Path::new(input))?;
    let name = derive_listing_name(&content)
        .with_context(|| format!("Failed to parse listing at {input}"))?
        .ok_or_else(|| anyhow!("No `file format` header found in {input}"))?;

    println!("{}", name);
    Ok(())
}
