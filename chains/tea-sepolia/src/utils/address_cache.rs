//! Recipient list loader.
//!
//! Reads newline-delimited addresses; invalid lines are logged and skipped.

use anyhow::{Context, Result};
use ethers::types::Address;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub fn load_recipients(path: &Path) -> Result<Vec<Address>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read address file: {}", path.display()))?;

    Ok(parse_recipients(&content, &path.display().to_string()))
}

/// Parses one address per line, keeping file order and dropping repeats.
pub fn parse_recipients(content: &str, source: &str) -> Vec<Address> {
    let mut seen = HashSet::new();
    let addresses: Vec<Address> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .filter_map(|(i, line)| {
            let trimmed = line.trim();
            match trimmed.parse::<Address>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(
                        "Invalid address at line {} in {}: '{}' - {}",
                        i + 1,
                        source,
                        trimmed,
                        e
                    );
                    None
                }
            }
        })
        .filter(|addr| seen.insert(*addr))
        .collect();

    info!("Loaded {} addresses from {}", addresses.len(), source);
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_and_duplicate_lines_are_dropped() {
        let content = "\
0x00000000000000000000000000000000000000aa
garbage

0x00000000000000000000000000000000000000AA
# comment
0x00000000000000000000000000000000000000bb
";
        let parsed = parse_recipients(content, "test");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1], Address::from_low_u64_be(0xbb));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_recipients(&dir.path().join("nope.txt")).is_err());
    }
}
