use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::info;

/// Sets `key=value` in a dotenv file, replacing an existing line for `key`
/// or appending one. The file is created if missing.
pub fn update_env_var(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let updated = upsert_line(&content, key, value)?;
    fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("📝 {} updated: {}={}", path.display(), key, value);
    Ok(())
}

fn upsert_line(content: &str, key: &str, value: &str) -> Result<String> {
    let pattern = Regex::new(&format!(r"(?m)^{}=.*$", regex::escape(key)))
        .context("Invalid env key pattern")?;
    let line = format!("{}={}", key, value);

    if pattern.is_match(content) {
        return Ok(pattern
            .replace(content, regex::NoExpand(&line))
            .into_owned());
    }

    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&line);
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_existing_line() {
        let content = "RPC_URL=https://a\nCONTRACT_ADDRESS=0xold\nCHAIN_ID=10218\n";
        let out = upsert_line(content, "CONTRACT_ADDRESS", "0xnew").unwrap();
        assert_eq!(out, "RPC_URL=https://a\nCONTRACT_ADDRESS=0xnew\nCHAIN_ID=10218\n");
    }

    #[test]
    fn test_appends_missing_key() {
        let out = upsert_line("RPC_URL=https://a", "CONTRACT_ADDRESS", "0x1").unwrap();
        assert_eq!(out, "RPC_URL=https://a\nCONTRACT_ADDRESS=0x1\n");
    }

    #[test]
    fn test_prefix_keys_are_not_touched() {
        let content = "MY_CONTRACT_ADDRESS=0xkeep\n";
        let out = upsert_line(content, "CONTRACT_ADDRESS", "0x1").unwrap();
        assert!(out.contains("MY_CONTRACT_ADDRESS=0xkeep"));
        assert!(out.ends_with("\nCONTRACT_ADDRESS=0x1\n"));
    }

    #[test]
    fn test_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        update_env_var(&path, "CONTRACT_ADDRESS", "0xabc").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "CONTRACT_ADDRESS=0xabc\n");
    }
}
