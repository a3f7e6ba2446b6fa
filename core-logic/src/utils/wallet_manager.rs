use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A throwaway recipient key pair. Never used as a sender.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct GeneratedWallet {
    pub address: String,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

impl fmt::Debug for GeneratedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedWallet")
            .field("address", &self.address)
            .field("private_key", &"***REDACTED***")
            .finish()
    }
}

/// Append-only NDJSON store of generated wallets, one record per line.
pub struct GeneratedWalletStore {
    path: PathBuf,
    known: HashSet<String>,
}

impl GeneratedWalletStore {
    pub const FILE_NAME: &'static str = "generated_wallets.jsonl";

    /// Loads the store from `dir`. A missing file is an empty store and
    /// unreadable lines are skipped with a warning.
    pub fn open(dir: &Path) -> Result<Self, LedgerError> {
        let path = dir.join(Self::FILE_NAME);
        let mut known = HashSet::new();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| LedgerError::Io {
                path: path.display().to_string(),
                msg: e.to_string(),
            })?;

            for (idx, line) in content.lines().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<GeneratedWallet>(trimmed) {
                    Ok(record) => {
                        known.insert(record.address.to_lowercase());
                    }
                    Err(e) => warn!(
                        "Skipping malformed wallet record on line {} of {}: {}",
                        idx + 1,
                        path.display(),
                        e
                    ),
                }
            }
        }

        debug!("Loaded {} generated wallets from {}", known.len(), path.display());
        Ok(Self { path, known })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.known.contains(&address.to_lowercase())
    }

    /// Appends the records not already stored and returns how many were
    /// written. Nothing is added to memory unless the write succeeded.
    pub fn append(&mut self, wallets: &[GeneratedWallet]) -> Result<usize, LedgerError> {
        let mut seen = HashSet::new();
        let fresh: Vec<&GeneratedWallet> = wallets
            .iter()
            .filter(|w| {
                let key = w.address.to_lowercase();
                !self.known.contains(&key) && seen.insert(key)
            })
            .collect();

        if fresh.is_empty() {
            return Ok(0);
        }

        let path_str = self.path.display().to_string();
        let mut buf = String::new();
        for wallet in &fresh {
            let line = serde_json::to_string(wallet).map_err(|e| LedgerError::Encode {
                path: path_str.clone(),
                msg: e.to_string(),
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| LedgerError::Io {
                path: path_str.clone(),
                msg: e.to_string(),
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Io {
                path: path_str.clone(),
                msg: e.to_string(),
            })?;
        file.write_all(buf.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| LedgerError::Io {
                path: path_str,
                msg: e.to_string(),
            })?;
        buf.zeroize();

        for wallet in &fresh {
            self.known.insert(wallet.address.to_lowercase());
        }
        Ok(fresh.len())
    }
}

impl fmt::Debug for GeneratedWalletStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedWalletStore")
            .field("path", &self.path)
            .field("wallets", &self.known.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(address: &str) -> GeneratedWallet {
        GeneratedWallet {
            address: address.to_string(),
            private_key: "0x01".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", wallet("0xAbC"));
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("0x01"));
    }

    #[test]
    fn test_append_skips_known_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GeneratedWalletStore::open(dir.path()).unwrap();

        let written = store
            .append(&[wallet("0xAAA"), wallet("0xaaa"), wallet("0xBBB")])
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.append(&[wallet("0xbbb")]).unwrap(), 0);

        let reopened = GeneratedWalletStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.contains("0xaaa"));

        let raw = fs::read_to_string(reopened.path()).unwrap();
        assert!(raw.lines().all(|l| l.contains("\"privateKey\"")));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(GeneratedWalletStore::FILE_NAME),
            "not json\n{\"address\":\"0xCCC\",\"privateKey\":\"0x02\"}\n",
        )
        .unwrap();

        let store = GeneratedWalletStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains("0xccc"));
    }
}
