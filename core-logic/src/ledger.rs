//! # Quota Ledger
//!
//! File-backed daily bookkeeping: how many transactions were confirmed today
//! and which recipients were already paid today. Both files are rewritten
//! wholesale and reset whenever the stored date is not today.
//!
//! One process per state directory. There is no file locking.

use crate::error::LedgerError;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `daily_counter.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounter {
    pub date: String,
    pub count: u64,
}

/// `processed_addresses.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecipients {
    pub date: String,
    pub addresses: Vec<String>,
}

/// Source of "today". Swappable so tests can cross midnight.
pub type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct QuotaLedger {
    counter_path: PathBuf,
    processed_path: PathBuf,
    limit: u64,
    clock: Clock,
    counter: DailyCounter,
    processed: ProcessedRecipients,
    index: HashSet<String>,
}

impl std::fmt::Debug for QuotaLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaLedger")
            .field("counter_path", &self.counter_path)
            .field("limit", &self.limit)
            .field("counter", &self.counter)
            .field("processed", &self.index.len())
            .finish()
    }
}

impl QuotaLedger {
    pub const COUNTER_FILE: &'static str = "daily_counter.json";
    pub const PROCESSED_FILE: &'static str = "processed_addresses.json";

    /// Opens the ledger in `dir` using the UTC calendar date.
    pub fn open(dir: impl AsRef<Path>, limit: u64) -> Self {
        Self::with_clock(dir, limit, Box::new(|| Utc::now().date_naive()))
    }

    pub fn with_clock(dir: impl AsRef<Path>, limit: u64, clock: Clock) -> Self {
        let dir = dir.as_ref();
        let counter_path = dir.join(Self::COUNTER_FILE);
        let processed_path = dir.join(Self::PROCESSED_FILE);
        let today = format_day(clock());

        let counter = load_json::<DailyCounter>(&counter_path)
            .filter(|c| c.date == today)
            .unwrap_or_else(|| DailyCounter {
                date: today.clone(),
                count: 0,
            });

        let mut processed = load_json::<ProcessedRecipients>(&processed_path)
            .filter(|p| p.date == today)
            .unwrap_or_else(|| ProcessedRecipients {
                date: today.clone(),
                addresses: Vec::new(),
            });

        let mut index = HashSet::with_capacity(processed.addresses.len());
        processed
            .addresses
            .retain(|a| index.insert(a.to_lowercase()));

        debug!(
            "Ledger loaded for {}: {} sent, {} processed",
            today,
            counter.count,
            index.len()
        );

        Self {
            counter_path,
            processed_path,
            limit,
            clock,
            counter,
            processed,
            index,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Transactions that may still be sent today.
    pub fn remaining_quota(&mut self) -> u64 {
        self.roll_over();
        self.limit.saturating_sub(self.counter.count)
    }

    pub fn sent_today(&mut self) -> u64 {
        self.roll_over();
        self.counter.count
    }

    pub fn is_processed(&mut self, address: &str) -> bool {
        self.roll_over();
        self.index.contains(&address.to_lowercase())
    }

    pub fn processed_count(&mut self) -> usize {
        self.roll_over();
        self.index.len()
    }

    /// Counts one confirmed transaction and marks `address` as paid today.
    ///
    /// Refuses once the daily limit is reached. Both files are staged before
    /// either is replaced, and the in-memory state only changes after both
    /// renames succeed.
    pub fn record_sent(&mut self, address: &str) -> Result<(), LedgerError> {
        self.roll_over();
        if self.counter.count >= self.limit {
            return Err(LedgerError::QuotaExhausted { limit: self.limit });
        }
        let key = address.to_lowercase();

        let counter = DailyCounter {
            date: self.counter.date.clone(),
            count: self.counter.count + 1,
        };
        let mut processed = self.processed.clone();
        if !self.index.contains(&key) {
            processed.addresses.push(key.clone());
        }

        let counter_tmp = stage_json(&self.counter_path, &counter)?;
        let processed_tmp = match stage_json(&self.processed_path, &processed) {
            Ok(tmp) => tmp,
            Err(e) => {
                discard(&counter_tmp);
                return Err(e);
            }
        };

        // Counter last, so a failed rename never counts an unmarked recipient.
        if let Err(e) = commit(&processed_tmp, &self.processed_path) {
            discard(&processed_tmp);
            discard(&counter_tmp);
            return Err(e);
        }
        if let Err(e) = commit(&counter_tmp, &self.counter_path) {
            discard(&counter_tmp);
            if let Err(restore) = stage_json(&self.processed_path, &self.processed)
                .and_then(|tmp| commit(&tmp, &self.processed_path))
            {
                warn!("Failed to restore {:?}: {}", self.processed_path, restore);
            }
            return Err(e);
        }

        self.counter = counter;
        self.processed = processed;
        self.index.insert(key);
        Ok(())
    }

    fn roll_over(&mut self) {
        let today = format_day((self.clock)());
        if self.counter.date != today {
            debug!("Ledger day changed {} -> {}", self.counter.date, today);
            self.counter = DailyCounter {
                date: today.clone(),
                count: 0,
            };
        }
        if self.processed.date != today {
            self.processed = ProcessedRecipients {
                date: today,
                addresses: Vec::new(),
            };
            self.index.clear();
        }
    }
}

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring unreadable ledger file {:?}: {}", path, e);
            None
        }
    }
}

/// Writes `value` next to `path` as `<name>.json.tmp` and returns the temp path.
fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf, LedgerError> {
    let display = path.display().to_string();
    let body = serde_json::to_string_pretty(value).map_err(|e| LedgerError::Encode {
        path: display.clone(),
        msg: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| LedgerError::Io {
            path: display,
            msg: e.to_string(),
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|e| LedgerError::Io {
        path: tmp.display().to_string(),
        msg: e.to_string(),
    })?;
    Ok(tmp)
}

fn commit(tmp: &Path, path: &Path) -> Result<(), LedgerError> {
    fs::rename(tmp, path).map_err(|e| LedgerError::Io {
        path: path.display().to_string(),
        msg: e.to_string(),
    })
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        debug!("Could not remove {:?}: {}", tmp, e);
    }
}
