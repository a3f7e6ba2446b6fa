//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error(transparent)]
    Network(NetworkError),

    #[error(transparent)]
    Submit(SubmitError),

    #[error(transparent)]
    Tool(ToolError),
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        CoreError::Config(e)
    }
}

impl From<LedgerError> for CoreError {
    fn from(e: LedgerError) -> Self {
        CoreError::Ledger(e)
    }
}

impl From<NetworkError> for CoreError {
    fn from(e: NetworkError) -> Self {
        CoreError::Network(e)
    }
}

impl From<SubmitError> for CoreError {
    fn from(e: SubmitError) -> Self {
        CoreError::Submit(e)
    }
}

impl From<ToolError> for CoreError {
    fn from(e: ToolError) -> Self {
        CoreError::Tool(e)
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Quota ledger persistence errors
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("I/O error on {path}: {msg}")]
    Io { path: String, msg: String },

    #[error("Failed to encode {path}: {msg}")]
    Encode { path: String, msg: String },

    #[error("Daily limit of {limit} transactions reached")]
    QuotaExhausted { limit: u64 },
}

/// Network and RPC-related errors
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("RPC request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}")]
    HttpError { status_code: u16, endpoint: String },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("No synchronized RPC endpoint among {candidates} candidates")]
    NoEligibleEndpoint { candidates: usize },
}

/// Terminal outcomes of a transaction submission
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    #[error("Transaction failed after {attempts} attempts. Last error: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Transaction rejected: {reason}")]
    Rejected { reason: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Transaction {tx_hash} dropped from mempool")]
    Dropped { tx_hash: String },

    #[error("Transaction {tx_hash} not confirmed within {timeout_secs}s")]
    ConfirmationTimeout { tx_hash: String, timeout_secs: u64 },
}

/// External build/verify tool errors
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("Failed to install {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },

    #[error("Command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Artifact not found: {path}")]
    ArtifactMissing { path: String },

    #[error("Invalid artifact {path}: {reason}")]
    InvalidArtifact { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_ledger() -> Result<(), CoreError> {
        Err(LedgerError::Io {
            path: "daily_counter.json".to_string(),
            msg: "permission denied".to_string(),
        })?
    }

    #[test]
    fn test_question_mark_wraps_into_core_error() {
        let err = open_ledger().unwrap_err();
        assert!(matches!(err, CoreError::Ledger(LedgerError::Io { .. })));
        assert_eq!(
            err.to_string(),
            "Ledger error: I/O error on daily_counter.json: permission denied"
        );
    }

    #[test]
    fn test_transparent_variants_keep_message() {
        let err: CoreError = SubmitError::Reverted {
            tx_hash: "0xabc".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Transaction 0xabc reverted");
    }
}
