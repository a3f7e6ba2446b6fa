//! # Core Logic - Shared Utilities for the Tea Sepolia Tooling
//!
//! Chain-agnostic building blocks used by the chain crates: configuration,
//! typed errors, daily quota bookkeeping, endpoint selection policy, retry
//! classification and logging.
//!
//! ## Modules
//!
//! - [`config`] - Tunables for selection, submission, health and batches
//! - [`error`] - Typed error handling with thiserror
//! - [`ledger`] - File-backed daily counter and processed-recipient set
//! - [`traits`] - External build tool seam and shared result types
//! - `utils` - Logger, retry, endpoint cache, gas policy, delays, wallets

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub mod ledger;
pub mod traits;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::{
    BatchConfig, ChainConfig, FallbackPolicy, HealthConfig, SelectorConfig, SubmitConfig,
    DAILY_TX_LIMIT,
};
pub use error::{ConfigError, CoreError, LedgerError, NetworkError, SubmitError, ToolError};
pub use ledger::{Clock, DailyCounter, ProcessedRecipients, QuotaLedger};
pub use traits::{Artifact, BatchStats, BuildTool, VerifyOutcome};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    gwei_to_wei, select_endpoint, setup_logger, DelayWindow, EndpointCache, GasConfig,
    GasConfigToml, GeneratedWallet, GeneratedWalletStore, ProbeOutcome, ProbeReport, RpcManager,
    Selection, ShutdownGuard, SUCCESS_TARGET,
};

// Export retry utilities for the submitter and tests
pub use utils::retry::{classify_failure, classify_message, with_retry, FailureClass, RetryConfig};
