//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

// Internal modules - not part of public API
pub(crate) mod gas;
pub(crate) mod logger;
pub(crate) mod rate_limiter;
pub(crate) mod retry;
pub(crate) mod rpc_manager;
pub(crate) mod runner;
pub(crate) mod wallet_manager;

// Selective exports - only public utilities
pub use gas::{gwei_to_wei, GasConfig, GasConfigToml};
pub use logger::{setup_logger, SUCCESS_TARGET};
pub use rate_limiter::DelayWindow;
pub use rpc_manager::{
    select_endpoint, EndpointCache, ProbeOutcome, ProbeReport, RpcManager, Selection,
};
pub use runner::ShutdownGuard;
pub use wallet_manager::{GeneratedWallet, GeneratedWalletStore};
