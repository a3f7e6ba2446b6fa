pub mod address_cache;
pub mod env_file;
pub mod hardhat;
pub mod rpc_manager;

pub use address_cache::*;
pub use env_file::*;
pub use hardhat::{HardhatNetwork, HardhatTool};
pub use rpc_manager::*;
