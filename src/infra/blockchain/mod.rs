//! Blockchain client implementations.

pub mod evm;

pub use evm::{EvmOwnershipReader, RpcClientConfig};
