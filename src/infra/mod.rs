//! Infrastructure layer implementations.

pub mod blockchain;
pub mod records;
pub mod webhook;

pub use blockchain::{EvmOwnershipReader, RpcClientConfig};
pub use records::HttpRecordSource;
pub use webhook::WebhookRoleRevoker;
