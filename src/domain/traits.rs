//! Domain traits defining contracts for external systems.

use alloy_primitives::Address;
use async_trait::async_trait;

use super::error::AppError;
use super::types::{FetchedRecord, NetworkBinding, TokenId};

/// Source of the recorded (wallet, token, network, user) tuples
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the full record list.
    ///
    /// An `Err` means the list itself could not be obtained; individual
    /// entries that fail to decode come back as `Err` items inside the `Ok`.
    async fn fetch_records(&self) -> Result<Vec<FetchedRecord>, AppError>;
}

/// Read-only access to ERC-721 ownership
#[async_trait]
pub trait OwnershipReader: Send + Sync {
    /// Call `ownerOf(tokenId)` on the binding's contract
    async fn owner_of(
        &self,
        binding: &NetworkBinding,
        token_id: &TokenId,
    ) -> Result<Address, AppError>;

    /// Check that the binding's RPC endpoint answers
    async fn health_check(&self, binding: &NetworkBinding) -> Result<(), AppError> {
        let _ = binding;
        Ok(())
    }
}

/// Removes the access role granted to a user
#[async_trait]
pub trait RoleRevoker: Send + Sync {
    async fn revoke_role(&self, user_id: &str) -> Result<(), AppError>;
}
