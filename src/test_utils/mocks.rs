//! Mock implementations for testing.

use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{
    AppError, BlockchainError, ExternalServiceError, FetchedRecord, NetworkBinding,
    OwnershipReader, OwnershipRecord, RecordSource, RoleRevoker, TokenId, ValidationError,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }

    fn message(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "Mock error".to_string())
    }
}

/// Mock record source returning a fixed list on every fetch
pub struct MockRecordSource {
    entries: Vec<Result<OwnershipRecord, String>>,
    config: MockConfig,
    fetches: AtomicUsize,
}

impl MockRecordSource {
    #[must_use]
    pub fn with_records(records: Vec<OwnershipRecord>) -> Self {
        Self {
            entries: records.into_iter().map(Ok).collect(),
            config: MockConfig::success(),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Mix of valid and malformed entries, in order
    #[must_use]
    pub fn with_entries(entries: Vec<FetchedRecord>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| e.map_err(|err| err.to_string()))
                .collect(),
            config: MockConfig::success(),
            fetches: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            config: MockConfig::failure(message),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordSource for MockRecordSource {
    async fn fetch_records(&self) -> Result<Vec<FetchedRecord>, AppError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if self.config.should_fail {
            return Err(AppError::ExternalService(ExternalServiceError::Network(
                self.config.message(),
            )));
        }
        Ok(self
            .entries
            .iter()
            .map(|e| e.clone().map_err(ValidationError::Malformed))
            .collect())
    }
}

/// Mock ownership reader keyed by (rpc_url, token id)
#[derive(Default)]
pub struct MockOwnershipReader {
    owners: Mutex<HashMap<(String, TokenId), Address>>,
    failing: Mutex<HashSet<(String, TokenId)>>,
    unhealthy: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, TokenId)>>,
}

impl MockOwnershipReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_owner(&self, rpc_url: &str, token_id: u64, owner: Address) {
        self.owners
            .lock()
            .unwrap()
            .insert((rpc_url.to_string(), TokenId::from(token_id)), owner);
    }

    /// Make `ownerOf` fail for one token
    pub fn fail_token(&self, rpc_url: &str, token_id: u64) {
        self.failing
            .lock()
            .unwrap()
            .insert((rpc_url.to_string(), TokenId::from(token_id)));
    }

    pub fn set_unhealthy(&self, rpc_url: &str) {
        self.unhealthy.lock().unwrap().insert(rpc_url.to_string());
    }

    /// Every `ownerOf` call made, in order
    pub fn calls(&self) -> Vec<(String, TokenId)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OwnershipReader for MockOwnershipReader {
    async fn owner_of(
        &self,
        binding: &NetworkBinding,
        token_id: &TokenId,
    ) -> Result<Address, AppError> {
        let key = (binding.rpc_url.clone(), *token_id);
        self.calls.lock().unwrap().push(key.clone());

        if self.failing.lock().unwrap().contains(&key) {
            return Err(AppError::Blockchain(BlockchainError::Timeout(
                "Mock timeout".to_string(),
            )));
        }

        self.owners.lock().unwrap().get(&key).copied().ok_or_else(|| {
            AppError::Blockchain(BlockchainError::RpcError(
                "3: execution reverted: ERC721: invalid token ID".to_string(),
            ))
        })
    }

    async fn health_check(&self, binding: &NetworkBinding) -> Result<(), AppError> {
        if self.unhealthy.lock().unwrap().contains(&binding.rpc_url) {
            return Err(AppError::Blockchain(BlockchainError::Connection(
                "Unhealthy".to_string(),
            )));
        }
        Ok(())
    }
}

/// Mock revoker recording every call
#[derive(Default)]
pub struct MockRoleRevoker {
    attempted: Mutex<Vec<String>>,
    revoked: Mutex<Vec<String>>,
    failing_users: Mutex<HashSet<String>>,
}

impl MockRoleRevoker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_user(&self, user_id: &str) {
        self.failing_users
            .lock()
            .unwrap()
            .insert(user_id.to_string());
    }

    /// Users whose revoke call succeeded
    pub fn revoked_users(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }

    /// Users for which a revoke call was made, successful or not
    pub fn attempted_users(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoleRevoker for MockRoleRevoker {
    async fn revoke_role(&self, user_id: &str) -> Result<(), AppError> {
        self.attempted.lock().unwrap().push(user_id.to_string());
        if self.failing_users.lock().unwrap().contains(user_id) {
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: 500,
                message: "Mock webhook failure".to_string(),
            }));
        }
        self.revoked.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}
