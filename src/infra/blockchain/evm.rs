//! EVM JSON-RPC ownership reader.
//!
//! Performs a read-only `eth_call` of the ERC-721 `ownerOf(uint256)` function
//! against the contract bound to a network. No transaction is signed and no
//! gas is spent.

use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::domain::{AppError, BlockchainError, NetworkBinding, OwnershipReader, TokenId};

sol! {
    function ownerOf(uint256 tokenId) external view returns (address owner);
}

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub timeout: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct CallRequest {
    to: Address,
    data: Bytes,
}

/// `OwnershipReader` backed by plain EVM JSON-RPC over HTTP
pub struct EvmOwnershipReader {
    http_client: Client,
}

impl EvmOwnershipReader {
    pub fn new(config: RpcClientConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Blockchain(BlockchainError::Connection(e.to_string())))?;
        Ok(Self { http_client })
    }

    pub fn with_defaults() -> Result<Self, AppError> {
        Self::new(RpcClientConfig::default())
    }

    async fn send_request<P, R>(
        &self,
        rpc_url: &str,
        method: &'static str,
        params: P,
    ) -> Result<R, AppError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    AppError::Blockchain(BlockchainError::Timeout(e.to_string()))
                } else {
                    AppError::Blockchain(BlockchainError::Connection(e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Blockchain(BlockchainError::RpcError(format!(
                "HTTP {}: {}",
                status, body
            ))));
        }

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| AppError::Blockchain(BlockchainError::InvalidResponse(e.to_string())))?;

        if let Some(error) = rpc_response.error {
            return Err(AppError::Blockchain(BlockchainError::RpcError(format!(
                "{}: {}",
                error.code, error.message
            ))));
        }

        rpc_response.result.ok_or_else(|| {
            AppError::Blockchain(BlockchainError::InvalidResponse("Empty response".to_string()))
        })
    }
}

/// Decode an ABI-encoded `address` return value
fn decode_address_word(data: &[u8]) -> Result<Address, AppError> {
    if data.len() != 32 {
        return Err(AppError::Blockchain(BlockchainError::InvalidResponse(format!(
            "expected 32-byte address word, got {} bytes",
            data.len()
        ))));
    }
    if data[..12].iter().any(|b| *b != 0) {
        return Err(AppError::Blockchain(BlockchainError::InvalidResponse(
            "address word has non-zero padding".to_string(),
        )));
    }
    Ok(Address::from_slice(&data[12..]))
}

#[async_trait]
impl OwnershipReader for EvmOwnershipReader {
    #[instrument(
        skip(self, binding, token_id),
        fields(contract = %binding.contract_address, token_id = %token_id)
    )]
    async fn owner_of(
        &self,
        binding: &NetworkBinding,
        token_id: &TokenId,
    ) -> Result<Address, AppError> {
        let call = ownerOfCall {
            tokenId: token_id.as_u256(),
        };
        let params = (
            CallRequest {
                to: binding.contract_address,
                data: Bytes::from(call.abi_encode()),
            },
            "latest",
        );

        let result: Bytes = self
            .send_request(&binding.rpc_url, "eth_call", params)
            .await?;
        let owner = decode_address_word(&result)?;

        debug!(owner = %owner, "ownerOf returned");
        Ok(owner)
    }

    async fn health_check(&self, binding: &NetworkBinding) -> Result<(), AppError> {
        let block: String = self
            .send_request(
                &binding.rpc_url,
                "eth_blockNumber",
                Vec::<serde_json::Value>::new(),
            )
            .await?;
        debug!(rpc_host = %binding.display_host(), block = %block, "RPC endpoint healthy");
        Ok(())
    }
}
