//! Domain types with validation support.

use std::collections::HashMap;
use std::fmt;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::error::ValidationError;

/// Largest integer a JSON number carried as `f64` represents exactly
const MAX_EXACT_JSON_INT: f64 = 9_007_199_254_740_991.0;

/// ERC-721 token identifier.
///
/// Accepts either a JSON number or a decimal string on the wire. JSON numbers
/// must be non-negative integers: any `u64`, or an integral float such as
/// `7.0` up to 2^53. Wider ids have to arrive as decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenId(U256);

impl TokenId {
    #[must_use]
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Parse a base-10 token id
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidField {
                field: "token_id".to_string(),
                message: format!("'{}' is not a decimal integer", s),
            });
        }
        U256::from_str_radix(s, 10)
            .map(Self)
            .map_err(|e| ValidationError::InvalidField {
                field: "token_id".to_string(),
                message: format!("'{}' is not a decimal integer: {}", s, e),
            })
    }

    fn from_json_number(n: &serde_json::Number) -> Result<Self, ValidationError> {
        if let Some(v) = n.as_u64() {
            return Ok(Self::from(v));
        }
        match n.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= MAX_EXACT_JSON_INT => {
                Ok(Self::from(f as u64))
            }
            _ => Err(ValidationError::InvalidField {
                field: "token_id".to_string(),
                message: format!(
                    "{} is not an exact non-negative integer; send large ids as decimal strings",
                    n
                ),
            }),
        }
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self::from_json_number(&n).map_err(serde::de::Error::custom),
            Raw::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// One entry from the record source: a wallet that claimed a role by holding a token
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Validate)]
pub struct OwnershipRecord {
    /// Wallet recorded as owning the token (compared case-insensitively)
    #[validate(length(min = 1, message = "Wallet address is required"))]
    pub wallet_address: String,
    pub token_id: TokenId,
    /// Network name, looked up in the binding table
    #[validate(length(min = 1, message = "Network is required"))]
    pub network: String,
    /// Opaque key sent to the revoke webhook
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,
}

/// A record as delivered by the source: parsed, or the reason it could not be
pub type FetchedRecord = Result<OwnershipRecord, ValidationError>;

impl OwnershipRecord {
    /// Decode and validate a single JSON entry.
    pub fn from_value(value: serde_json::Value) -> FetchedRecord {
        let record: Self =
            serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        record
            .validate()
            .map_err(|e| ValidationError::Invalid(e.to_string()))?;
        Ok(record)
    }

    /// Whether the on-chain owner is still the recorded wallet.
    #[must_use]
    pub fn is_owned_by(&self, on_chain_owner: &Address) -> bool {
        owner_matches(&self.wallet_address, on_chain_owner)
    }
}

/// Case-insensitive comparison of a recorded wallet against the on-chain owner
#[must_use]
pub fn owner_matches(recorded_wallet: &str, on_chain_owner: &Address) -> bool {
    recorded_wallet.eq_ignore_ascii_case(&on_chain_owner.to_string())
}

/// Host part of an endpoint URL, safe to log.
///
/// Paths, query strings and userinfo are dropped; keyed RPC and database
/// endpoints carry credentials there.
#[must_use]
pub fn url_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid url>".to_string())
}

/// RPC endpoint and ERC-721 contract for one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBinding {
    pub rpc_url: String,
    pub contract_address: Address,
}

impl NetworkBinding {
    #[must_use]
    pub fn display_host(&self) -> String {
        url_host(&self.rpc_url)
    }
}

/// Static network name -> binding table, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct NetworkBindings {
    bindings: HashMap<String, NetworkBinding>,
}

impl NetworkBindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a network (builder pattern)
    #[must_use]
    pub fn with(mut self, network: impl Into<String>, binding: NetworkBinding) -> Self {
        self.bindings.insert(network.into(), binding);
        self
    }

    /// Exact-match lookup
    #[must_use]
    pub fn resolve(&self, network: &str) -> Option<&NetworkBinding> {
        self.bindings.get(network)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NetworkBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Why a record was not checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedNetwork(String),
    Malformed(String),
}

/// Step at which a record's processing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    OwnerLookup,
    Revoke,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnerLookup => "owner_lookup",
            Self::Revoke => "revoke",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of processing one record within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// On-chain owner matches the recorded wallet
    Verified,
    /// Ownership changed and the revoke webhook accepted the call
    Revoked { user_id: String },
    Skipped(SkipReason),
    Failed { stage: FailureStage, error: String },
}

/// Aggregated counters for one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Entries returned by the source
    pub processed: usize,
    pub verified: usize,
    pub revoked: usize,
    pub skipped: usize,
    pub errored: usize,
    /// Set when the record fetch failed and no record was processed
    pub aborted: Option<String>,
}

impl CycleSummary {
    #[must_use]
    pub fn start() -> Self {
        Self {
            cycle_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            verified: 0,
            revoked: 0,
            skipped: 0,
            errored: 0,
            aborted: None,
        }
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.processed += 1;
        match outcome {
            RecordOutcome::Verified => self.verified += 1,
            RecordOutcome::Revoked { .. } => self.revoked += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
            RecordOutcome::Failed { .. } => self.errored += 1,
        }
    }

    pub fn abort(&mut self, reason: impl Into<String>) {
        self.aborted = Some(reason.into());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}
