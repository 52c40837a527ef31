//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{AppError, BlockchainError, ConfigError, ExternalServiceError, ValidationError};
pub use traits::{OwnershipReader, RecordSource, RoleRevoker};
pub use types::{
    CycleSummary, FailureStage, FetchedRecord, NetworkBinding, NetworkBindings, OwnershipRecord,
    RecordOutcome, SkipReason, TokenId, owner_matches, url_host,
};
