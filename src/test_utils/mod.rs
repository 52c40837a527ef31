//! Test helpers, compiled for unit tests and the `test-utils` feature.

pub mod mocks;

pub use mocks::{MockConfig, MockOwnershipReader, MockRecordSource, MockRoleRevoker};
