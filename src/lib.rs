//! NFT role reconciler.
//!
//! Periodically re-reads recorded token holders, checks each token's current
//! owner on-chain, and asks the role bot to revoke access for users whose
//! wallet no longer holds the token.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
