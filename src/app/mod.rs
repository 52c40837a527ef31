//! Application layer containing the reconciliation cycle and its scheduler.

pub mod service;
pub mod worker;

pub use service::ReconciliationService;
pub use worker::{DEFAULT_INTERVAL, ReconciliationWorker, WorkerConfig, spawn_worker};
