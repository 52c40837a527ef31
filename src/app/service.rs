//! Reconciliation cycle: fetch records, re-check ownership, revoke on mismatch.

use std::sync::Arc;

use tracing::{Instrument, error, info, info_span, instrument, warn};

use crate::domain::{
    CycleSummary, FailureStage, FetchedRecord, NetworkBindings, OwnershipReader, OwnershipRecord,
    RecordOutcome, RecordSource, RoleRevoker, SkipReason,
};

/// Application service containing the reconciliation logic
pub struct ReconciliationService {
    source: Arc<dyn RecordSource>,
    reader: Arc<dyn OwnershipReader>,
    revoker: Arc<dyn RoleRevoker>,
    bindings: NetworkBindings,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(
        source: Arc<dyn RecordSource>,
        reader: Arc<dyn OwnershipReader>,
        revoker: Arc<dyn RoleRevoker>,
        bindings: NetworkBindings,
    ) -> Self {
        Self {
            source,
            reader,
            revoker,
            bindings,
        }
    }

    #[must_use]
    pub fn bindings(&self) -> &NetworkBindings {
        &self.bindings
    }

    /// Run one full cycle.
    ///
    /// Never fails: a fetch error aborts the cycle and is reported through
    /// [`CycleSummary::aborted`], and every per-record failure is folded into
    /// the counters.
    pub async fn run_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::start();
        let span = info_span!("cycle", cycle_id = %summary.cycle_id);

        async {
            info!("Fetching ownership records");
            let records = match self.source.fetch_records().await {
                Ok(records) => records,
                Err(e) => {
                    error!(error = %e, "Error fetching ownership records, cycle aborted");
                    summary.abort(e.to_string());
                    summary.finish();
                    log_summary(&summary);
                    return;
                }
            };
            info!(count = records.len(), "Ownership records fetched");

            for fetched in records {
                let outcome = self.process_record(fetched).await;
                summary.record(&outcome);
            }

            summary.finish();
            log_summary(&summary);
        }
        .instrument(span)
        .await;

        summary
    }

    /// Handle one fetched entry. Errors never escape; they become outcomes.
    pub async fn process_record(&self, fetched: FetchedRecord) -> RecordOutcome {
        match fetched {
            Ok(record) => self.check_record(&record).await,
            Err(e) => {
                warn!(error = %e, "Skipping malformed record");
                RecordOutcome::Skipped(SkipReason::Malformed(e.to_string()))
            }
        }
    }

    #[instrument(
        skip(self, record),
        fields(user_id = %record.user_id, network = %record.network, token_id = %record.token_id)
    )]
    async fn check_record(&self, record: &OwnershipRecord) -> RecordOutcome {
        let Some(binding) = self.bindings.resolve(&record.network) else {
            warn!("Unsupported network");
            return RecordOutcome::Skipped(SkipReason::UnsupportedNetwork(record.network.clone()));
        };

        let owner = match self.reader.owner_of(binding, &record.token_id).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(error = %e, "ownerOf lookup failed");
                return RecordOutcome::Failed {
                    stage: FailureStage::OwnerLookup,
                    error: e.to_string(),
                };
            }
        };

        if record.is_owned_by(&owner) {
            return RecordOutcome::Verified;
        }

        info!(
            wallet = %record.wallet_address,
            owner = %owner,
            "Wallet no longer owns token, revoking role"
        );

        match self.revoker.revoke_role(&record.user_id).await {
            Ok(()) => RecordOutcome::Revoked {
                user_id: record.user_id.clone(),
            },
            Err(e) => {
                warn!(error = %e, "Role revocation failed");
                RecordOutcome::Failed {
                    stage: FailureStage::Revoke,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Probe every bound RPC endpoint; failures are logged, not returned.
    pub async fn check_endpoints(&self) -> usize {
        let mut healthy = 0;
        for (network, binding) in self.bindings.iter() {
            match self.reader.health_check(binding).await {
                Ok(()) => {
                    info!(network = %network, "RPC endpoint reachable");
                    healthy += 1;
                }
                Err(e) => warn!(network = %network, error = %e, "RPC endpoint unreachable"),
            }
        }
        healthy
    }
}

fn log_summary(summary: &CycleSummary) {
    let duration_ms = summary
        .finished_at
        .map(|finished| (finished - summary.started_at).num_milliseconds());
    info!(
        processed = summary.processed,
        verified = summary.verified,
        revoked = summary.revoked,
        skipped = summary.skipped,
        errored = summary.errored,
        aborted = summary.aborted.as_deref(),
        duration_ms = duration_ms,
        "Cycle completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NetworkBinding, TokenId, ValidationError};
    use crate::test_utils::{MockOwnershipReader, MockRecordSource, MockRoleRevoker};
    use alloy_primitives::Address;
    use std::io;
    use std::sync::Mutex;

    const WALLET: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA1";
    const SKALE_RPC: &str = "http://skale.test";
    const MYRIA_RPC: &str = "http://myria.test";

    fn bindings() -> NetworkBindings {
        NetworkBindings::new()
            .with(
                "SKALE",
                NetworkBinding {
                    rpc_url: SKALE_RPC.to_string(),
                    contract_address: Address::repeat_byte(0x11),
                },
            )
            .with(
                "Myria",
                NetworkBinding {
                    rpc_url: MYRIA_RPC.to_string(),
                    contract_address: Address::repeat_byte(0x22),
                },
            )
    }

    fn record(user_id: &str, network: &str, token_id: u64) -> OwnershipRecord {
        OwnershipRecord {
            wallet_address: WALLET.to_string(),
            token_id: TokenId::from(token_id),
            network: network.to_string(),
            user_id: user_id.to_string(),
        }
    }

    struct Harness {
        source: Arc<MockRecordSource>,
        reader: Arc<MockOwnershipReader>,
        revoker: Arc<MockRoleRevoker>,
        service: ReconciliationService,
    }

    fn harness(source: MockRecordSource) -> Harness {
        let source = Arc::new(source);
        let reader = Arc::new(MockOwnershipReader::new());
        let revoker = Arc::new(MockRoleRevoker::new());
        let service = ReconciliationService::new(
            Arc::clone(&source) as _,
            Arc::clone(&reader) as _,
            Arc::clone(&revoker) as _,
            bindings(),
        );
        Harness {
            source,
            reader,
            revoker,
            service,
        }
    }

    #[tokio::test]
    async fn test_matching_owner_case_insensitive_no_revoke() {
        let h = harness(MockRecordSource::with_records(vec![record("u1", "SKALE", 7)]));
        let owner: Address = WALLET.to_lowercase().parse().unwrap();
        h.reader.set_owner(SKALE_RPC, 7, owner);

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.verified, 1);
        assert_eq!(summary.revoked, 0);
        assert!(h.revoker.revoked_users().is_empty());
    }

    #[tokio::test]
    async fn test_changed_owner_revokes_once() {
        let h = harness(MockRecordSource::with_records(vec![record("u1", "SKALE", 7)]));
        h.reader.set_owner(SKALE_RPC, 7, Address::repeat_byte(0xbb));

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.revoked, 1);
        assert_eq!(h.revoker.revoked_users(), vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn test_unsupported_network_skipped_without_calls() {
        let h = harness(MockRecordSource::with_records(vec![
            record("u1", "Polygon", 1),
            record("u2", "Myria", 2),
        ]));
        h.reader.set_owner(MYRIA_RPC, 2, Address::repeat_byte(0xcc));

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.revoked, 1);
        assert_eq!(h.reader.calls(), vec![(MYRIA_RPC.to_string(), TokenId::from(2))]);
        assert_eq!(h.revoker.revoked_users(), vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_cycle() {
        let h = harness(MockRecordSource::failing("connection refused"));

        let summary = h.service.run_cycle().await;

        assert!(summary.is_aborted());
        assert_eq!(summary.processed, 0);
        assert!(h.reader.calls().is_empty());
        assert!(h.revoker.revoked_users().is_empty());
        assert_eq!(h.source.fetch_count(), 1);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    async fn run_cycle_captured(h: &Harness) -> (CycleSummary, String) {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let summary = h.service.run_cycle().await;
        (summary, logs.contents())
    }

    #[tokio::test]
    async fn test_summary_logged_after_completed_cycle() {
        let h = harness(MockRecordSource::with_records(vec![record("u1", "SKALE", 7)]));
        h.reader.set_owner(SKALE_RPC, 7, Address::repeat_byte(0xbb));

        let (_, logs) = run_cycle_captured(&h).await;

        assert!(logs.contains("Cycle completed"));
        assert!(logs.contains("processed=1"));
        assert!(logs.contains("revoked=1"));
        assert!(!logs.contains("aborted="));
    }

    #[tokio::test]
    async fn test_summary_logged_after_aborted_cycle() {
        let h = harness(MockRecordSource::failing("connection refused"));

        let (summary, logs) = run_cycle_captured(&h).await;

        assert!(summary.is_aborted());
        assert!(logs.contains("Cycle completed"));
        assert!(logs.contains("processed=0"));
        assert!(logs.contains("errored=0"));
        assert!(logs.contains("aborted="));
        assert!(logs.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_owner_lookup_failure_isolated() {
        let h = harness(MockRecordSource::with_records(vec![
            record("u1", "SKALE", 1),
            record("u2", "SKALE", 2),
            record("u3", "SKALE", 3),
        ]));
        h.reader.fail_token(SKALE_RPC, 1);
        h.reader.set_owner(SKALE_RPC, 2, Address::repeat_byte(0xbb));
        h.reader.set_owner(SKALE_RPC, 3, WALLET.parse().unwrap());

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.revoked, 1);
        assert_eq!(summary.verified, 1);
        assert_eq!(h.reader.calls().len(), 3);
        assert_eq!(h.revoker.revoked_users(), vec!["u2".to_string()]);
    }

    #[tokio::test]
    async fn test_revoke_failure_does_not_stop_batch() {
        let h = harness(MockRecordSource::with_records(vec![
            record("u1", "SKALE", 1),
            record("u2", "SKALE", 2),
        ]));
        h.reader.set_owner(SKALE_RPC, 1, Address::repeat_byte(0xbb));
        h.reader.set_owner(SKALE_RPC, 2, Address::repeat_byte(0xbb));
        h.revoker.fail_user("u1");

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.errored, 1);
        assert_eq!(summary.revoked, 1);
        assert_eq!(
            h.revoker.attempted_users(),
            vec!["u1".to_string(), "u2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_entry_skipped() {
        let source = MockRecordSource::with_entries(vec![
            Err(ValidationError::Malformed("missing field `user_id`".to_string())),
            Ok(record("u2", "SKALE", 2)),
        ]);
        let h = harness(source);
        h.reader.set_owner(SKALE_RPC, 2, WALLET.parse().unwrap());

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.verified, 1);
    }

    #[tokio::test]
    async fn test_duplicate_user_revoked_per_record() {
        let h = harness(MockRecordSource::with_records(vec![
            record("u1", "SKALE", 1),
            record("u1", "Myria", 1),
        ]));
        h.reader.set_owner(SKALE_RPC, 1, Address::repeat_byte(0xbb));
        h.reader.set_owner(MYRIA_RPC, 1, Address::repeat_byte(0xbb));

        let summary = h.service.run_cycle().await;

        assert_eq!(summary.revoked, 2);
        assert_eq!(h.revoker.revoked_users().len(), 2);
    }

    #[tokio::test]
    async fn test_check_endpoints_counts_healthy() {
        let h = harness(MockRecordSource::with_records(vec![]));
        h.reader.set_unhealthy(MYRIA_RPC);

        assert_eq!(h.service.check_endpoints().await, 1);
    }
}
