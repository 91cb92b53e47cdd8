//! Integration tests for the disbursement orchestrator.
//!
//! Retry lifecycle across calls, bounded transient retries within a call,
//! gateway timeouts under paused time, and idempotency reference
//! progression.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use earnings_engine_core_rs::disbursement::{
    DisbursementConfig, DisbursementError, DisbursementOrchestrator, GatewayError,
    GatewayResponse, GatewayStatus, PaymentGateway, PayoutRequest, StatusResponse, StubGateway,
};
use earnings_engine_core_rs::{
    CollectionEvent, CollectionStore, DisbursementStatus, EventKind, MemoryStore, PaymentChannel,
};

fn seeded_store(gross: i64) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let mut e = CollectionEvent::new(
        "e1".to_string(),
        "COL_A".to_string(),
        EventKind::Standard,
        gross,
        PaymentChannel::Digital,
    );
    e.dispose(Utc::now());
    store.add_event(e);
    Arc::new(store)
}

fn orchestrator<G: PaymentGateway>(
    store: Arc<MemoryStore>,
    gateway: Arc<G>,
) -> DisbursementOrchestrator<MemoryStore, G> {
    DisbursementOrchestrator::new(store, gateway, DisbursementConfig::default())
}

// ============================================================================
// Retry lifecycle
// ============================================================================

#[tokio::test]
async fn test_retry_cap_exhausted_end_to_end() {
    let store = seeded_store(10_000); // available 8_613
    let gateway = Arc::new(StubGateway::new());
    let orch = orchestrator(store.clone(), gateway.clone());

    gateway.script_failure(GatewayError::Rejected("hold".to_string()));
    let record = orch
        .request_cashout("COL_A", 5_000, "acct", 8_613)
        .await
        .unwrap();
    assert_eq!(record.status(), DisbursementStatus::Failed);

    // Three caller-initiated retries are allowed...
    for i in 1..=3u8 {
        gateway.script_failure(GatewayError::Rejected("hold".to_string()));
        let retried = orch.retry_disbursement(record.id()).await.unwrap();
        assert_eq!(retried.status(), DisbursementStatus::Failed);
        assert_eq!(retried.retry_count(), i);
    }

    // ...the fourth is rejected without touching the gateway.
    let calls_before = gateway.call_count();
    let err = orch.retry_disbursement(record.id()).await.unwrap_err();
    assert!(matches!(err, DisbursementError::NotRetryable(_)));
    assert_eq!(gateway.call_count(), calls_before);
}

#[tokio::test]
async fn test_reference_progression_across_retries() {
    let store = seeded_store(10_000);
    let gateway = Arc::new(StubGateway::new());
    let orch = orchestrator(store, gateway.clone());

    gateway.script_failure(GatewayError::Rejected("hold".to_string()));
    gateway.script_failure(GatewayError::Rejected("hold".to_string()));
    gateway.script_status(GatewayStatus::Success);

    let record = orch
        .request_cashout("COL_A", 5_000, "acct", 8_613)
        .await
        .unwrap();
    orch.retry_disbursement(record.id()).await.unwrap();
    let done = orch.retry_disbursement(record.id()).await.unwrap();

    assert_eq!(done.status(), DisbursementStatus::Success);
    let calls = gateway.calls();
    assert_eq!(calls[0].reference, record.id());
    assert_eq!(calls[1].reference, format!("{}-r1", record.id()));
    assert_eq!(calls[2].reference, format!("{}-r2", record.id()));
    // Same amount throughout: references are never reused across amounts.
    assert!(calls.iter().all(|c| c.amount_minor == 5_000));
}

#[tokio::test]
async fn test_successful_record_not_retryable() {
    let store = seeded_store(10_000);
    let gateway = Arc::new(StubGateway::new());
    gateway.script_status(GatewayStatus::Success);
    let orch = orchestrator(store, gateway);

    let record = orch
        .request_cashout("COL_A", 5_000, "acct", 8_613)
        .await
        .unwrap();
    assert_eq!(record.status(), DisbursementStatus::Success);

    let err = orch.retry_disbursement(record.id()).await.unwrap_err();
    assert!(matches!(err, DisbursementError::NotRetryable(_)));
}

#[tokio::test]
async fn test_unknown_record_not_found() {
    let store = seeded_store(10_000);
    let orch = orchestrator(store, Arc::new(StubGateway::new()));

    let err = orch.retry_disbursement("no-such-id").await.unwrap_err();
    assert!(matches!(err, DisbursementError::NotFound { .. }));
}

// ============================================================================
// Gateway timeout
// ============================================================================

/// Gateway that never answers within the timeout.
struct HangingGateway {
    initiations: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for HangingGateway {
    async fn initiate(&self, _request: &PayoutRequest) -> Result<GatewayResponse, GatewayError> {
        self.initiations.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("the orchestrator's timeout should fire first");
    }

    async fn check_status(
        &self,
        _transaction_id: &str,
        _reference: &str,
    ) -> Result<StatusResponse, GatewayError> {
        Err(GatewayError::Transient("unreachable".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_bounded_and_recorded_as_failure() {
    let store = seeded_store(10_000);
    let gateway = Arc::new(HangingGateway {
        initiations: AtomicUsize::new(0),
    });
    let orch = orchestrator(store.clone(), gateway.clone());

    let record = orch
        .request_cashout("COL_A", 5_000, "acct", 8_613)
        .await
        .unwrap();

    // Timeouts are transient: retried up to the per-call bound, then failed.
    assert_eq!(record.status(), DisbursementStatus::Failed);
    assert_eq!(gateway.initiations.load(Ordering::SeqCst), 3);
    assert!(record
        .failure_reason()
        .map(|r| r.contains("timed out"))
        .unwrap_or(false));

    // The failed record is persisted and retryable later.
    let stored = store.fetch_disbursement(record.id()).await.unwrap().unwrap();
    assert!(stored.is_retryable());
}
