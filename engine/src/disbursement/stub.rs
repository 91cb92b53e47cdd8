//! Stub payment gateway for development and testing.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::disbursement::gateway::{
    GatewayError, GatewayResponse, GatewayStatus, PaymentGateway, PayoutRequest, StatusResponse,
};

#[derive(Default)]
struct StubState {
    /// Scripted outcomes consumed front-first; empty → default outcome
    script: VecDeque<Result<GatewayStatus, GatewayError>>,

    /// Every initiation request received, in order
    calls: Vec<PayoutRequest>,

    /// Last reported status per transaction id
    statuses: HashMap<String, GatewayStatus>,

    next_txn: u64,
}

/// In-memory gateway with scriptable outcomes.
///
/// By default every initiation is accepted as `Pending` (awaiting async
/// confirmation), matching typical gateway behavior. Tests script failures
/// or immediate successes per call.
#[derive(Clone, Default)]
pub struct StubGateway {
    state: Arc<Mutex<StubState>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script the next initiation to report the given status
    pub fn script_status(&self, status: GatewayStatus) {
        self.lock().script.push_back(Ok(status));
    }

    /// Script the next initiation to fail with the given error
    pub fn script_failure(&self, error: GatewayError) {
        self.lock().script.push_back(Err(error));
    }

    /// All initiation requests received so far
    pub fn calls(&self) -> Vec<PayoutRequest> {
        self.lock().calls.clone()
    }

    /// Number of initiation requests received
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initiate(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError> {
        let mut state = self.lock();
        state.calls.push(request.clone());

        let outcome = state.script.pop_front().unwrap_or(Ok(GatewayStatus::Pending));
        let status = outcome?;

        state.next_txn += 1;
        let transaction_id = format!("stub_txn_{}", state.next_txn);
        state.statuses.insert(transaction_id.clone(), status);

        Ok(GatewayResponse {
            transaction_id,
            status,
            gateway_reference: Some(format!("stub_ref_{}", request.reference)),
        })
    }

    async fn check_status(
        &self,
        transaction_id: &str,
        _reference: &str,
    ) -> Result<StatusResponse, GatewayError> {
        let state = self.lock();
        let status = state
            .statuses
            .get(transaction_id)
            .copied()
            .ok_or_else(|| GatewayError::Rejected(format!("unknown transaction {transaction_id}")))?;

        Ok(StatusResponse {
            status,
            amount_minor: state
                .calls
                .last()
                .map(|c| c.amount_minor)
                .unwrap_or_default(),
            completed_at: match status {
                GatewayStatus::Pending => None,
                _ => Some(Utc::now()),
            },
        })
    }
}
