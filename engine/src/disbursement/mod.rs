//! Disbursement Orchestrator
//!
//! Drives a collector cash-out through the payment gateway:
//!
//! ```text
//! request_cashout ── validate amount & balance ──▶ DisbursementRecord (Pending)
//!        │                                              │
//!        │                insert row                    ▼
//!        └─────────────────────────────▶ gateway.initiate (30s timeout,
//!                                         bounded transient retries)
//!                                               │
//!                      success ─▶ Pending/Success (gateway txn id stored)
//!                      failure ─▶ Failed (error stored; caller may retry
//!                                 up to 3 times with a suffixed reference)
//! ```
//!
//! # Critical Invariants
//!
//! - **Idempotency**: the gateway reference is the record id (suffixed per
//!   retry) and is never reused across distinct amounts.
//! - **Disposed-only**: cash-outs draw exclusively on the reconciled balance
//!   of disposed events; pending earnings are never cashable.
//! - **No automatic retries of business failures**: only transient/network
//!   failures are retried within a call, and record-level retries are
//!   always caller-initiated.
//! - **Store-side exclusion**: every row write goes through the store's
//!   conditional update; the orchestrator holds no locks.

pub mod gateway;
pub mod stub;
pub mod webhook;

// Re-export public API
pub use gateway::{
    GatewayError, GatewayResponse, GatewayStatus, PaymentGateway, PayoutRequest, StatusResponse,
    GATEWAY_TIMEOUT_SECS, MIN_TRANSFER_MINOR,
};
pub use stub::StubGateway;
pub use webhook::{verify_webhook, WebhookConfig, WebhookVerification};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::models::disbursement::{
    DisbursementRecord, DisbursementStateError, DisbursementStatus,
};
use crate::store::{CollectionStore, StoreError};

/// Errors from cash-out operations
#[derive(Debug, Error)]
pub enum DisbursementError {
    #[error("Cash-out amount must be positive")]
    InvalidAmount,

    #[error("Cash-out amount {requested} is below the minimum of {minimum}")]
    BelowMinimum { requested: i64, minimum: i64 },

    /// Insufficient balance: nothing is available at all
    #[error("No finalized collections available to cash out yet")]
    NoneAvailable,

    /// Insufficient balance: something is available, but less than requested
    #[error("Requested {requested} exceeds available balance {available}")]
    ExceedsAvailable { requested: i64, available: i64 },

    #[error("Server-side validation rejected the cash-out: {0}")]
    ValidationRejected(String),

    #[error("Disbursement {id} not found")]
    NotFound { id: String },

    #[error("Not retryable: {0}")]
    NotRetryable(#[from] DisbursementStateError),

    #[error("Disbursement row changed concurrently: {id}")]
    ConcurrentUpdate { id: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct DisbursementConfig {
    /// ISO currency code transmitted to the gateway
    pub currency: String,

    /// Bound on each gateway round trip
    pub timeout: Duration,

    /// Total initiation attempts per call for transient failures
    pub max_transient_attempts: u32,

    /// Minimum cash-out amount (cents)
    pub minimum: i64,
}

impl Default for DisbursementConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            timeout: Duration::from_secs(GATEWAY_TIMEOUT_SECS),
            max_transient_attempts: 3,
            minimum: MIN_TRANSFER_MINOR,
        }
    }
}

/// Orchestrates cash-outs against an injected store and gateway
pub struct DisbursementOrchestrator<S, G> {
    store: Arc<S>,
    gateway: Arc<G>,
    config: DisbursementConfig,
}

impl<S, G> DisbursementOrchestrator<S, G>
where
    S: CollectionStore,
    G: PaymentGateway,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>, config: DisbursementConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Request a cash-out for a collector
    ///
    /// `reconciled_available` is the engine-side disposed-only balance from
    /// the settlement reconciler; the store's server-side validation is
    /// consulted afterwards and is authoritative.
    ///
    /// # Returns
    /// The persisted record. A gateway failure is reported **in the record**
    /// (`Failed` status plus the gateway's message) so the caller keeps the
    /// id for a later retry; `Err` is reserved for precondition and store
    /// failures.
    pub async fn request_cashout(
        &self,
        collector_id: &str,
        amount: i64,
        destination: &str,
        reconciled_available: i64,
    ) -> Result<DisbursementRecord, DisbursementError> {
        if amount <= 0 {
            return Err(DisbursementError::InvalidAmount);
        }
        if amount < self.config.minimum {
            return Err(DisbursementError::BelowMinimum {
                requested: amount,
                minimum: self.config.minimum,
            });
        }
        if reconciled_available <= 0 {
            return Err(DisbursementError::NoneAvailable);
        }
        if amount > reconciled_available {
            return Err(DisbursementError::ExceedsAvailable {
                requested: amount,
                available: reconciled_available,
            });
        }

        let validation = self.store.validate_cashout(collector_id, amount).await?;
        if !validation.valid {
            return Err(if validation.available <= 0 {
                DisbursementError::NoneAvailable
            } else if amount > validation.available {
                DisbursementError::ExceedsAvailable {
                    requested: amount,
                    available: validation.available,
                }
            } else {
                DisbursementError::ValidationRejected(
                    validation
                        .error
                        .unwrap_or_else(|| "rejected without reason".to_string()),
                )
            });
        }

        let mut record =
            DisbursementRecord::new(collector_id.to_string(), amount, destination.to_string());
        self.store.insert_disbursement(&record).await?;
        info!(
            disbursement_id = %record.id(),
            collector_id,
            amount,
            "cash-out accepted, contacting gateway"
        );

        self.execute(&mut record).await?;
        Ok(record)
    }

    /// Retry a failed disbursement by id
    ///
    /// # Errors
    /// `NotRetryable` when the record is not `Failed` or its retry cap is
    /// exhausted; the gateway is not contacted in either case.
    pub async fn retry_disbursement(
        &self,
        id: &str,
    ) -> Result<DisbursementRecord, DisbursementError> {
        let mut record = self
            .store
            .fetch_disbursement(id)
            .await?
            .ok_or_else(|| DisbursementError::NotFound { id: id.to_string() })?;

        record.begin_retry()?;

        // Conditional reset: only wins if the row is still Failed, so two
        // concurrent retries cannot both reach the gateway.
        let reset = self
            .store
            .update_disbursement_if(&record, DisbursementStatus::Failed)
            .await?;
        if !reset {
            return Err(DisbursementError::ConcurrentUpdate { id: id.to_string() });
        }
        info!(
            disbursement_id = %record.id(),
            retry = record.retry_count(),
            reference = %record.reference(),
            "retrying failed disbursement"
        );

        self.execute(&mut record).await?;
        Ok(record)
    }

    /// Run the gateway call and persist the resulting state
    async fn execute(&self, record: &mut DisbursementRecord) -> Result<(), DisbursementError> {
        match self.call_gateway(record).await {
            Ok(response) => {
                match response.status {
                    GatewayStatus::Success => {
                        record
                            .mark_success(response.transaction_id)
                            .map_err(DisbursementError::NotRetryable)?;
                    }
                    GatewayStatus::Pending => {
                        record.attach_gateway_txn(response.transaction_id);
                    }
                    GatewayStatus::Failed => {
                        record
                            .mark_failed("gateway reported failure".to_string())
                            .map_err(DisbursementError::NotRetryable)?;
                    }
                }
            }
            Err(e) => {
                warn!(
                    disbursement_id = %record.id(),
                    error = %e,
                    "gateway call failed"
                );
                record
                    .mark_failed(e.to_string())
                    .map_err(DisbursementError::NotRetryable)?;
            }
        }

        let updated = self
            .store
            .update_disbursement_if(record, DisbursementStatus::Pending)
            .await?;
        if !updated {
            return Err(DisbursementError::ConcurrentUpdate {
                id: record.id().to_string(),
            });
        }
        Ok(())
    }

    /// Gateway initiation with timeout and bounded transient retries
    ///
    /// Business rejections are returned immediately; only transient/network
    /// failures are re-attempted, with the same reference (same amount, so
    /// idempotent gateway-side).
    async fn call_gateway(
        &self,
        record: &DisbursementRecord,
    ) -> Result<GatewayResponse, GatewayError> {
        let request = PayoutRequest {
            reference: record.reference(),
            destination: record.destination().to_string(),
            amount_minor: record.amount(),
            description: format!("Collector cash-out {}", record.id()),
            currency: self.config.currency.clone(),
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = match tokio::time::timeout(
                self.config.timeout,
                self.gateway.initiate(&request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout {
                    seconds: self.config.timeout.as_secs(),
                }),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.config.max_transient_attempts => {
                    warn!(
                        reference = %request.reference,
                        attempt,
                        error = %e,
                        "transient gateway failure, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
