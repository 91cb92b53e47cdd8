//! Disbursement record model
//!
//! A cash-out attempt from platform to collector. Each record is a small
//! state machine:
//!
//! ```text
//! Pending → Success            (gateway confirmed)
//! Pending → Failed             (gateway rejected or errored)
//! Failed  → Pending            (caller-initiated retry, at most 3 times)
//! ```
//!
//! After the retry cap is exhausted the record is terminal and requires
//! human intervention. Status can only change through the transition
//! methods below, which reject illegal moves with a typed error.
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of retries for a failed disbursement
pub const MAX_DISBURSEMENT_RETRIES: u8 = 3;

/// Status of a disbursement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisbursementStatus {
    /// Created, or gateway call in flight / awaiting async confirmation
    Pending,

    /// Gateway confirmed the transfer
    Success,

    /// Gateway rejected or the call failed
    Failed,
}

/// Errors from illegal disbursement state transitions
#[derive(Debug, Error, PartialEq)]
pub enum DisbursementStateError {
    #[error("Disbursement is {status:?}, only Failed records can be retried")]
    NotFailed { status: DisbursementStatus },

    #[error("Retry limit reached ({retries}/{MAX_DISBURSEMENT_RETRIES}), manual intervention required")]
    RetriesExhausted { retries: u8 },

    #[error("Disbursement already terminal ({status:?})")]
    AlreadyTerminal { status: DisbursementStatus },
}

/// A single cash-out attempt
///
/// # Example
/// ```
/// use earnings_engine_core_rs::DisbursementRecord;
///
/// let record = DisbursementRecord::new(
///     "COL_A".to_string(),
///     50_000, // $500.00
///     "acct_ref_123".to_string(),
/// );
/// assert_eq!(record.amount(), 50_000);
/// assert_eq!(record.retry_count(), 0);
/// assert_eq!(record.reference(), record.id());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementRecord {
    /// Unique record identifier; doubles as the gateway idempotency base
    id: String,

    /// Collector being paid out
    collector_id: String,

    /// Requested amount (cents)
    amount: i64,

    /// Destination account reference
    destination: String,

    /// Current status
    status: DisbursementStatus,

    /// Number of retries performed so far (capped)
    retry_count: u8,

    /// Gateway's own transaction id, once known
    gateway_txn_id: Option<String>,

    /// Gateway error message from the most recent failure
    failure_reason: Option<String>,

    /// When the record was created
    created_at: DateTime<Utc>,

    /// When the record last changed state
    updated_at: DateTime<Utc>,
}

impl DisbursementRecord {
    /// Create a new pending disbursement
    ///
    /// # Arguments
    /// * `collector_id` - Collector being paid out
    /// * `amount` - Requested amount in cents (must be positive)
    /// * `destination` - Destination account reference
    ///
    /// # Panics
    /// Panics if amount <= 0. Callers validate amounts before creating
    /// records; a non-positive amount here is a programming error.
    pub fn new(collector_id: String, amount: i64, destination: String) -> Self {
        assert!(amount > 0, "amount must be positive");

        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            collector_id,
            amount,
            destination,
            status: DisbursementStatus::Pending,
            retry_count: 0,
            gateway_txn_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get the record identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the collector id
    pub fn collector_id(&self) -> &str {
        &self.collector_id
    }

    /// Get the requested amount (cents)
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Get the destination account reference
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Get the current status
    pub fn status(&self) -> DisbursementStatus {
        self.status
    }

    /// Get the number of retries performed
    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// Get the gateway's transaction id, once known
    pub fn gateway_txn_id(&self) -> Option<&str> {
        self.gateway_txn_id.as_deref()
    }

    /// Get the most recent failure reason
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Get the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last state-change timestamp
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Idempotency reference transmitted to the gateway
    ///
    /// The record id on the first attempt, suffixed with the retry number on
    /// retries so the gateway's duplicate detection does not swallow a
    /// deliberate re-submission. The reference is never reused across
    /// distinct amounts because the amount is fixed at creation.
    pub fn reference(&self) -> String {
        if self.retry_count == 0 {
            self.id.clone()
        } else {
            format!("{}-r{}", self.id, self.retry_count)
        }
    }

    /// Check whether the record is pending
    pub fn is_pending(&self) -> bool {
        self.status == DisbursementStatus::Pending
    }

    /// Check whether a retry is still permitted
    pub fn is_retryable(&self) -> bool {
        self.status == DisbursementStatus::Failed && self.retry_count < MAX_DISBURSEMENT_RETRIES
    }

    /// Record a successful gateway confirmation
    ///
    /// # Errors
    /// Returns `AlreadyTerminal` if the record is not pending.
    pub fn mark_success(&mut self, gateway_txn_id: String) -> Result<(), DisbursementStateError> {
        if self.status != DisbursementStatus::Pending {
            return Err(DisbursementStateError::AlreadyTerminal {
                status: self.status,
            });
        }
        self.status = DisbursementStatus::Success;
        self.gateway_txn_id = Some(gateway_txn_id);
        self.failure_reason = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Attach the gateway's transaction id while remaining pending
    ///
    /// Used when the gateway accepted the transfer but reports it as still
    /// pending asynchronous confirmation.
    pub fn attach_gateway_txn(&mut self, gateway_txn_id: String) {
        self.gateway_txn_id = Some(gateway_txn_id);
        self.updated_at = Utc::now();
    }

    /// Record a gateway failure
    ///
    /// # Errors
    /// Returns `AlreadyTerminal` if the record is not pending.
    pub fn mark_failed(&mut self, reason: String) -> Result<(), DisbursementStateError> {
        if self.status != DisbursementStatus::Pending {
            return Err(DisbursementStateError::AlreadyTerminal {
                status: self.status,
            });
        }
        self.status = DisbursementStatus::Failed;
        self.failure_reason = Some(reason);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Begin a retry: Failed → Pending, incrementing the retry count
    ///
    /// # Errors
    /// - `NotFailed` if the record is not in `Failed`
    /// - `RetriesExhausted` if the retry cap has been reached
    pub fn begin_retry(&mut self) -> Result<(), DisbursementStateError> {
        if self.status != DisbursementStatus::Failed {
            return Err(DisbursementStateError::NotFailed {
                status: self.status,
            });
        }
        if self.retry_count >= MAX_DISBURSEMENT_RETRIES {
            return Err(DisbursementStateError::RetriesExhausted {
                retries: self.retry_count,
            });
        }
        self.retry_count += 1;
        self.status = DisbursementStatus::Pending;
        self.updated_at = Utc::now();
        Ok(())
    }
}
