//! Row-store contract
//!
//! The durable row store holding collection/payment/tip/disbursement rows is
//! an external collaborator: a possibly-slow, possibly-failing remote
//! service the engine talks to through this trait. The engine performs no
//! locking of its own; the store's per-row conditional updates
//! (`update_disbursement_if`) are the sole mutual-exclusion mechanism for
//! money movement.

pub mod memory;

// Re-export public API
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::collection::{CollectionEvent, EventStatus};
use crate::models::disbursement::{DisbursementRecord, DisbursementStatus};
use crate::models::payment::PaymentRecord;
use crate::models::tip::TipRecord;

/// Errors surfaced by the row store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Row store unavailable: {0}")]
    Unavailable(String),

    #[error("Conditional update conflict: {0}")]
    Conflict(String),

    #[error("Row not found: {0}")]
    NotFound(String),
}

/// Filter for event fetches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Statuses to include; empty means all
    pub statuses: Vec<EventStatus>,

    /// Earliest event time (inclusive)
    pub from: Option<DateTime<Utc>>,

    /// Latest event time (inclusive)
    pub to: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Filter matching every event
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching a single status
    pub fn status(status: EventStatus) -> Self {
        Self {
            statuses: vec![status],
            ..Self::default()
        }
    }

    /// Whether an event passes this filter
    pub fn matches(&self, event: &CollectionEvent) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&event.status) {
            return false;
        }
        let at = event.effective_at();
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at > to {
                return false;
            }
        }
        true
    }
}

/// Result of the server-side cash-out validation function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashoutValidation {
    /// Whether the requested amount may be disbursed
    pub valid: bool,

    /// Balance currently available for cash-out (cents)
    pub available: i64,

    /// Human-readable rejection reason, when invalid
    pub error: Option<String>,
}

/// Read/write operations the engine issues against the row store
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Fetch a collector's events matching the filter
    async fn fetch_events(
        &self,
        collector_id: &str,
        filter: &EventFilter,
    ) -> Result<Vec<CollectionEvent>, StoreError>;

    /// Fetch a collector's confirmed tips
    async fn fetch_tips(&self, collector_id: &str) -> Result<Vec<TipRecord>, StoreError>;

    /// Server-side cash-out validation against the durable ledger
    async fn validate_cashout(
        &self,
        collector_id: &str,
        amount: i64,
    ) -> Result<CashoutValidation, StoreError>;

    /// Insert a payment row
    async fn insert_payment(&self, record: &PaymentRecord) -> Result<(), StoreError>;

    /// Insert a disbursement row
    async fn insert_disbursement(&self, record: &DisbursementRecord) -> Result<(), StoreError>;

    /// Fetch a disbursement row by id
    async fn fetch_disbursement(
        &self,
        id: &str,
    ) -> Result<Option<DisbursementRecord>, StoreError>;

    /// Conditionally replace a disbursement row
    ///
    /// The update applies only when the stored row's status equals
    /// `expected` (optimistic concurrency; e.g. "not already disbursed").
    /// Returns `false` when the predicate did not hold.
    async fn update_disbursement_if(
        &self,
        record: &DisbursementRecord,
        expected: DisbursementStatus,
    ) -> Result<bool, StoreError>;
}
