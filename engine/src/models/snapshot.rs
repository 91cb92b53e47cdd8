//! Cached earnings snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::EarningsAggregate;
use crate::models::payment::PaymentRecord;
use crate::settlement::SettlementReport;

/// Immutable aggregate + reconciliation output with a creation timestamp
///
/// Snapshots are replaced, never mutated in place; the cache holds at most
/// one per collector session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsSnapshot {
    /// Collector the snapshot belongs to
    pub collector_id: String,

    /// Aggregated earnings at snapshot time
    pub aggregate: EarningsAggregate,

    /// Reconciled settlement position at snapshot time
    pub settlement: SettlementReport,

    /// Recent payment rows, capped by the cache
    pub recent_transactions: Vec<PaymentRecord>,

    /// When the snapshot was derived
    pub created_at: DateTime<Utc>,
}

impl EarningsSnapshot {
    pub fn new(
        collector_id: String,
        aggregate: EarningsAggregate,
        settlement: SettlementReport,
        recent_transactions: Vec<PaymentRecord>,
    ) -> Self {
        Self {
            collector_id,
            aggregate,
            settlement,
            recent_transactions,
            created_at: Utc::now(),
        }
    }

    /// Age of the snapshot relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }
}
