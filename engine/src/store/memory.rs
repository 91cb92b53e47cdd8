//! In-memory row store for development and testing.
//!
//! Implements the full `CollectionStore` contract, including the server-side
//! cash-out validation (computed from disposed rows the same way the durable
//! ledger does) and the conditional disbursement update that provides
//! optimistic concurrency. An outage can be simulated for failure-path
//! tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::models::collection::CollectionEvent;
use crate::models::disbursement::{DisbursementRecord, DisbursementStatus};
use crate::models::payment::PaymentRecord;
use crate::models::tip::TipRecord;
use crate::settlement::reconcile;
use crate::split::{calculate, EarningsBreakdown, SplitRates};
use crate::store::{CashoutValidation, CollectionStore, EventFilter, StoreError};

#[derive(Default)]
struct Rows {
    events: Vec<CollectionEvent>,
    tips: Vec<TipRecord>,
    payments: Vec<PaymentRecord>,
    disbursements: HashMap<String, DisbursementRecord>,
}

/// HashMap-backed store, shared via `Arc`
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Rows>>,
    unavailable: Arc<AtomicBool>,
    rates: SplitRates,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }

    /// Simulate (or clear) a store outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed a collection event
    pub fn add_event(&self, event: CollectionEvent) {
        self.lock().events.push(event);
    }

    /// Seed a confirmed tip
    pub fn add_tip(&self, tip: TipRecord) {
        self.lock().tips.push(tip);
    }

    /// Snapshot of all disbursement rows (test inspection)
    pub fn disbursements(&self) -> Vec<DisbursementRecord> {
        self.lock().disbursements.values().cloned().collect()
    }

    /// Available balance per the durable ledger: disposed-only reconciled
    /// position minus disbursements that are not failed
    fn compute_available(rows: &Rows, collector_id: &str, rates: &SplitRates) -> i64 {
        let owned: Vec<(CollectionEvent, EarningsBreakdown)> = rows
            .events
            .iter()
            .filter(|e| e.collector_id == collector_id)
            .filter_map(|e| {
                calculate(e, 0, None, rates)
                    .ok()
                    .map(|b| (e.clone(), b))
            })
            .collect();
        let pairs: Vec<(&CollectionEvent, &EarningsBreakdown)> =
            owned.iter().map(|(e, b)| (e, b)).collect();
        let report = reconcile(&pairs);

        let reserved: i64 = rows
            .disbursements
            .values()
            .filter(|d| {
                d.collector_id() == collector_id && d.status() != DisbursementStatus::Failed
            })
            .map(|d| d.amount())
            .sum();

        (report.available_for_cashout - reserved).max(0)
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn fetch_events(
        &self,
        collector_id: &str,
        filter: &EventFilter,
    ) -> Result<Vec<CollectionEvent>, StoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .events
            .iter()
            .filter(|e| e.collector_id == collector_id && filter.matches(e))
            .cloned()
            .collect())
    }

    async fn fetch_tips(&self, collector_id: &str) -> Result<Vec<TipRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .lock()
            .tips
            .iter()
            .filter(|t| t.collector_id == collector_id)
            .cloned()
            .collect())
    }

    async fn validate_cashout(
        &self,
        collector_id: &str,
        amount: i64,
    ) -> Result<CashoutValidation, StoreError> {
        self.check_available()?;
        let rows = self.lock();
        let available = Self::compute_available(&rows, collector_id, &self.rates);

        if amount > 0 && amount <= available {
            Ok(CashoutValidation {
                valid: true,
                available,
                error: None,
            })
        } else {
            Ok(CashoutValidation {
                valid: false,
                available,
                error: Some(if available <= 0 {
                    "no finalized collections available".to_string()
                } else {
                    format!("requested {amount} exceeds available {available}")
                }),
            })
        }
    }

    async fn insert_payment(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        self.check_available()?;
        self.lock().payments.push(record.clone());
        Ok(())
    }

    async fn insert_disbursement(&self, record: &DisbursementRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let mut rows = self.lock();
        if rows.disbursements.contains_key(record.id()) {
            return Err(StoreError::Conflict(format!(
                "disbursement {} already exists",
                record.id()
            )));
        }
        rows.disbursements
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn fetch_disbursement(
        &self,
        id: &str,
    ) -> Result<Option<DisbursementRecord>, StoreError> {
        self.check_available()?;
        Ok(self.lock().disbursements.get(id).cloned())
    }

    async fn update_disbursement_if(
        &self,
        record: &DisbursementRecord,
        expected: DisbursementStatus,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut rows = self.lock();
        match rows.disbursements.get_mut(record.id()) {
            Some(stored) if stored.status() == expected => {
                *stored = record.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!(
                "disbursement {}",
                record.id()
            ))),
        }
    }
}
