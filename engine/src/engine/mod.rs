//! Earnings engine facade
//!
//! Wires the pipeline together per collector session:
//!
//! ```text
//! earnings(query) ── cache fresh ──▶ cached snapshot
//!        │
//!        ├─ cache stale ──▶ stale snapshot + background refresh task
//!        │
//!        └─ miss ──▶ fetch rows → split per event → aggregate →
//!                    reconcile → cache → return
//! ```
//!
//! Every collaborator (store, gateway, cache, telemetry) is constructed
//! explicitly and injected; the engine owns no global state. The only
//! background work is the stale-hit refresh task; its handle is kept and an
//! in-flight refresh is aborted when a newer one supersedes it.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, EarningsQuery};
use crate::cache::{CacheLookup, CachePolicy, Connectivity, SnapshotCache};
use crate::disbursement::{
    DisbursementConfig, DisbursementError, DisbursementOrchestrator, PaymentGateway,
};
use crate::models::collection::CollectionEvent;
use crate::models::disbursement::DisbursementRecord;
use crate::models::payment::PaymentRecord;
use crate::models::snapshot::EarningsSnapshot;
use crate::models::tip::LoyaltyTier;
use crate::settlement::reconcile;
use crate::split::{calculate, EarningsBreakdown, SplitRates};
use crate::store::{CollectionStore, EventFilter, StoreError};
use crate::telemetry::{CacheOutcome, FetchSource, TelemetryRecorder};

/// Errors surfaced by engine entry points
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Disbursement error: {0}")]
    Disbursement(#[from] DisbursementError),
}

/// Per-session engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Split rates applied to every event
    pub rates: SplitRates,

    /// Collector's loyalty tier, if enrolled
    pub loyalty: Option<LoyaltyTier>,

    /// Cache staleness thresholds
    pub cache: CachePolicy,

    /// Cash-out settings
    pub disbursement: DisbursementConfig,
}

/// An earnings answer with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct EarningsView {
    pub snapshot: EarningsSnapshot,

    /// Whether the snapshot came from the cache rather than a fetch
    pub from_cache: bool,

    /// Whether the cached snapshot was past the fresh TTL
    pub stale: bool,
}

/// Earnings & settlement engine for one collector session
pub struct EarningsEngine<S, G> {
    collector_id: String,
    store: Arc<S>,
    cache: SnapshotCache,
    telemetry: TelemetryRecorder,
    orchestrator: DisbursementOrchestrator<S, G>,
    config: EngineConfig,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S, G> EarningsEngine<S, G>
where
    S: CollectionStore + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(
        collector_id: String,
        store: Arc<S>,
        gateway: Arc<G>,
        telemetry: TelemetryRecorder,
        config: EngineConfig,
    ) -> Self {
        let orchestrator = DisbursementOrchestrator::new(
            Arc::clone(&store),
            gateway,
            config.disbursement.clone(),
        );
        Self {
            collector_id,
            store,
            cache: SnapshotCache::new(config.cache.clone()),
            telemetry,
            orchestrator,
            config,
            refresh_task: Mutex::new(None),
        }
    }

    /// Telemetry recorder shared with this session
    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Answer an earnings query, preferring the cache
    ///
    /// A fresh cached snapshot is returned directly. A stale one is returned
    /// immediately while a background refresh replaces it; last writer wins,
    /// which is sound because snapshots derive deterministically from the
    /// same rows. A miss forces a synchronous fetch.
    pub async fn earnings(
        &self,
        query: &EarningsQuery,
        connectivity: Connectivity,
    ) -> Result<EarningsView, EngineError> {
        match self.cache.get(connectivity, Utc::now()) {
            CacheLookup::Fresh(snapshot) => {
                self.telemetry.record_cache(CacheOutcome::FreshHit);
                Ok(EarningsView {
                    snapshot,
                    from_cache: true,
                    stale: false,
                })
            }
            CacheLookup::Stale(snapshot) => {
                self.telemetry.record_cache(CacheOutcome::StaleHit);
                if connectivity == Connectivity::Online {
                    self.spawn_refresh(query.clone());
                }
                Ok(EarningsView {
                    snapshot,
                    from_cache: true,
                    stale: true,
                })
            }
            CacheLookup::Miss => {
                self.telemetry.record_cache(CacheOutcome::Miss);
                let snapshot = self.fetch_snapshot(query).await?;
                Ok(EarningsView {
                    snapshot,
                    from_cache: false,
                    stale: false,
                })
            }
        }
    }

    /// Request a cash-out against the freshest reconciliation
    ///
    /// The available balance is re-derived from the store rather than the
    /// cache so a stale snapshot can never over-authorize; the store's own
    /// validation then applies on top.
    pub async fn request_cashout(
        &self,
        amount: i64,
        destination: &str,
    ) -> Result<DisbursementRecord, EngineError> {
        let snapshot = self.fetch_snapshot(&EarningsQuery::default()).await?;
        let available = snapshot.settlement.available_for_cashout;

        let result = self
            .orchestrator
            .request_cashout(&self.collector_id, amount, destination, available)
            .await;

        match &result {
            Ok(record) => {
                let failed = record.status() == crate::models::DisbursementStatus::Failed;
                self.telemetry.record_cashout(
                    amount,
                    !failed,
                    record.failure_reason().map(str::to_string),
                );
            }
            Err(e) => {
                self.telemetry.record_cashout(amount, false, Some(e.to_string()));
            }
        }

        // Money may have moved; drop the snapshot so the next read refetches.
        if result.is_ok() {
            self.cache.purge();
        }
        Ok(result?)
    }

    /// Retry a previously failed disbursement
    pub async fn retry_cashout(&self, id: &str) -> Result<DisbursementRecord, EngineError> {
        let result = self.orchestrator.retry_disbursement(id).await;
        match &result {
            Ok(record) => {
                let failed = record.status() == crate::models::DisbursementStatus::Failed;
                self.telemetry.record_cashout(
                    record.amount(),
                    !failed,
                    record.failure_reason().map(str::to_string),
                );
                self.cache.purge();
            }
            Err(e) => self.telemetry.record_error("retry_cashout", &e.to_string()),
        }
        Ok(result?)
    }

    /// Wait for an in-flight background refresh, if any (test support)
    pub async fn await_refresh(&self) {
        let handle = self.refresh_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Fetch rows, run the pipeline, cache and return the snapshot
    async fn fetch_snapshot(&self, query: &EarningsQuery) -> Result<EarningsSnapshot, EngineError> {
        let started = Instant::now();
        let result = build_snapshot(
            &self.collector_id,
            self.store.as_ref(),
            &self.config,
            query,
        )
        .await;
        self.telemetry
            .record_fetch(FetchSource::Remote, started.elapsed(), result.is_ok());

        match result {
            Ok((snapshot, recent)) => {
                self.cache.set(snapshot.clone(), recent);
                Ok(snapshot)
            }
            Err(e) => {
                self.telemetry.record_error("fetch_snapshot", &e.to_string());
                Err(EngineError::Store(e))
            }
        }
    }

    /// Start a background refresh, aborting any superseded one
    fn spawn_refresh(&self, query: EarningsQuery) {
        let collector_id = self.collector_id.clone();
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let cache = self.cache.clone();
        let telemetry = self.telemetry.clone();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            match build_snapshot(&collector_id, store.as_ref(), &config, &query).await {
                Ok((snapshot, recent)) => {
                    telemetry.record_fetch(FetchSource::Remote, started.elapsed(), true);
                    cache.set(snapshot, recent);
                    debug!(collector_id = %collector_id, "background refresh replaced snapshot");
                }
                Err(e) => {
                    telemetry.record_fetch(FetchSource::Remote, started.elapsed(), false);
                    // Stale answer was already served; the refresh just failed
                    // to improve on it.
                    warn!(collector_id = %collector_id, error = %e, "background refresh failed");
                }
            }
        });

        let mut slot = self.refresh_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            if !previous.is_finished() {
                info!("aborting superseded background refresh");
                previous.abort();
            }
        }
    }
}

/// Run the fetch → split → aggregate → reconcile pipeline once
async fn build_snapshot<S: CollectionStore + ?Sized>(
    collector_id: &str,
    store: &S,
    config: &EngineConfig,
    query: &EarningsQuery,
) -> Result<(EarningsSnapshot, Vec<PaymentRecord>), StoreError> {
    let filter = EventFilter {
        statuses: Vec::new(),
        from: query.from,
        to: query.to,
    };
    let events = store.fetch_events(collector_id, &filter).await?;
    let tips = store.fetch_tips(collector_id).await?;

    let aggregate = aggregate(
        collector_id,
        &events,
        &tips,
        config.loyalty.as_ref(),
        &config.rates,
        query,
        Utc::now(),
    );

    // Reconciliation spans the full event set regardless of the query's
    // status filter; settlement direction is a whole-ledger property.
    let owned: Vec<(CollectionEvent, EarningsBreakdown)> = events
        .iter()
        .filter_map(|e| {
            calculate(e, 0, config.loyalty.as_ref(), &config.rates)
                .ok()
                .map(|b| (e.clone(), b))
        })
        .collect();
    let pairs: Vec<(&CollectionEvent, &EarningsBreakdown)> =
        owned.iter().map(|(e, b)| (e, b)).collect();
    let settlement = reconcile(&pairs);

    let recent: Vec<PaymentRecord> = events
        .iter()
        .map(|e| PaymentRecord::collection(e.id.clone(), e.gross_fee, e.channel))
        .collect();

    let snapshot = EarningsSnapshot::new(
        collector_id.to_string(),
        aggregate,
        settlement,
        recent.clone(),
    );
    Ok((snapshot, recent))
}
