//! Earnings & Settlement Engine - Rust Core
//!
//! Converts raw collection events into a verifiable collector/platform
//! split, aggregates earnings across time windows, reconciles who holds
//! cash versus owes cash, and drives collector cash-outs through a payment
//! gateway with retry and idempotency guarantees.
//!
//! # Architecture
//!
//! - **core**: Calendar time bucketing
//! - **models**: Domain types (CollectionEvent, PaymentRecord, DisbursementRecord, EarningsSnapshot)
//! - **split**: Per-event earnings split calculator
//! - **aggregate**: Cross-event aggregation and chart series
//! - **settlement**: Two-sided ledger reconciliation
//! - **disbursement**: Cash-out orchestration, gateway trait, webhook verification
//! - **cache**: Offline snapshot cache with staleness policy
//! - **telemetry**: Best-effort structured event log
//! - **store**: External row-store contract
//! - **engine**: Per-session facade wiring the pipeline together
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. Derived bucket sums never exceed the shareable amount (overruns are
//!    logged and clamped, never silent)
//! 3. Only disposed events are cashable; the row store's conditional
//!    updates are the sole mutual-exclusion mechanism

// Module declarations
pub mod aggregate;
pub mod cache;
pub mod core;
pub mod disbursement;
pub mod engine;
pub mod models;
pub mod settlement;
pub mod split;
pub mod store;
pub mod telemetry;

// Re-exports for convenience
pub use aggregate::{aggregate, ChartPoint, ChartSeries, EarningsAggregate, EarningsQuery};
pub use cache::{CacheLookup, CachePolicy, Connectivity, SnapshotCache};
pub use disbursement::{
    verify_webhook, DisbursementConfig, DisbursementError, DisbursementOrchestrator,
    GatewayError, GatewayResponse, GatewayStatus, PaymentGateway, PayoutRequest, StubGateway,
    WebhookConfig, WebhookVerification,
};
pub use engine::{EarningsEngine, EarningsView, EngineConfig, EngineError};
pub use models::{
    CollectionEvent, DisbursementRecord, DisbursementStateError, DisbursementStatus,
    EarningsSnapshot, EventKind, EventStatus, LoyaltyTier, PaymentChannel, PaymentKind,
    PaymentRecord, PaymentStatus, PayoutSource, SettledPayout, TipRecord,
};
pub use settlement::{reconcile, NetSettlement, SettlementReport};
pub use split::{calculate, BucketAmounts, EarningsBreakdown, SplitError, SplitMeta, SplitRates};
pub use store::{CashoutValidation, CollectionStore, EventFilter, MemoryStore, StoreError};
pub use telemetry::{TelemetryEvent, TelemetryRecorder, TelemetrySummary};
