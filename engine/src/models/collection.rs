//! Collection event model
//!
//! Represents one paid pickup: a customer paid for a waste collection and a
//! collector carried it out. Two request variants exist (standard request,
//! digital-bin request) but both settle through the same engine.
//!
//! An event either carries **authoritative payout fields** already computed
//! by the upstream ledger (`PayoutSource::Settled`) or only the raw monetary
//! inputs (`PayoutSource::Unsettled`). The split calculator pattern-matches
//! on this; settled buckets are passed through verbatim and never recomputed.
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::payment::PaymentChannel;

/// Request variant for a collection event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// One-off pickup request
    Standard,

    /// Recurring digital-bin pickup
    DigitalBin,
}

/// Lifecycle status of a collection event
///
/// Events move `PickedUp` → `Disposed`. Only disposed (finalized) events
/// contribute to the cashable balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    /// Collected from the customer, not yet dropped at a disposal site
    PickedUp,

    /// Dropped at a disposal site; earnings are finalized
    Disposed,
}

/// Authoritative per-bucket collector payouts computed by the upstream ledger
///
/// When present these are canonical. The calculator copies them through
/// unchanged so two systems that already settled can never drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledPayout {
    /// Collector's share of the base fee (cents)
    pub core: i64,

    /// Collector's share of the urgency loading (cents)
    pub urgent: i64,

    /// Distance bonus (cents)
    pub distance: i64,

    /// Collector's share of the surge uplift (cents)
    pub surge: i64,

    /// Confirmed tips (cents)
    pub tips: i64,

    /// Collector's share of the recycler payout (cents)
    pub recyclables: i64,

    /// Loyalty cashback (cents)
    pub loyalty: i64,
}

impl SettledPayout {
    /// Sum of all authoritative collector buckets (cents)
    pub fn total(&self) -> i64 {
        self.core
            + self.urgent
            + self.distance
            + self.surge
            + self.tips
            + self.recyclables
            + self.loyalty
    }

    /// Sum of the buckets drawn from the customer's bill (cents)
    ///
    /// Excludes tips, recyclables and loyalty, which are funded outside the
    /// bill.
    pub fn from_bill(&self) -> i64 {
        self.core + self.urgent + self.distance + self.surge
    }
}

/// Where the payout figures for an event come from
///
/// Tagged union replacing the upstream's "authoritative field present?"
/// null-check: either the ledger already settled the event, or the engine
/// must derive the split from raw inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayoutSource {
    /// Ledger-settled: buckets are canonical, pass through unchanged
    Settled(SettledPayout),

    /// Not yet settled: derive the split from the event's raw inputs
    Unsettled,
}

/// One paid pickup as read from the row store
///
/// # Example
/// ```
/// use earnings_engine_core_rs::{CollectionEvent, EventKind, PaymentChannel};
///
/// let event = CollectionEvent::new(
///     "evt_001".to_string(),
///     "COL_A".to_string(),
///     EventKind::Standard,
///     10_000, // $100.00 gross bill
///     PaymentChannel::Cash,
/// );
/// assert_eq!(event.gross_fee, 10_000);
/// assert!(!event.urgent);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEvent {
    /// Unique event identifier
    pub id: String,

    /// Collector who carried out the pickup
    pub collector_id: String,

    /// Request variant
    pub kind: EventKind,

    /// Gross bill paid by the customer (cents)
    pub gross_fee: i64,

    /// Urgency flag; urgent bills embed a fixed 30% loading
    pub urgent: bool,

    /// Empty-travel distance attributable to this job (km)
    ///
    /// `None` (or zero) means unknown; the calculator falls back to the
    /// average deadhead share.
    pub deadhead_km: Option<f64>,

    /// Surge multiplier, >= 1.0
    pub surge_multiplier: f64,

    /// Gross payout received from the recycler for this load (cents, may be 0)
    pub recycler_gross: i64,

    /// Customer rating for this job, if given (1.0 - 5.0)
    pub rating: Option<f32>,

    /// Lifecycle status
    pub status: EventStatus,

    /// How the customer paid; drives settlement direction
    pub channel: PaymentChannel,

    /// When the load was picked up
    pub picked_up_at: DateTime<Utc>,

    /// When the load was disposed (None while status is PickedUp)
    pub disposed_at: Option<DateTime<Utc>>,

    /// Payout figures: ledger-settled or to be derived
    pub payout: PayoutSource,
}

impl CollectionEvent {
    /// Create a new unsettled, picked-up event with neutral extras
    ///
    /// # Arguments
    /// * `id` - Unique event identifier
    /// * `collector_id` - Collector who carried out the pickup
    /// * `kind` - Request variant
    /// * `gross_fee` - Gross bill in cents
    /// * `channel` - Payment channel used by the customer
    pub fn new(
        id: String,
        collector_id: String,
        kind: EventKind,
        gross_fee: i64,
        channel: PaymentChannel,
    ) -> Self {
        Self {
            id,
            collector_id,
            kind,
            gross_fee,
            urgent: false,
            deadhead_km: None,
            surge_multiplier: 1.0,
            recycler_gross: 0,
            rating: None,
            status: EventStatus::PickedUp,
            channel,
            picked_up_at: Utc::now(),
            disposed_at: None,
            payout: PayoutSource::Unsettled,
        }
    }

    /// Set the urgency flag (builder pattern)
    pub fn with_urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    /// Set the deadhead distance in km (builder pattern)
    pub fn with_deadhead_km(mut self, km: f64) -> Self {
        self.deadhead_km = Some(km);
        self
    }

    /// Set the surge multiplier (builder pattern)
    pub fn with_surge(mut self, multiplier: f64) -> Self {
        self.surge_multiplier = multiplier;
        self
    }

    /// Set the recycler gross payout in cents (builder pattern)
    pub fn with_recycler_gross(mut self, cents: i64) -> Self {
        self.recycler_gross = cents;
        self
    }

    /// Attach authoritative ledger-settled payout buckets (builder pattern)
    pub fn with_settled_payout(mut self, payout: SettledPayout) -> Self {
        self.payout = PayoutSource::Settled(payout);
        self
    }

    /// Mark the event disposed at the given time
    pub fn dispose(&mut self, at: DateTime<Utc>) {
        self.status = EventStatus::Disposed;
        self.disposed_at = Some(at);
    }

    /// Check whether earnings from this event are finalized
    pub fn is_disposed(&self) -> bool {
        self.status == EventStatus::Disposed
    }

    /// Timestamp used for time-bucketed aggregation
    ///
    /// Disposal time once finalized, pickup time before that.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.disposed_at.unwrap_or(self.picked_up_at)
    }
}
