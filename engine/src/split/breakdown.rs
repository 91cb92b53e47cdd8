//! Per-event earnings breakdown types
//!
//! Seven named revenue buckets for the collector and a parallel set for the
//! platform, plus the metadata the calculator records about how the split
//! was derived.
//!
//! CRITICAL: All money values are i64 (cents)

use serde::{Deserialize, Serialize};

/// Amounts per revenue bucket (cents)
///
/// The first four buckets (core, urgent, distance, surge) are drawn from the
/// customer's bill. Tips, recyclables and loyalty are funded externally and
/// sit on top, uncapped by the bill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAmounts {
    /// Share of the base fee
    pub core: i64,

    /// Share of the urgency loading
    pub urgent: i64,

    /// Distance bonus
    pub distance: i64,

    /// Share of the surge uplift
    pub surge: i64,

    /// Confirmed tips
    pub tips: i64,

    /// Share of the recycler payout
    pub recyclables: i64,

    /// Loyalty cashback
    pub loyalty: i64,
}

impl BucketAmounts {
    /// Sum of all buckets
    pub fn total(&self) -> i64 {
        self.from_bill() + self.tips + self.recyclables + self.loyalty
    }

    /// Sum of the buckets drawn from the customer's bill
    pub fn from_bill(&self) -> i64 {
        self.core + self.urgent + self.distance + self.surge
    }

    /// Add another breakdown's buckets into this one
    pub fn accumulate(&mut self, other: &BucketAmounts) {
        self.core += other.core;
        self.urgent += other.urgent;
        self.distance += other.distance;
        self.surge += other.surge;
        self.tips += other.tips;
        self.recyclables += other.recyclables;
        self.loyalty += other.loyalty;
    }
}

/// How the calculator arrived at a breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitMeta {
    /// Deadhead share percentage applied to the base portion
    pub deadhead_share_pct: u8,

    /// Whether the average share was used because distance was unknown/zero
    pub used_default_share: bool,

    /// Base portion of the shareable amount (cents)
    pub base_portion: i64,

    /// Urgency portion of the shareable amount (cents)
    pub urgent_portion: i64,

    /// Total surge uplift before the collector/platform split (cents)
    pub surge_uplift: i64,

    /// Amount clamped off the collector's bill-derived share, when the
    /// computed share exceeded the shareable amount
    ///
    /// Always logged when set; indicates an upstream calculation defect.
    pub overrun: Option<i64>,

    /// True when buckets were copied from authoritative ledger fields
    /// rather than derived
    pub authoritative: bool,
}

/// Complete two-sided split for one collection event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsBreakdown {
    /// Event the breakdown belongs to
    pub event_id: String,

    /// Gross bill paid by the customer (cents)
    pub gross_fee: i64,

    /// Fixed platform request fee taken off the top (cents); always 100%
    /// platform revenue, never part of the shared pool
    pub platform_request_fee: i64,

    /// Collector-side buckets
    pub collector: BucketAmounts,

    /// Platform-side buckets
    pub platform: BucketAmounts,

    /// Customer credit from the recycler payout (cents)
    pub customer_credit: i64,

    /// Derivation metadata
    pub meta: SplitMeta,
}

impl EarningsBreakdown {
    /// Collector's total payout for the event (cents)
    pub fn collector_total(&self) -> i64 {
        self.collector.total()
    }

    /// Platform's total revenue for the event (cents)
    pub fn platform_total(&self) -> i64 {
        self.platform_request_fee + self.platform.total()
    }

    /// Collector's share drawn from the customer's bill (cents)
    pub fn collector_from_bill(&self) -> i64 {
        self.collector.from_bill()
    }

    /// Platform's share of the customer's bill (cents)
    ///
    /// For authoritative (ledger-settled) breakdowns the platform split is
    /// not transmitted, so it is the bill residual after the collector's
    /// share. For derived breakdowns it is the request fee plus the
    /// platform's complementary bucket shares.
    pub fn platform_from_bill(&self) -> i64 {
        if self.meta.authoritative {
            (self.gross_fee - self.collector_from_bill()).max(0)
        } else {
            self.platform_request_fee + self.platform.from_bill()
        }
    }
}
