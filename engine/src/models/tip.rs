//! Tips and loyalty tiers
//!
//! External inputs to the split calculator: confirmed tips per event, and a
//! monthly loyalty tier granting a platform-funded cashback with a cap on
//! how much can be earned per calendar month.
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A confirmed tip for a collection event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipRecord {
    /// Collection event the tip belongs to
    pub event_id: String,

    /// Collector who receives it
    pub collector_id: String,

    /// Tip amount (cents); 100% to the collector
    pub amount: i64,

    /// When the tip was confirmed
    pub confirmed_at: DateTime<Utc>,
}

impl TipRecord {
    /// Create a confirmed tip
    pub fn new(event_id: String, collector_id: String, amount: i64) -> Self {
        Self {
            event_id,
            collector_id,
            amount,
            confirmed_at: Utc::now(),
        }
    }
}

/// A collector's loyalty tier for the current month
///
/// Grants a cashback percentage of fee-derived payouts, funded by the
/// platform, capped per calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyTier {
    /// Tier name (e.g. "bronze", "gold")
    pub name: String,

    /// Cashback rate as an integer percentage of the fee-derived payout
    pub cashback_pct: u8,

    /// Maximum cashback earnable per calendar month (cents)
    pub monthly_cap: i64,
}

impl LoyaltyTier {
    /// Create a loyalty tier
    pub fn new(name: String, cashback_pct: u8, monthly_cap: i64) -> Self {
        Self {
            name,
            cashback_pct,
            monthly_cap,
        }
    }
}
