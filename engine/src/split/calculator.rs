//! Split Calculator
//!
//! Pure conversion of one collection event's monetary inputs into a
//! per-bucket payout breakdown for collector and platform.
//!
//! # Split Flow
//!
//! ```text
//! gross bill ── fixed request fee ──▶ platform (never shared)
//!      │
//!      └─▶ shareable ── /1.30 when urgent ──▶ base + urgent portions
//!               base   × deadhead share ──▶ core (rest to platform)
//!               urgent × 75/25          ──▶ urgent buckets
//!               distance bonus (urgent, >5km, capped) ──▶ collector
//!               surge uplift (capped at 20% of gross) ──▶ 75/25
//! tips / recyclables / loyalty sit on top, uncapped by the bill
//! ```
//!
//! # Critical Invariants
//!
//! - **Authoritative pass-through**: ledger-settled buckets are copied
//!   unchanged, never recomputed, so settled systems cannot drift.
//! - **Shareable bound**: the collector's bill-derived share never exceeds
//!   the shareable amount; a computed overrun is logged with full inputs and
//!   clamped, never silently corrected.
//! - **Urgency decomposition**: urgent bills already embed the 30% loading;
//!   it is decomposed algebraically (`base = shareable / 1.30`), never
//!   re-added on top.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::collection::{CollectionEvent, PayoutSource};
use crate::models::tip::LoyaltyTier;
use crate::split::breakdown::{BucketAmounts, EarningsBreakdown, SplitMeta};

/// Urgency loading embedded in urgent bills (percent)
pub const URGENCY_LOADING_PCT: i64 = 30;

/// Collector's share of the urgency portion (percent)
pub const URGENT_COLLECTOR_PCT: i64 = 75;

/// Collector's share of the surge uplift (percent)
pub const SURGE_COLLECTOR_PCT: i64 = 75;

/// Free deadhead allowance before the distance bonus starts (km)
pub const DISTANCE_FREE_KM: f64 = 5.0;

/// Deadhead distance beyond which no further bonus accrues (km)
pub const DISTANCE_MAX_KM: f64 = 10.0;

/// Distance bonus cap as a percentage of the shareable amount
pub const DISTANCE_CAP_PCT: i64 = 10;

/// Surge uplift cap as a percentage of the gross bill
pub const SURGE_CAP_PCT: i64 = 20;

/// Collector's share of the recycler payout (percent)
pub const RECYCLABLE_COLLECTOR_PCT: i64 = 60;

/// Customer credit share of the recycler payout (percent)
pub const RECYCLABLE_CUSTOMER_PCT: i64 = 25;

/// Average deadhead share used when distance is unknown or zero (percent)
pub const DEFAULT_DEADHEAD_SHARE_PCT: u8 = 87;

/// Errors from a single split calculation
///
/// Fatal to the one event only; batch callers skip the event and continue.
#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("Invalid {field}: {detail}")]
    InvalidInput { field: &'static str, detail: String },
}

/// Tunable rates for the split calculation
///
/// The canonical variant: deadhead-share-based core split with the fixed
/// request fee excluded from the shared pool. Older flat per-bag variants
/// are deprecated and not implemented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRates {
    /// Fixed platform request fee taken off the gross bill (cents)
    pub platform_request_fee: i64,

    /// Distance bonus per billable km (cents)
    pub distance_rate_per_km: i64,
}

impl Default for SplitRates {
    fn default() -> Self {
        Self {
            platform_request_fee: 100, // $1.00
            distance_rate_per_km: 150, // $1.50/km
        }
    }
}

/// Divide with round-half-up; n must be non-negative, d positive
fn div_round(n: i64, d: i64) -> i64 {
    (n + d / 2) / d
}

/// Percentage of an amount, round-half-up
fn pct(amount: i64, p: i64) -> i64 {
    div_round(amount * p, 100)
}

/// Deadhead distance → collector share of the base fee
///
/// Shares rise from 85% to 92% with distance. Unknown or zero distance
/// falls back to the 87% average.
///
/// Returns `(share_pct, used_default)`.
pub fn deadhead_share(deadhead_km: Option<f64>) -> (u8, bool) {
    match deadhead_km {
        None => (DEFAULT_DEADHEAD_SHARE_PCT, true),
        Some(km) if km <= 0.0 => (DEFAULT_DEADHEAD_SHARE_PCT, true),
        Some(km) if km <= 2.0 => (85, false),
        Some(km) if km <= 5.0 => (87, false),
        Some(km) if km <= 8.0 => (90, false),
        Some(_) => (92, false),
    }
}

/// Compute the per-bucket split for one collection event
///
/// # Arguments
/// * `event` - The collection event
/// * `tips_total` - Confirmed tips for the event (cents)
/// * `loyalty` - Collector's loyalty tier, if any
/// * `rates` - Split rates
///
/// # Returns
/// The two-sided breakdown. Events carrying authoritative ledger-settled
/// payouts are passed through unchanged.
///
/// # Errors
/// `SplitError::InvalidInput` for negative or non-finite monetary/distance
/// inputs.
///
/// # Example
/// ```
/// use earnings_engine_core_rs::{CollectionEvent, EventKind, PaymentChannel};
/// use earnings_engine_core_rs::split::{calculate, SplitRates};
///
/// // $100.00 bill, not urgent, unknown distance → 87% default share
/// let event = CollectionEvent::new(
///     "evt_001".to_string(),
///     "COL_A".to_string(),
///     EventKind::Standard,
///     10_000,
///     PaymentChannel::Cash,
/// );
///
/// let breakdown = calculate(&event, 0, None, &SplitRates::default()).unwrap();
/// assert_eq!(breakdown.collector.core, 8_613); // 99.00 × 87%
/// assert_eq!(breakdown.platform_total(), 1_387);
/// ```
pub fn calculate(
    event: &CollectionEvent,
    tips_total: i64,
    loyalty: Option<&LoyaltyTier>,
    rates: &SplitRates,
) -> Result<EarningsBreakdown, SplitError> {
    validate_inputs(event, tips_total)?;

    // Authoritative pass-through: the ledger already settled this event.
    if let PayoutSource::Settled(settled) = &event.payout {
        return Ok(EarningsBreakdown {
            event_id: event.id.clone(),
            gross_fee: event.gross_fee,
            platform_request_fee: 0,
            collector: BucketAmounts {
                core: settled.core,
                urgent: settled.urgent,
                distance: settled.distance,
                surge: settled.surge,
                tips: settled.tips,
                recyclables: settled.recyclables,
                loyalty: settled.loyalty,
            },
            platform: BucketAmounts::default(),
            customer_credit: 0,
            meta: SplitMeta {
                authoritative: true,
                ..SplitMeta::default()
            },
        });
    }

    let gross = event.gross_fee;
    let (share_pct, used_default) = deadhead_share(event.deadhead_km);

    // Fixed request fee off the top; 100% platform, never shared.
    let request_fee = rates.platform_request_fee.min(gross);
    let shareable = gross - request_fee;

    // Urgent bills already embed the 30% loading; decompose rather than
    // re-add, otherwise the surcharge would be counted twice.
    let (base, urgent_portion) = if event.urgent {
        let base = div_round(shareable * 100, 100 + URGENCY_LOADING_PCT);
        (base, shareable - base)
    } else {
        (shareable, 0)
    };

    let core_collector = pct(base, i64::from(share_pct));
    let core_platform = base - core_collector;

    let urgent_collector = pct(urgent_portion, URGENT_COLLECTOR_PCT);
    let urgent_platform = urgent_portion - urgent_collector;

    // Distance bonus: urgent jobs only, beyond the free allowance, km capped,
    // amount capped at 10% of the shareable amount. 100% to the collector.
    let distance_bonus = match event.deadhead_km {
        Some(km) if event.urgent && km > DISTANCE_FREE_KM => {
            let billable = km.min(DISTANCE_MAX_KM) - DISTANCE_FREE_KM;
            let raw = (billable * rates.distance_rate_per_km as f64).round() as i64;
            raw.min(pct(shareable, DISTANCE_CAP_PCT))
        }
        _ => 0,
    };

    // Surge uplift on the fee-derived portions, capped at 20% of the gross.
    let surge_uplift = if event.surge_multiplier > 1.0 {
        let raw = ((event.surge_multiplier - 1.0) * (base + urgent_portion) as f64).round() as i64;
        raw.min(pct(gross, SURGE_CAP_PCT))
    } else {
        0
    };
    let surge_collector = pct(surge_uplift, SURGE_COLLECTOR_PCT);
    let surge_platform = surge_uplift - surge_collector;

    let mut collector = BucketAmounts {
        core: core_collector,
        urgent: urgent_collector,
        distance: distance_bonus,
        surge: surge_collector,
        tips: 0,
        recyclables: 0,
        loyalty: 0,
    };

    // Invariant: bill-derived collector share must not exceed the shareable
    // amount. An overrun means upstream data drift; log it with full inputs
    // and clamp, never silently correct.
    let overrun = {
        let drawn = collector.from_bill();
        if drawn > shareable {
            let excess = drawn - shareable;
            warn!(
                event_id = %event.id,
                gross,
                shareable,
                core = collector.core,
                urgent = collector.urgent,
                distance = collector.distance,
                surge = collector.surge,
                excess,
                "collector bill share exceeds shareable amount, clamping"
            );
            clamp_overrun(&mut collector, excess);
            Some(excess)
        } else {
            None
        }
    };

    // External-source buckets on top, uncapped by the bill.
    collector.tips = tips_total;
    collector.recyclables = pct(event.recycler_gross, RECYCLABLE_COLLECTOR_PCT);
    let customer_credit = pct(event.recycler_gross, RECYCLABLE_CUSTOMER_PCT);
    let recyclables_platform = event.recycler_gross - collector.recyclables - customer_credit;

    // Loyalty cashback: percent of the fee-derived payout, platform-funded.
    // The monthly cap is applied at aggregation, where the month is visible.
    collector.loyalty = match loyalty {
        Some(tier) => pct(collector.from_bill(), i64::from(tier.cashback_pct)),
        None => 0,
    };

    let platform = BucketAmounts {
        core: core_platform,
        urgent: urgent_platform,
        distance: 0,
        surge: surge_platform,
        tips: 0,
        recyclables: recyclables_platform,
        loyalty: 0,
    };

    Ok(EarningsBreakdown {
        event_id: event.id.clone(),
        gross_fee: gross,
        platform_request_fee: request_fee,
        collector,
        platform,
        customer_credit,
        meta: SplitMeta {
            deadhead_share_pct: share_pct,
            used_default_share: used_default,
            base_portion: base,
            urgent_portion,
            surge_uplift,
            overrun,
            authoritative: false,
        },
    })
}

/// Remove an overrun from the bill-derived buckets, most derived first
fn clamp_overrun(collector: &mut BucketAmounts, mut excess: i64) {
    for bucket in [
        &mut collector.surge,
        &mut collector.distance,
        &mut collector.urgent,
        &mut collector.core,
    ] {
        let cut = excess.min(*bucket);
        *bucket -= cut;
        excess -= cut;
        if excess == 0 {
            break;
        }
    }
}

fn validate_inputs(event: &CollectionEvent, tips_total: i64) -> Result<(), SplitError> {
    if event.gross_fee < 0 {
        return Err(SplitError::InvalidInput {
            field: "gross_fee",
            detail: format!("negative amount {}", event.gross_fee),
        });
    }
    if tips_total < 0 {
        return Err(SplitError::InvalidInput {
            field: "tips_total",
            detail: format!("negative amount {tips_total}"),
        });
    }
    if event.recycler_gross < 0 {
        return Err(SplitError::InvalidInput {
            field: "recycler_gross",
            detail: format!("negative amount {}", event.recycler_gross),
        });
    }
    if !event.surge_multiplier.is_finite() || event.surge_multiplier < 1.0 {
        return Err(SplitError::InvalidInput {
            field: "surge_multiplier",
            detail: format!("must be finite and >= 1.0, got {}", event.surge_multiplier),
        });
    }
    if let Some(km) = event.deadhead_km {
        if !km.is_finite() || km < 0.0 {
            return Err(SplitError::InvalidInput {
                field: "deadhead_km",
                detail: format!("must be finite and >= 0, got {km}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collection::{EventKind, SettledPayout};
    use crate::models::payment::PaymentChannel;

    fn event(gross: i64) -> CollectionEvent {
        CollectionEvent::new(
            "evt_001".to_string(),
            "COL_A".to_string(),
            EventKind::Standard,
            gross,
            PaymentChannel::Cash,
        )
    }

    #[test]
    fn test_default_share_basic_split() {
        // Fee $100, not urgent, unknown distance, fee $1 → shareable $99
        let breakdown = calculate(&event(10_000), 0, None, &SplitRates::default()).unwrap();

        assert_eq!(breakdown.collector.core, 8_613);
        assert_eq!(breakdown.platform.core, 1_287);
        assert_eq!(breakdown.platform_total(), 1_387);
        assert_eq!(breakdown.collector_total(), 8_613);
        assert!(breakdown.meta.used_default_share);
        assert_eq!(breakdown.meta.deadhead_share_pct, 87);
    }

    #[test]
    fn test_urgency_decomposition() {
        // Fee $130 urgent → shareable $129 → base $99.23, urgent $29.77
        let e = event(13_000).with_urgent(true);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();

        assert_eq!(breakdown.meta.base_portion, 9_923);
        assert_eq!(breakdown.meta.urgent_portion, 2_977);
        assert_eq!(breakdown.collector.urgent, 2_233);
        assert_eq!(breakdown.platform.urgent, 744);
    }

    #[test]
    fn test_zero_fee_zero_buckets() {
        let breakdown = calculate(&event(0), 0, None, &SplitRates::default()).unwrap();
        assert_eq!(breakdown.collector_total(), 0);
        assert_eq!(breakdown.platform_total(), 0);
        assert_eq!(breakdown.customer_credit, 0);
    }

    #[test]
    fn test_distance_share_tiers() {
        assert_eq!(deadhead_share(None), (87, true));
        assert_eq!(deadhead_share(Some(0.0)), (87, true));
        assert_eq!(deadhead_share(Some(1.5)), (85, false));
        assert_eq!(deadhead_share(Some(4.0)), (87, false));
        assert_eq!(deadhead_share(Some(7.0)), (90, false));
        assert_eq!(deadhead_share(Some(12.0)), (92, false));
    }

    #[test]
    fn test_distance_bonus_requires_urgency() {
        let e = event(10_000).with_deadhead_km(8.0);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();
        assert_eq!(breakdown.collector.distance, 0);
    }

    #[test]
    fn test_distance_bonus_billable_km_capped() {
        // 12 km deadhead → billable capped at 10 − 5 = 5 km → 750 cents,
        // under the 10% shareable cap (990)
        let e = event(10_000).with_urgent(true).with_deadhead_km(12.0);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();
        assert_eq!(breakdown.collector.distance, 750);
    }

    #[test]
    fn test_distance_bonus_amount_capped_at_10_pct() {
        // Small bill: shareable $4 → cap 40 cents < raw 750
        let e = event(500).with_urgent(true).with_deadhead_km(12.0);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();
        assert_eq!(breakdown.collector.distance, 40);
    }

    #[test]
    fn test_surge_uplift_split_and_cap() {
        // 1.5× surge on $100 bill: uplift = 0.5 × 9900 = 4950, capped at
        // 20% of gross = 2000 → collector 1500, platform 500
        let e = event(10_000).with_surge(1.5);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();
        assert_eq!(breakdown.meta.surge_uplift, 2_000);
        assert_eq!(breakdown.collector.surge, 1_500);
        assert_eq!(breakdown.platform.surge, 500);
    }

    #[test]
    fn test_bill_invariant_holds_without_extras() {
        let e = event(10_000).with_urgent(true).with_deadhead_km(9.0);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();
        let shareable = 10_000 - breakdown.platform_request_fee;
        assert!(breakdown.collector_from_bill() <= shareable);
    }

    #[test]
    fn test_overrun_clamped_and_recorded() {
        // Surge at cap plus max distance bonus can overrun a small shareable
        let e = event(600).with_urgent(true).with_deadhead_km(12.0).with_surge(3.0);
        let breakdown = calculate(&e, 0, None, &SplitRates::default()).unwrap();
        let shareable = 600 - breakdown.platform_request_fee;
        assert!(breakdown.collector_from_bill() <= shareable);
        if let Some(excess) = breakdown.meta.overrun {
            assert!(excess > 0);
        }
    }

    #[test]
    fn test_tips_and_recyclables_on_top() {
        let e = event(10_000).with_recycler_gross(1_000);
        let breakdown = calculate(&e, 500, None, &SplitRates::default()).unwrap();

        assert_eq!(breakdown.collector.tips, 500);
        assert_eq!(breakdown.collector.recyclables, 600); // 60%
        assert_eq!(breakdown.customer_credit, 250); // 25%
        assert_eq!(breakdown.platform.recyclables, 150); // 15%
        assert_eq!(breakdown.collector_total(), 8_613 + 500 + 600);
    }

    #[test]
    fn test_loyalty_cashback_from_fee_derived_payout() {
        let tier = LoyaltyTier::new("gold".to_string(), 5, 100_000);
        let breakdown = calculate(&event(10_000), 0, Some(&tier), &SplitRates::default()).unwrap();
        // 5% of 8613 = 430.65 → 431
        assert_eq!(breakdown.collector.loyalty, 431);
    }

    #[test]
    fn test_authoritative_passthrough() {
        let settled = SettledPayout {
            core: 8_000,
            urgent: 1_000,
            distance: 0,
            surge: 0,
            tips: 250,
            recyclables: 0,
            loyalty: 50,
        };
        let e = event(10_000).with_settled_payout(settled.clone());

        // Tips and loyalty args must not be re-applied over settled figures
        let tier = LoyaltyTier::new("gold".to_string(), 5, 100_000);
        let breakdown = calculate(&e, 999, Some(&tier), &SplitRates::default()).unwrap();

        assert!(breakdown.meta.authoritative);
        assert_eq!(breakdown.collector.core, settled.core);
        assert_eq!(breakdown.collector.tips, 250);
        assert_eq!(breakdown.collector.loyalty, 50);
        assert_eq!(breakdown.collector_total(), settled.total());
    }

    #[test]
    fn test_negative_fee_rejected() {
        let result = calculate(&event(-1), 0, None, &SplitRates::default());
        assert!(matches!(
            result,
            Err(SplitError::InvalidInput { field: "gross_fee", .. })
        ));
    }

    #[test]
    fn test_bad_surge_rejected() {
        let e = event(10_000).with_surge(0.5);
        assert!(calculate(&e, 0, None, &SplitRates::default()).is_err());

        let e = event(10_000).with_surge(f64::NAN);
        assert!(calculate(&e, 0, None, &SplitRates::default()).is_err());
    }

    #[test]
    fn test_negative_distance_rejected() {
        let e = event(10_000).with_deadhead_km(-2.0);
        assert!(calculate(&e, 0, None, &SplitRates::default()).is_err());
    }
}
