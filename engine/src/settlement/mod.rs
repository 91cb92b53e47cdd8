//! Settlement Reconciler
//!
//! Two-sided ledger reconciliation over a collector's events. Every event is
//! classified by payment channel:
//!
//! - **Cash**: the collector physically holds the full gross bill and
//!   therefore owes the platform's share of it.
//! - **Digital**: the platform holds the full gross bill and therefore owes
//!   the collector's share of it.
//!
//! Net settlement = platform-due across cash events − collector-due across
//! digital events. Positive means the collector owes the platform; negative
//! means the platform owes the collector.
//!
//! At cash-out time the platform nets its cash-channel receivable directly
//! against what it owes through the digital channel before any money moves;
//! only a residual cash receivable (if any) becomes phase-2 payback. The
//! cashable balance is restricted to **disposed** events only — pending
//! earnings are never cashable.
//!
//! CRITICAL: All money values are i64 (cents)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::collection::CollectionEvent;
use crate::models::payment::PaymentChannel;
use crate::split::EarningsBreakdown;

/// Net monetary obligation between collector and platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetSettlement {
    /// Collector holds more platform money than they are owed
    CollectorOwesPlatform(i64),

    /// Platform holds more collector money than it is owed
    PlatformOwesCollector(i64),

    /// Both sides are square
    Settled,
}

impl NetSettlement {
    fn from_net(net: i64) -> Self {
        match net {
            n if n > 0 => NetSettlement::CollectorOwesPlatform(n),
            n if n < 0 => NetSettlement::PlatformOwesCollector(-n),
            _ => NetSettlement::Settled,
        }
    }
}

/// Reconciled settlement position for one collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Platform's share held by the collector across cash events (cents)
    pub cash_platform_due: i64,

    /// Collector's share held by the platform across digital events (cents)
    pub digital_collector_due: i64,

    /// Net obligation across all events
    pub net: NetSettlement,

    /// Cash receivable netted against the digital payout before any money
    /// moves (cents)
    pub netted_offset: i64,

    /// Residual collectable via phase-2 payback when the cash receivable
    /// exceeds what the platform owes (cents)
    pub residual_payback: i64,

    /// Cashable balance: disposed-only digital collector-due after netting
    /// the disposed-only cash receivable (cents)
    pub available_for_cashout: i64,
}

/// Reconcile settlement direction over events paired with their breakdowns
///
/// Pairs where the event and breakdown ids disagree are ignored; callers
/// produce the pairs from the same pass and a mismatch is a programming
/// error worth surfacing in logs rather than corrupting the ledger.
///
/// # Example
/// ```
/// use earnings_engine_core_rs::settlement::{reconcile, NetSettlement};
/// use earnings_engine_core_rs::split::{calculate, SplitRates};
/// use earnings_engine_core_rs::{CollectionEvent, EventKind, PaymentChannel};
///
/// let mut cash = CollectionEvent::new(
///     "cash".to_string(), "COL_A".to_string(),
///     EventKind::Standard, 10_000, PaymentChannel::Cash,
/// );
/// cash.dispose(chrono::Utc::now());
/// let breakdown = calculate(&cash, 0, None, &SplitRates::default()).unwrap();
///
/// let report = reconcile(&[(&cash, &breakdown)]);
/// // Collector holds the gross and owes the platform's cut.
/// assert_eq!(report.net, NetSettlement::CollectorOwesPlatform(1_387));
/// assert_eq!(report.available_for_cashout, 0);
/// ```
pub fn reconcile(pairs: &[(&CollectionEvent, &EarningsBreakdown)]) -> SettlementReport {
    let mut cash_platform_due = 0i64;
    let mut digital_collector_due = 0i64;
    let mut disposed_cash_due = 0i64;
    let mut disposed_digital_due = 0i64;

    for (event, breakdown) in pairs {
        if event.id != breakdown.event_id {
            debug!(
                event_id = %event.id,
                breakdown_id = %breakdown.event_id,
                "mismatched reconciliation pair ignored"
            );
            continue;
        }

        match event.channel {
            PaymentChannel::Cash => {
                let due = breakdown.platform_from_bill();
                cash_platform_due += due;
                if event.is_disposed() {
                    disposed_cash_due += due;
                }
            }
            PaymentChannel::Digital => {
                let due = breakdown.collector_from_bill();
                digital_collector_due += due;
                if event.is_disposed() {
                    disposed_digital_due += due;
                }
            }
        }
    }

    let netted_offset = cash_platform_due.min(digital_collector_due);
    let residual_payback = (cash_platform_due - digital_collector_due).max(0);
    let available_for_cashout = (disposed_digital_due - disposed_cash_due).max(0);

    SettlementReport {
        cash_platform_due,
        digital_collector_due,
        net: NetSettlement::from_net(cash_platform_due - digital_collector_due),
        netted_offset,
        residual_payback,
        available_for_cashout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::collection::EventKind;
    use crate::split::{calculate, SplitRates};
    use chrono::Utc;

    fn event(id: &str, gross: i64, channel: PaymentChannel, disposed: bool) -> CollectionEvent {
        let mut e = CollectionEvent::new(
            id.to_string(),
            "COL_A".to_string(),
            EventKind::Standard,
            gross,
            channel,
        );
        if disposed {
            e.dispose(Utc::now());
        }
        e
    }

    fn pairs(events: &[CollectionEvent]) -> Vec<(CollectionEvent, EarningsBreakdown)> {
        events
            .iter()
            .map(|e| {
                let b = calculate(e, 0, None, &SplitRates::default()).unwrap();
                (e.clone(), b)
            })
            .collect()
    }

    fn report(events: &[CollectionEvent]) -> SettlementReport {
        let owned = pairs(events);
        let borrowed: Vec<(&CollectionEvent, &EarningsBreakdown)> =
            owned.iter().map(|(e, b)| (e, b)).collect();
        reconcile(&borrowed)
    }

    #[test]
    fn test_cash_event_collector_owes_platform() {
        let r = report(&[event("e1", 10_000, PaymentChannel::Cash, true)]);
        assert_eq!(r.cash_platform_due, 1_387);
        assert_eq!(r.digital_collector_due, 0);
        assert_eq!(r.net, NetSettlement::CollectorOwesPlatform(1_387));
        assert_eq!(r.residual_payback, 1_387);
        assert_eq!(r.available_for_cashout, 0);
    }

    #[test]
    fn test_digital_event_platform_owes_collector() {
        let r = report(&[event("e1", 10_000, PaymentChannel::Digital, true)]);
        assert_eq!(r.digital_collector_due, 8_613);
        assert_eq!(r.net, NetSettlement::PlatformOwesCollector(8_613));
        assert_eq!(r.available_for_cashout, 8_613);
        assert_eq!(r.residual_payback, 0);
    }

    #[test]
    fn test_net_settlement_zero_when_balanced() {
        // Construct a balance: cash platform-due equals digital collector-due
        // by using settled payouts with known figures.
        use crate::models::collection::SettledPayout;

        let cash = event("cash", 10_000, PaymentChannel::Cash, true).with_settled_payout(
            SettledPayout {
                core: 8_000, // platform residual 2_000
                ..Default::default()
            },
        );
        let digital = event("dig", 10_000, PaymentChannel::Digital, true).with_settled_payout(
            SettledPayout {
                core: 2_000, // collector due 2_000
                ..Default::default()
            },
        );

        let r = report(&[cash, digital]);
        assert_eq!(r.cash_platform_due, 2_000);
        assert_eq!(r.digital_collector_due, 2_000);
        assert_eq!(r.net, NetSettlement::Settled);
        assert_eq!(r.netted_offset, 2_000);
        assert_eq!(r.residual_payback, 0);
        assert_eq!(r.available_for_cashout, 0);
    }

    #[test]
    fn test_netting_platform_owes_residual() {
        // Cash platform-due 2_000, digital collector-due 3_500 →
        // net: platform owes 1_500, no phase-2 payback needed.
        use crate::models::collection::SettledPayout;

        let cash = event("cash", 10_000, PaymentChannel::Cash, true).with_settled_payout(
            SettledPayout {
                core: 8_000,
                ..Default::default()
            },
        );
        let digital = event("dig", 10_000, PaymentChannel::Digital, true).with_settled_payout(
            SettledPayout {
                core: 3_500,
                ..Default::default()
            },
        );

        let r = report(&[cash, digital]);
        assert_eq!(r.net, NetSettlement::PlatformOwesCollector(1_500));
        assert_eq!(r.netted_offset, 2_000);
        assert_eq!(r.residual_payback, 0);
        assert_eq!(r.available_for_cashout, 1_500);
    }

    #[test]
    fn test_pending_events_never_cashable() {
        let r = report(&[
            event("pending", 10_000, PaymentChannel::Digital, false),
            event("done", 10_000, PaymentChannel::Digital, true),
        ]);

        // Both contribute to the overall position...
        assert_eq!(r.digital_collector_due, 2 * 8_613);
        // ...but only the disposed one is cashable.
        assert_eq!(r.available_for_cashout, 8_613);
    }

    #[test]
    fn test_mismatched_pair_ignored() {
        let e = event("e1", 10_000, PaymentChannel::Cash, true);
        let other = event("e2", 10_000, PaymentChannel::Cash, true);
        let b = calculate(&other, 0, None, &SplitRates::default()).unwrap();

        let r = reconcile(&[(&e, &b)]);
        assert_eq!(r.cash_platform_due, 0);
        assert_eq!(r.net, NetSettlement::Settled);
    }
}
