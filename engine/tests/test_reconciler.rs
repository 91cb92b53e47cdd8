//! Integration tests for the settlement reconciler.
//!
//! Channel classification, net settlement direction, cash-out netting and
//! the disposed-only cashable balance.

use chrono::Utc;
use earnings_engine_core_rs::settlement::{reconcile, NetSettlement};
use earnings_engine_core_rs::split::{calculate, EarningsBreakdown, SplitRates};
use earnings_engine_core_rs::{
    CollectionEvent, EventKind, PaymentChannel, SettledPayout,
};

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

fn settled(id: &str, collector_core: i64, channel: PaymentChannel) -> CollectionEvent {
    event(id, 10_000, channel, true).with_settled_payout(SettledPayout {
        core: collector_core,
        ..Default::default()
    })
}

fn report(events: &[CollectionEvent]) -> earnings_engine_core_rs::SettlementReport {
    let owned: Vec<(CollectionEvent, EarningsBreakdown)> = events
        .iter()
        .map(|e| {
            let b = calculate(e, 0, None, &SplitRates::default()).unwrap();
            (e.clone(), b)
        })
        .collect();
    let pairs: Vec<(&CollectionEvent, &EarningsBreakdown)> =
        owned.iter().map(|(e, b)| (e, b)).collect();
    reconcile(&pairs)
}

// ============================================================================
// Settlement direction
// ============================================================================

#[test]
fn test_cash_only_collector_owes_platform() {
    let r = report(&[
        event("c1", 10_000, PaymentChannel::Cash, true),
        event("c2", 10_000, PaymentChannel::Cash, true),
    ]);

    assert_eq!(r.cash_platform_due, 2 * 1_387);
    assert_eq!(r.net, NetSettlement::CollectorOwesPlatform(2 * 1_387));
    assert_eq!(r.available_for_cashout, 0);
}

#[test]
fn test_digital_only_platform_owes_collector() {
    let r = report(&[event("d1", 10_000, PaymentChannel::Digital, true)]);

    assert_eq!(r.digital_collector_due, 8_613);
    assert_eq!(r.net, NetSettlement::PlatformOwesCollector(8_613));
    assert_eq!(r.available_for_cashout, 8_613);
}

#[test]
fn test_platform_owes_net_of_cash_receivable() {
    // Cash platform-due $20.00 vs digital collector-due $35.00:
    // net settlement −$15.00 (platform owes), netting leaves no payback.
    let cash = settled("cash", 8_000, PaymentChannel::Cash); // residual 2_000
    let digital = settled("dig", 3_500, PaymentChannel::Digital);

    let r = report(&[cash, digital]);
    assert_eq!(r.cash_platform_due, 2_000);
    assert_eq!(r.digital_collector_due, 3_500);
    assert_eq!(r.net, NetSettlement::PlatformOwesCollector(1_500));
    assert_eq!(r.netted_offset, 2_000);
    assert_eq!(r.residual_payback, 0);
    assert_eq!(r.available_for_cashout, 1_500);
}

#[test]
fn test_residual_payback_when_cash_exceeds_digital() {
    // Cash receivable 2_000 vs digital owed 500: the 500 nets to zero and
    // 1_500 remains collectable via phase-2 payback.
    let cash = settled("cash", 8_000, PaymentChannel::Cash);
    let digital = settled("dig", 500, PaymentChannel::Digital);

    let r = report(&[cash, digital]);
    assert_eq!(r.net, NetSettlement::CollectorOwesPlatform(1_500));
    assert_eq!(r.netted_offset, 500);
    assert_eq!(r.residual_payback, 1_500);
    assert_eq!(r.available_for_cashout, 0);
}

#[test]
fn test_balanced_ledger_settled() {
    let cash = settled("cash", 8_000, PaymentChannel::Cash);
    let digital = settled("dig", 2_000, PaymentChannel::Digital);

    let r = report(&[cash, digital]);
    assert_eq!(r.net, NetSettlement::Settled);
    assert_eq!(r.residual_payback, 0);
}

// ============================================================================
// Cashable balance
// ============================================================================

#[test]
fn test_only_disposed_digital_events_cashable() {
    let r = report(&[
        event("open", 10_000, PaymentChannel::Digital, false),
        event("done", 10_000, PaymentChannel::Digital, true),
        event("cash_open", 10_000, PaymentChannel::Cash, false),
    ]);

    // The pending digital event counts toward the position but not the
    // cashable balance; the pending cash event counts toward neither side
    // of the disposed-only netting.
    assert_eq!(r.digital_collector_due, 2 * 8_613);
    assert_eq!(r.available_for_cashout, 8_613);
}

#[test]
fn test_disposed_cash_receivable_reduces_cashable() {
    let r = report(&[
        event("dig", 10_000, PaymentChannel::Digital, true),
        event("cash", 10_000, PaymentChannel::Cash, true),
    ]);

    assert_eq!(r.available_for_cashout, 8_613 - 1_387);
}

#[test]
fn test_empty_ledger() {
    let r = report(&[]);
    assert_eq!(r.net, NetSettlement::Settled);
    assert_eq!(r.available_for_cashout, 0);
    assert_eq!(r.residual_payback, 0);
}
