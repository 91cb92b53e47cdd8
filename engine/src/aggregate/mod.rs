//! Aggregator
//!
//! Sums split-calculator outputs across an event set: totals, per-bucket
//! sums, pending-vs-disposed split, job counts, rolling weekly/monthly sums
//! and day/week/month chart series.
//!
//! # Critical Invariants
//!
//! - **Order independence**: aggregation is associative; feeding the same
//!   event set in any order yields identical output. Series grouping goes
//!   through ordered maps keyed by bucket start.
//! - **Batch resilience**: an invalid event fails only itself; it is skipped
//!   with a warning and counted, never aborting the batch.
//! - **Monthly loyalty cap**: per-event cashback is derived uncapped; the
//!   calendar-month cap is enforced here, where the whole month is visible.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::window::{bucket_start, Granularity, MonthKey};
use crate::models::collection::{CollectionEvent, EventStatus};
use crate::models::tip::{LoyaltyTier, TipRecord};
use crate::split::{calculate, BucketAmounts, SplitRates};

/// Filter for an earnings request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EarningsQuery {
    /// Earliest event time to include (inclusive)
    pub from: Option<DateTime<Utc>>,

    /// Latest event time to include (inclusive)
    pub to: Option<DateTime<Utc>>,

    /// Restrict to one lifecycle status
    pub status: Option<EventStatus>,
}

impl EarningsQuery {
    fn matches(&self, event: &CollectionEvent) -> bool {
        let at = event.effective_at();
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at > to {
                return false;
            }
        }
        if let Some(status) = self.status {
            if event.status != status {
                return false;
            }
        }
        true
    }
}

/// One point in a chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Start of the bucket (UTC midnight)
    pub bucket_start: DateTime<Utc>,

    /// Collector earnings in this bucket (cents)
    pub amount: i64,

    /// Jobs in this bucket
    pub jobs: usize,
}

/// Time-bucketed earnings series at a fixed granularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub granularity: Granularity,

    /// Points in ascending bucket order; empty buckets are omitted
    pub points: Vec<ChartPoint>,
}

/// Aggregated earnings for one collector
///
/// CRITICAL: All money values are i64 (cents)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsAggregate {
    /// Collector the aggregate belongs to
    pub collector_id: String,

    /// Total collector earnings across all included events (cents)
    pub total_earnings: i64,

    /// Earnings from picked-up, not yet disposed events (cents)
    pub pending_earnings: i64,

    /// Earnings from disposed (finalized) events (cents)
    pub disposed_earnings: i64,

    /// Per-bucket collector sums
    pub buckets: BucketAmounts,

    /// Number of included events
    pub job_count: usize,

    /// Included events still pending disposal
    pub pending_jobs: usize,

    /// Included events already disposed
    pub disposed_jobs: usize,

    /// Rolling earnings over the 7 days up to `now` (cents)
    pub weekly_earnings: i64,

    /// Rolling earnings over the 30 days up to `now` (cents)
    pub monthly_earnings: i64,

    /// Per-day chart series
    pub daily_series: ChartSeries,

    /// Per-week chart series
    pub weekly_series: ChartSeries,

    /// Per-month chart series
    pub monthly_series: ChartSeries,

    /// Disposed fraction of included jobs (0.0 when no jobs)
    pub completion_rate: f64,

    /// Mean customer rating across rated jobs
    pub average_rating: Option<f64>,

    /// Events skipped because their inputs failed validation
    pub skipped_events: usize,

    /// Whether any calendar month hit the loyalty cashback cap
    pub loyalty_cap_applied: bool,
}

/// Aggregate split-calculator outputs across an event set
///
/// # Arguments
/// * `collector_id` - Collector the events belong to
/// * `events` - Collection events (mixed variants, any order)
/// * `tips` - Confirmed tips, matched to events by id
/// * `loyalty` - Collector's loyalty tier, if any
/// * `rates` - Split rates
/// * `query` - Date-range / status filter
/// * `now` - Reference instant for the rolling sums
pub fn aggregate(
    collector_id: &str,
    events: &[CollectionEvent],
    tips: &[TipRecord],
    loyalty: Option<&LoyaltyTier>,
    rates: &SplitRates,
    query: &EarningsQuery,
    now: DateTime<Utc>,
) -> EarningsAggregate {
    let mut tips_by_event: HashMap<&str, i64> = HashMap::new();
    for tip in tips {
        *tips_by_event.entry(tip.event_id.as_str()).or_insert(0) += tip.amount;
    }

    let week_ago = now - Duration::days(7);
    let month_ago = now - Duration::days(30);

    let mut totals = BucketAmounts::default();
    let mut pending_earnings = 0i64;
    let mut disposed_earnings = 0i64;
    let mut pending_jobs = 0usize;
    let mut disposed_jobs = 0usize;
    let mut weekly_earnings = 0i64;
    let mut monthly_earnings = 0i64;
    let mut skipped = 0usize;
    let mut rating_sum = 0f64;
    let mut rating_count = 0usize;

    let mut daily: BTreeMap<DateTime<Utc>, (i64, usize)> = BTreeMap::new();
    let mut weekly: BTreeMap<DateTime<Utc>, (i64, usize)> = BTreeMap::new();
    let mut monthly: BTreeMap<DateTime<Utc>, (i64, usize)> = BTreeMap::new();
    let mut cashback_by_month: BTreeMap<MonthKey, i64> = BTreeMap::new();

    for event in events {
        if !query.matches(event) {
            continue;
        }

        let tips_total = tips_by_event.get(event.id.as_str()).copied().unwrap_or(0);
        let breakdown = match calculate(event, tips_total, loyalty, rates) {
            Ok(b) => b,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "skipping event with invalid inputs");
                skipped += 1;
                continue;
            }
        };

        let earned = breakdown.collector_total();
        totals.accumulate(&breakdown.collector);

        if event.is_disposed() {
            disposed_earnings += earned;
            disposed_jobs += 1;
        } else {
            pending_earnings += earned;
            pending_jobs += 1;
        }

        let at = event.effective_at();
        if at > week_ago && at <= now {
            weekly_earnings += earned;
        }
        if at > month_ago && at <= now {
            monthly_earnings += earned;
        }

        for (map, granularity) in [
            (&mut daily, Granularity::Day),
            (&mut weekly, Granularity::Week),
            (&mut monthly, Granularity::Month),
        ] {
            let slot = map.entry(bucket_start(granularity, at)).or_insert((0, 0));
            slot.0 += earned;
            slot.1 += 1;
        }

        *cashback_by_month.entry(MonthKey::of(at)).or_insert(0) += breakdown.collector.loyalty;

        if let Some(rating) = event.rating {
            rating_sum += f64::from(rating);
            rating_count += 1;
        }
    }

    // Enforce the monthly loyalty cap across the whole month's cashback.
    let mut loyalty_cap_applied = false;
    if let Some(tier) = loyalty {
        let mut excess_total = 0i64;
        for cashback in cashback_by_month.values() {
            let excess = (cashback - tier.monthly_cap).max(0);
            if excess > 0 {
                excess_total += excess;
                loyalty_cap_applied = true;
            }
        }
        if excess_total > 0 {
            totals.loyalty -= excess_total;
            // Take the excess out of finalized earnings first.
            let from_disposed = excess_total.min(disposed_earnings);
            disposed_earnings -= from_disposed;
            pending_earnings -= excess_total - from_disposed;
        }
    }

    let job_count = pending_jobs + disposed_jobs;
    let completion_rate = if job_count > 0 {
        disposed_jobs as f64 / job_count as f64
    } else {
        0.0
    };

    EarningsAggregate {
        collector_id: collector_id.to_string(),
        total_earnings: pending_earnings + disposed_earnings,
        pending_earnings,
        disposed_earnings,
        buckets: totals,
        job_count,
        pending_jobs,
        disposed_jobs,
        weekly_earnings,
        monthly_earnings,
        daily_series: to_series(Granularity::Day, daily),
        weekly_series: to_series(Granularity::Week, weekly),
        monthly_series: to_series(Granularity::Month, monthly),
        completion_rate,
        average_rating: if rating_count > 0 {
            Some(rating_sum / rating_count as f64)
        } else {
            None
        },
        skipped_events: skipped,
        loyalty_cap_applied,
    }
}

fn to_series(
    granularity: Granularity,
    map: BTreeMap<DateTime<Utc>, (i64, usize)>,
) -> ChartSeries {
    ChartSeries {
        granularity,
        points: map
            .into_iter()
            .map(|(start, (amount, jobs))| ChartPoint {
                bucket_start: start,
                amount,
                jobs,
            })
            .collect(),
    }
}
