//! Split Calculator
//!
//! Converts a single collection event's monetary inputs into a per-bucket
//! payout breakdown (core, urgent, distance, surge, tips, recyclables,
//! loyalty) for both collector and platform, with an authoritative
//! pass-through when the upstream ledger already settled the event.

pub mod breakdown;
pub mod calculator;

// Re-export public API
pub use breakdown::{BucketAmounts, EarningsBreakdown, SplitMeta};
pub use calculator::{calculate, deadhead_share, SplitError, SplitRates};
