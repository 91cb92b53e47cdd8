//! Domain models
//!
//! Rows and value types shared by every stage of the engine. All monetary
//! fields are i64 cents.

pub mod collection;
pub mod disbursement;
pub mod payment;
pub mod snapshot;
pub mod tip;

// Re-export public API
pub use collection::{CollectionEvent, EventKind, EventStatus, PayoutSource, SettledPayout};
pub use disbursement::{DisbursementRecord, DisbursementStateError, DisbursementStatus};
pub use payment::{PaymentChannel, PaymentKind, PaymentRecord, PaymentStatus};
pub use snapshot::EarningsSnapshot;
pub use tip::{LoyaltyTier, TipRecord};
