//! Payment record model
//!
//! One row per settlement attempt tied to a collection event. An event may
//! have several records over its life (the customer's collection payment and
//! later disbursement rows referencing the same event).
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How money moved for a payment
///
/// The channel decides who physically holds cash after the event and
/// therefore the settlement direction (see the settlement module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentChannel {
    /// Customer paid the collector in cash; the collector holds the gross
    Cash,

    /// Customer paid through the platform; the platform holds the gross
    Digital,
}

/// Status of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting confirmation
    Pending,

    /// Confirmed settled
    Success,

    /// Rejected or errored
    Failed,
}

/// What the payment row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    /// Customer paying for a pickup
    Collection,

    /// Platform paying out a collector cash-out
    Disbursement,
}

/// One settlement attempt row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique record identifier
    pub id: String,

    /// Collection event this payment belongs to
    pub event_id: String,

    /// Amount billed or disbursed (cents)
    pub amount: i64,

    /// Payment channel
    pub channel: PaymentChannel,

    /// Collection vs. disbursement row
    pub kind: PaymentKind,

    /// Current status
    pub status: PaymentStatus,

    /// Gateway-side reference, when a gateway was involved
    pub gateway_reference: Option<String>,

    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Create a pending collection payment row for an event
    pub fn collection(event_id: String, amount: i64, channel: PaymentChannel) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id,
            amount,
            channel,
            kind: PaymentKind::Collection,
            status: PaymentStatus::Pending,
            gateway_reference: None,
            created_at: Utc::now(),
        }
    }

    /// Create a pending disbursement payment row for an event
    pub fn disbursement(event_id: String, amount: i64, gateway_reference: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_id,
            amount,
            channel: PaymentChannel::Digital,
            kind: PaymentKind::Disbursement,
            status: PaymentStatus::Pending,
            gateway_reference: Some(gateway_reference),
            created_at: Utc::now(),
        }
    }
}
