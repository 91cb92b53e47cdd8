//! Payment gateway contract
//!
//! Abstraction over the external disbursement/collection gateway. Amounts
//! are transmitted in minor units (integer cents, minimum one whole currency
//! unit); the reference accompanying a transfer must be unique per money
//! movement and is never reused across distinct amounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mandatory bound on gateway round trips (seconds)
pub const GATEWAY_TIMEOUT_SECS: u64 = 30;

/// Minimum transferable amount: one whole currency unit (cents)
pub const MIN_TRANSFER_MINOR: i64 = 100;

/// Gateway call failures
///
/// Transient/network failures are retried up to a small bound; business
/// rejections are terminal and never retried automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Gateway timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Transient gateway failure: {0}")]
    Transient(String),

    #[error("Gateway rejected the transfer: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Whether a bounded retry of the same call is appropriate
    pub fn is_transient(&self) -> bool {
        !matches!(self, GatewayError::Rejected(_))
    }
}

/// Gateway-reported status of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    /// Accepted, awaiting asynchronous confirmation
    Pending,

    /// Confirmed complete
    Success,

    /// Rejected or failed gateway-side
    Failed,
}

/// One outbound transfer request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRequest {
    /// Idempotency reference, unique per money movement
    pub reference: String,

    /// Destination account reference
    pub destination: String,

    /// Amount in minor units (cents)
    pub amount_minor: i64,

    /// Human-readable description
    pub description: String,

    /// ISO currency code
    pub currency: String,
}

/// Gateway response to an initiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Gateway's own transaction id
    pub transaction_id: String,

    /// Reported status; often `Pending` until async confirmation
    pub status: GatewayStatus,

    /// Gateway-side reference, when provided
    pub gateway_reference: Option<String>,
}

/// Gateway response to a status check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: GatewayStatus,

    /// Amount the gateway has on record (minor units)
    pub amount_minor: i64,

    /// Completion time, once terminal
    pub completed_at: Option<DateTime<Utc>>,
}

/// Abstraction over the disbursement gateway
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initiate a transfer
    async fn initiate(&self, request: &PayoutRequest) -> Result<GatewayResponse, GatewayError>;

    /// Check the status of a previously initiated transfer
    async fn check_status(
        &self,
        transaction_id: &str,
        reference: &str,
    ) -> Result<StatusResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout { seconds: 30 }.is_transient());
        assert!(GatewayError::Transient("reset".to_string()).is_transient());
        assert!(!GatewayError::Rejected("invalid account".to_string()).is_transient());
    }
}
