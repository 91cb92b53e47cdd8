//! Offline Cache Manager
//!
//! Holds the last-known-good `EarningsSnapshot` so the engine can answer
//! earnings queries while the remote row store is slow or unreachable.
//!
//! Staleness policy:
//!
//! - **Online**: a snapshot within the fresh TTL is a `Fresh` hit; past the
//!   fresh TTL but within the offline TTL it is a `Stale` hit (the caller
//!   serves it and triggers a non-blocking background refresh); older is a
//!   `Miss`.
//! - **Offline**: the acceptable age widens to the offline TTL; anything
//!   within it is served as `Fresh` since no refresh is possible anyway.
//!
//! Entries are stored as serialized JSON bytes, matching the durable cache
//! file the snapshot would round-trip through. A corrupt entry is purged and
//! reported as a `Miss`, never as an error to the caller.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::payment::PaymentRecord;
use crate::models::snapshot::EarningsSnapshot;

/// Default fresh TTL: five minutes
pub const DEFAULT_FRESH_TTL: Duration = Duration::from_secs(5 * 60);

/// Default offline-tolerant TTL: 24 hours
pub const DEFAULT_OFFLINE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum retained recent transactions per snapshot
pub const MAX_RECENT_TRANSACTIONS: usize = 50;

/// Whether the device currently has connectivity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Outcome of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Snapshot within the acceptable fresh window
    Fresh(EarningsSnapshot),

    /// Snapshot usable but past the fresh TTL; caller should refresh
    Stale(EarningsSnapshot),

    /// Nothing usable cached
    Miss,
}

impl CacheLookup {
    /// The snapshot, if any, regardless of staleness
    pub fn snapshot(&self) -> Option<&EarningsSnapshot> {
        match self {
            CacheLookup::Fresh(s) | CacheLookup::Stale(s) => Some(s),
            CacheLookup::Miss => None,
        }
    }
}

/// Staleness thresholds
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Maximum age served without refresh while online
    pub fresh_ttl: Duration,

    /// Maximum age served at all (stale online, fresh offline)
    pub offline_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_ttl: DEFAULT_FRESH_TTL,
            offline_ttl: DEFAULT_OFFLINE_TTL,
        }
    }
}

/// Single-slot snapshot cache with staleness policy
///
/// The slot is the only shared mutable state in the engine besides the
/// telemetry log; it is replaced atomically, never mutated in place.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
    policy: CachePolicy,
}

impl SnapshotCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<u8>>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read the cached snapshot under the staleness policy
    pub fn get(&self, connectivity: Connectivity, now: DateTime<Utc>) -> CacheLookup {
        let bytes = match self.lock().clone() {
            Some(bytes) => bytes,
            None => return CacheLookup::Miss,
        };

        let snapshot: EarningsSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Corruption is recovered by purge-and-miss, never surfaced.
                warn!(error = %e, "purging corrupt cache entry");
                *self.lock() = None;
                return CacheLookup::Miss;
            }
        };

        let age = snapshot.age(now);
        let fresh_ttl =
            chrono::Duration::from_std(self.policy.fresh_ttl).unwrap_or(chrono::Duration::MAX);
        let offline_ttl =
            chrono::Duration::from_std(self.policy.offline_ttl).unwrap_or(chrono::Duration::MAX);

        match connectivity {
            Connectivity::Online if age <= fresh_ttl => CacheLookup::Fresh(snapshot),
            Connectivity::Online if age <= offline_ttl => {
                debug!(age_secs = age.num_seconds(), "serving stale snapshot");
                CacheLookup::Stale(snapshot)
            }
            // Offline widens the fresh window; no refresh is possible anyway.
            Connectivity::Offline if age <= offline_ttl => CacheLookup::Fresh(snapshot),
            _ => CacheLookup::Miss,
        }
    }

    /// Replace the cached snapshot atomically
    ///
    /// Recent transactions are capped; oldest are dropped first. Last writer
    /// wins: snapshots are derived deterministically from the same source of
    /// truth, so replacement order does not matter.
    pub fn set(&self, mut snapshot: EarningsSnapshot, recent: Vec<PaymentRecord>) {
        let mut transactions = recent;
        if transactions.len() > MAX_RECENT_TRANSACTIONS {
            let drop = transactions.len() - MAX_RECENT_TRANSACTIONS;
            transactions.drain(..drop);
        }
        snapshot.recent_transactions = transactions;

        match serde_json::to_vec(&snapshot) {
            Ok(bytes) => *self.lock() = Some(bytes),
            Err(e) => {
                // A snapshot that cannot serialize is dropped, not fatal.
                warn!(error = %e, "failed to serialize snapshot for cache");
            }
        }
    }

    /// Drop the cached snapshot
    pub fn purge(&self) {
        *self.lock() = None;
    }

    #[cfg(test)]
    pub(crate) fn poison_with(&self, bytes: Vec<u8>) {
        *self.lock() = Some(bytes);
    }
}
