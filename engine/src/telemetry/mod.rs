//! Telemetry Recorder
//!
//! Append-only capped log of structured engine events: fetch outcomes,
//! cache hits and misses, cash-out attempts, recorded errors. Writes are
//! best-effort and never block or fail the calling operation; when the log
//! is contended the event is silently dropped. The recorder is explicitly
//! constructed and injected, never a global.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum retained events; oldest dropped first
pub const MAX_TELEMETRY_EVENTS: usize = 500;

/// Where an earnings answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchSource {
    /// Served from the cache without a fetch
    Cache,

    /// Fetched from the row store
    Remote,
}

/// Cache lookup classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheOutcome {
    FreshHit,
    StaleHit,
    Miss,
}

/// One structured telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    /// An earnings fetch completed (successfully or not)
    Fetch {
        source: FetchSource,
        duration_ms: u64,
        success: bool,
    },

    /// A cache lookup was classified
    CacheLookup { outcome: CacheOutcome },

    /// A cash-out attempt finished
    Cashout {
        amount: i64,
        success: bool,
        error: Option<String>,
    },

    /// An error worth diagnosing later
    Error { context: String, message: String },
}

/// A telemetry event with its recording time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub at: DateTime<Utc>,
    pub event: TelemetryEvent,
}

/// Aggregate view over the retained log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    /// Cache lookups recorded
    pub cache_lookups: usize,

    /// Fraction of lookups that hit (fresh or stale); 0.0 when none
    pub hit_rate: f64,

    /// Mean fetch duration in milliseconds; `None` when no fetches
    pub average_fetch_ms: Option<f64>,

    /// Fetches recorded
    pub fetches: usize,

    /// Cash-out attempts recorded
    pub cashout_attempts: usize,

    /// Fraction of cash-out attempts that succeeded; 0.0 when none
    pub cashout_success_rate: f64,

    /// Errors recorded
    pub errors: usize,
}

/// Capped, lock-guarded telemetry log
#[derive(Clone, Default)]
pub struct TelemetryRecorder {
    log: Arc<Mutex<VecDeque<TelemetryEntry>>>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event
    ///
    /// Infallible and non-blocking: if the log lock is contended the event
    /// is dropped rather than making the caller wait.
    pub fn record(&self, event: TelemetryEvent) {
        let mut log = match self.log.try_lock() {
            Ok(log) => log,
            Err(_) => return,
        };
        if log.len() >= MAX_TELEMETRY_EVENTS {
            log.pop_front();
        }
        log.push_back(TelemetryEntry {
            at: Utc::now(),
            event,
        });
    }

    /// Record a completed fetch
    pub fn record_fetch(&self, source: FetchSource, duration: Duration, success: bool) {
        self.record(TelemetryEvent::Fetch {
            source,
            duration_ms: duration.as_millis() as u64,
            success,
        });
    }

    /// Record a cache lookup classification
    pub fn record_cache(&self, outcome: CacheOutcome) {
        self.record(TelemetryEvent::CacheLookup { outcome });
    }

    /// Record a finished cash-out attempt
    pub fn record_cashout(&self, amount: i64, success: bool, error: Option<String>) {
        self.record(TelemetryEvent::Cashout {
            amount,
            success,
            error,
        });
    }

    /// Record a diagnosable error
    pub fn record_error(&self, context: &str, message: &str) {
        self.record(TelemetryEvent::Error {
            context: context.to_string(),
            message: message.to_string(),
        });
    }

    /// Snapshot of the retained log, oldest first
    pub fn entries(&self) -> Vec<TelemetryEntry> {
        match self.log.try_lock() {
            Ok(log) => log.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Compute hit rate, average fetch latency and cash-out success rate
    /// over the retained log
    pub fn summary(&self) -> TelemetrySummary {
        let entries = self.entries();

        let mut cache_lookups = 0usize;
        let mut hits = 0usize;
        let mut fetches = 0usize;
        let mut fetch_ms_total = 0u64;
        let mut cashout_attempts = 0usize;
        let mut cashout_successes = 0usize;
        let mut errors = 0usize;

        for entry in &entries {
            match &entry.event {
                TelemetryEvent::CacheLookup { outcome } => {
                    cache_lookups += 1;
                    if !matches!(outcome, CacheOutcome::Miss) {
                        hits += 1;
                    }
                }
                TelemetryEvent::Fetch { duration_ms, .. } => {
                    fetches += 1;
                    fetch_ms_total += duration_ms;
                }
                TelemetryEvent::Cashout { success, .. } => {
                    cashout_attempts += 1;
                    if *success {
                        cashout_successes += 1;
                    }
                }
                TelemetryEvent::Error { .. } => errors += 1,
            }
        }

        TelemetrySummary {
            cache_lookups,
            hit_rate: if cache_lookups > 0 {
                hits as f64 / cache_lookups as f64
            } else {
                0.0
            },
            average_fetch_ms: if fetches > 0 {
                Some(fetch_ms_total as f64 / fetches as f64)
            } else {
                None
            },
            fetches,
            cashout_attempts,
            cashout_success_rate: if cashout_attempts > 0 {
                cashout_successes as f64 / cashout_attempts as f64
            } else {
                0.0
            },
            errors,
        }
    }
}
