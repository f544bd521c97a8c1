use crate::domain::entities::DrainReport;
use serde::Serialize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcomeStatus {
    Clean,
    Degraded,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_passes: u64,
    pub total_synced: u64,
    pub total_retried: u64,
    pub total_dropped: u64,
    pub auth_expirations: u64,
    pub consecutive_degraded_passes: u64,
    pub last_outcome: Option<PassOutcomeStatus>,
    pub last_trigger: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub last_timestamp_ms: Option<i64>,
}

#[derive(Default, Clone)]
struct LastPassMetadata {
    outcome: Option<PassOutcomeStatus>,
    trigger: Option<String>,
    duration_ms: Option<u64>,
    timestamp_ms: Option<i64>,
}

/// Running counters for drain passes. A pass is degraded when anything was retried, dropped
/// or halted on auth.
pub struct SyncMetrics {
    passes: AtomicU64,
    synced: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
    auth_expirations: AtomicU64,
    consecutive_degraded: AtomicU64,
    metadata: Mutex<LastPassMetadata>,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            passes: AtomicU64::new(0),
            synced: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            auth_expirations: AtomicU64::new(0),
            consecutive_degraded: AtomicU64::new(0),
            metadata: Mutex::new(LastPassMetadata::default()),
        }
    }

    pub fn record_pass(&self, report: &DrainReport, duration_ms: u64) {
        self.passes.fetch_add(u64::from(report.passes), Ordering::Relaxed);
        self.synced.fetch_add(u64::from(report.synced), Ordering::Relaxed);
        self.retried.fetch_add(u64::from(report.retried), Ordering::Relaxed);
        self.dropped.fetch_add(u64::from(report.dropped), Ordering::Relaxed);
        if report.auth_expired {
            self.auth_expirations.fetch_add(1, Ordering::Relaxed);
        }

        let degraded = report.retried > 0 || report.dropped > 0 || report.auth_expired;
        let outcome = if degraded {
            self.consecutive_degraded.fetch_add(1, Ordering::Relaxed);
            PassOutcomeStatus::Degraded
        } else {
            self.consecutive_degraded.store(0, Ordering::Relaxed);
            PassOutcomeStatus::Clean
        };

        if let Ok(mut guard) = self.metadata.lock() {
            guard.outcome = Some(outcome);
            guard.trigger = Some(report.trigger.as_str().to_string());
            guard.duration_ms = Some(duration_ms);
            guard.timestamp_ms = report.finished_at.map(|at| at.timestamp_millis());
        }
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let metadata = self
            .metadata
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            total_passes: self.passes.load(Ordering::Relaxed),
            total_synced: self.synced.load(Ordering::Relaxed),
            total_retried: self.retried.load(Ordering::Relaxed),
            total_dropped: self.dropped.load(Ordering::Relaxed),
            auth_expirations: self.auth_expirations.load(Ordering::Relaxed),
            consecutive_degraded_passes: self.consecutive_degraded.load(Ordering::Relaxed),
            last_outcome: metadata.outcome,
            last_trigger: metadata.trigger,
            last_duration_ms: metadata.duration_ms,
            last_timestamp_ms: metadata.timestamp_ms,
        }
    }
}
