use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What asked for a drain. Carried through logs and reports only; every trigger runs the same pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainTrigger {
    Startup,
    Reconnected,
    Interval,
    BackgroundWake,
    Manual,
    LocalChange,
    Reauthenticated,
}

impl DrainTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainTrigger::Startup => "startup",
            DrainTrigger::Reconnected => "reconnected",
            DrainTrigger::Interval => "interval",
            DrainTrigger::BackgroundWake => "background_wake",
            DrainTrigger::Manual => "manual",
            DrainTrigger::LocalChange => "local_change",
            DrainTrigger::Reauthenticated => "reauthenticated",
        }
    }
}

impl fmt::Display for DrainTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainOutcome {
    Completed,
    SkippedOffline,
    SkippedAuthRequired,
    /// Another pass was in flight; this request was folded into it.
    Coalesced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub trigger: DrainTrigger,
    pub outcome: DrainOutcome,
    pub passes: u32,
    pub dispatched: u32,
    pub synced: u32,
    pub retried: u32,
    pub dropped: u32,
    pub deferred: u32,
    pub auth_expired: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DrainReport {
    pub fn skipped(trigger: DrainTrigger, outcome: DrainOutcome) -> Self {
        Self {
            trigger,
            outcome,
            passes: 0,
            dispatched: 0,
            synced: 0,
            retried: 0,
            dropped: 0,
            deferred: 0,
            auth_expired: false,
            finished_at: None,
        }
    }

    pub fn completed(trigger: DrainTrigger) -> Self {
        Self::skipped(trigger, DrainOutcome::Completed)
    }

    /// Folds a follow-up pass into this report.
    pub fn absorb(&mut self, other: DrainReport) {
        self.passes += other.passes;
        self.dispatched += other.dispatched;
        self.synced += other.synced;
        self.retried += other.retried;
        self.dropped += other.dropped;
        self.deferred = other.deferred;
        self.auth_expired |= other.auth_expired;
        if other.finished_at.is_some() {
            self.finished_at = other.finished_at;
        }
    }
}
