use super::dispatch::{TaskOutcome, build_request, classify};
use crate::application::ports::offline_store::{OfflinePersistence, SyncLedger, SyncQueue};
use crate::application::ports::platform::{Clock, OnlineState};
use crate::application::ports::remote_api::RemoteApi;
use crate::domain::entities::{
    DrainOutcome, DrainReport, DrainTrigger, DroppedTask, FailureKind, RecordRef, SyncTask,
};
use crate::domain::value_objects::{ActionKind, SyncTaskId};
use crate::infrastructure::offline::{SyncMetrics, SyncMetricsSnapshot};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Delay before a retryable task becomes due again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Retry on the next drain, whenever that is.
    pub fn immediate() -> Self {
        Self {
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            base_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// `base * 2^(attempts-1)`, capped. `None` when retries are immediate.
    pub fn next_attempt_at(&self, now: DateTime<Utc>, attempts: u32) -> Option<DateTime<Utc>> {
        if self.base_backoff.is_zero() {
            return None;
        }
        let exponent = attempts.saturating_sub(1).min(20);
        let delay = self
            .base_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff.max(self.base_backoff));
        let delay = chrono::Duration::from_std(delay).ok()?;
        Some(now + delay)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    TaskSynced {
        task_id: SyncTaskId,
        action_kind: ActionKind,
        record: Option<RecordRef>,
        record_synced: bool,
    },
    TaskRetrying {
        task_id: SyncTaskId,
        action_kind: ActionKind,
        attempts: u32,
        max_attempts: u32,
        error: String,
    },
    TaskDropped(DroppedTask),
    /// Emitted once per expiry; the queue stays paused until credentials are refreshed.
    AuthExpired { task_id: SyncTaskId },
    DrainCompleted(DrainReport),
}

/// Drains the queue against the remote API. At most one pass runs at a time; overlapping
/// requests are folded into a rerun of the active drain.
pub struct SyncCoordinator {
    store: Arc<dyn OfflinePersistence>,
    remote: Arc<dyn RemoteApi>,
    online: Arc<dyn OnlineState>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    request_timeout: Duration,
    metrics: SyncMetrics,
    gate: Mutex<()>,
    /// Mirrors the gate for observers so status reads never contend with a drain.
    in_flight: watch::Sender<bool>,
    rerun_requested: AtomicBool,
    auth_required: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<dyn OfflinePersistence>,
        remote: Arc<dyn RemoteApi>,
        online: Arc<dyn OnlineState>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            remote,
            online,
            clock,
            retry: RetryPolicy::immediate(),
            request_timeout: Duration::from_secs(30),
            metrics: SyncMetrics::new(),
            gate: Mutex::new(()),
            in_flight: watch::Sender::new(false),
            rerun_requested: AtomicBool::new(false),
            auth_required: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn is_draining(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// Resolves once no pass holds the gate.
    pub async fn wait_until_idle(&self) {
        let mut draining = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = draining.wait_for(|active| !*active).await;
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Pushes fresh credentials to the remote and lifts the auth pause. The caller is
    /// expected to request a drain afterwards.
    pub async fn reauthenticated(&self, bearer_token: String) {
        self.remote.update_credentials(bearer_token).await;
        if self.auth_required.swap(false, Ordering::SeqCst) {
            info!(target: "sync::coordinator", "credentials refreshed; queue resumed");
        }
    }

    /// Sends pending tasks in FIFO order. Persistence failures abort the drain with an error;
    /// remote failures never do.
    pub async fn drain(&self, trigger: DrainTrigger) -> Result<DrainReport, AppError> {
        let mut report: Option<DrainReport> = None;
        loop {
            if !self.online.is_online() {
                debug!(target: "sync::coordinator", trigger = %trigger, "offline; drain skipped");
                return Ok(report
                    .unwrap_or_else(|| DrainReport::skipped(trigger, DrainOutcome::SkippedOffline)));
            }
            if self.auth_required() {
                debug!(target: "sync::coordinator", trigger = %trigger, "awaiting re-authentication; drain skipped");
                return Ok(report.unwrap_or_else(|| {
                    DrainReport::skipped(trigger, DrainOutcome::SkippedAuthRequired)
                }));
            }

            let guard = match self.gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    self.rerun_requested.store(true, Ordering::SeqCst);
                    // The active drain may have released the gate between the two checks.
                    match self.gate.try_lock() {
                        Ok(guard) => guard,
                        Err(_) => {
                            debug!(target: "sync::coordinator", trigger = %trigger, "drain in flight; coalesced");
                            return Ok(report.unwrap_or_else(|| {
                                DrainReport::skipped(trigger, DrainOutcome::Coalesced)
                            }));
                        }
                    }
                }
            };
            self.in_flight.send_replace(true);
            self.rerun_requested.store(false, Ordering::SeqCst);
            let pass = self.run_pass(trigger).await;
            self.in_flight.send_replace(false);
            drop(guard);
            let pass = pass?;

            let halted = pass.auth_expired;
            match report.as_mut() {
                Some(existing) => existing.absorb(pass),
                None => report = Some(pass),
            }
            if halted || !self.rerun_requested.swap(false, Ordering::SeqCst) {
                return Ok(report.unwrap_or_else(|| DrainReport::completed(trigger)));
            }
            debug!(target: "sync::coordinator", trigger = %trigger, "running coalesced follow-up pass");
        }
    }

    async fn run_pass(&self, trigger: DrainTrigger) -> Result<DrainReport, AppError> {
        let started = Instant::now();
        let now = self.clock.now();
        let tasks = self.store.peek_all().await?;
        let mut report = DrainReport::completed(trigger);
        report.passes = 1;

        debug!(
            target: "sync::coordinator",
            trigger = %trigger,
            pending = tasks.len(),
            "drain pass started"
        );

        let mut held_keys: HashSet<String> = HashSet::new();
        for (index, task) in tasks.iter().enumerate() {
            if !self.online.is_online() {
                let remaining = (tasks.len() - index) as u32;
                report.deferred += remaining;
                info!(
                    target: "sync::coordinator",
                    remaining,
                    "connectivity lost mid-pass; remaining tasks wait for reconnect"
                );
                break;
            }
            let key = task.ordering_key();
            if held_keys.contains(&key) || !task.is_due(now) {
                held_keys.insert(key);
                report.deferred += 1;
                continue;
            }

            report.dispatched += 1;
            match self.dispatch(task).await {
                TaskOutcome::Success => {
                    let record_synced = self.store.complete_task(task).await?;
                    report.synced += 1;
                    debug!(
                        target: "sync::coordinator",
                        task_id = %task.id,
                        action = %task.action_kind,
                        record_synced,
                        "task synced"
                    );
                    self.emit(SyncEvent::TaskSynced {
                        task_id: task.id,
                        action_kind: task.action_kind,
                        record: task.record.clone(),
                        record_synced,
                    });
                }
                TaskOutcome::AuthExpired => {
                    let remaining = (tasks.len() - index) as u32;
                    report.auth_expired = true;
                    report.deferred += remaining;
                    if !self.auth_required.swap(true, Ordering::SeqCst) {
                        warn!(
                            target: "sync::coordinator",
                            task_id = %task.id,
                            remaining,
                            "authentication expired; pausing queue"
                        );
                        self.emit(SyncEvent::AuthExpired { task_id: task.id });
                    }
                    break;
                }
                TaskOutcome::Rejected { status, message } => {
                    self.drop_task(task, FailureKind::Rejected, status, message, now)
                        .await?;
                    report.dropped += 1;
                }
                TaskOutcome::Retryable { status, message } => {
                    let attempts = task.attempts.saturating_add(1);
                    if attempts >= task.max_attempts {
                        self.drop_task(task, FailureKind::RetriesExhausted, status, message, now)
                            .await?;
                        report.dropped += 1;
                    } else {
                        let next_attempt_at = self.retry.next_attempt_at(now, attempts);
                        self.store
                            .record_failure(task.id, attempts, next_attempt_at, &message)
                            .await?;
                        held_keys.insert(key);
                        report.retried += 1;
                        report.deferred += 1;
                        info!(
                            target: "sync::coordinator",
                            task_id = %task.id,
                            action = %task.action_kind,
                            attempts,
                            max_attempts = task.max_attempts,
                            error = %message,
                            "task will be retried"
                        );
                        self.emit(SyncEvent::TaskRetrying {
                            task_id: task.id,
                            action_kind: task.action_kind,
                            attempts,
                            max_attempts: task.max_attempts,
                            error: message,
                        });
                    }
                }
            }
        }

        let finished_at = self.clock.now();
        self.store.set_last_sync_time(finished_at).await?;
        report.finished_at = Some(finished_at);

        let duration_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_pass(&report, duration_ms);
        info!(
            target: "sync::coordinator",
            trigger = %trigger,
            dispatched = report.dispatched,
            synced = report.synced,
            retried = report.retried,
            dropped = report.dropped,
            deferred = report.deferred,
            auth_expired = report.auth_expired,
            duration_ms,
            "drain pass finished"
        );
        self.emit(SyncEvent::DrainCompleted(report.clone()));
        Ok(report)
    }

    async fn dispatch(&self, task: &SyncTask) -> TaskOutcome {
        let request = match build_request(task) {
            Ok(request) => request,
            Err(err) => {
                return TaskOutcome::Rejected {
                    status: None,
                    message: err.to_string(),
                };
            }
        };
        match tokio::time::timeout(self.request_timeout, self.remote.send(request)).await {
            Ok(result) => classify(result),
            Err(_) => TaskOutcome::Retryable {
                status: None,
                message: format!(
                    "request timed out after {}s",
                    self.request_timeout.as_secs()
                ),
            },
        }
    }

    async fn drop_task(
        &self,
        task: &SyncTask,
        failure: FailureKind,
        http_status: Option<u16>,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut attempted = task.clone();
        attempted.attempts = task.attempts.saturating_add(1);
        let dropped = DroppedTask::from_task(&attempted, failure, http_status, reason, now);
        self.store.drop_task(&dropped).await?;
        warn!(
            target: "sync::coordinator",
            task_id = %task.id,
            action = %task.action_kind,
            failure = failure.as_str(),
            http_status = ?http_status,
            attempts = dropped.attempts,
            reason = %dropped.reason,
            "task dropped"
        );
        self.emit(SyncEvent::TaskDropped(dropped));
        Ok(())
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
