use crate::common::{ManualClock, Reply, ScriptedRemote, drain_events, memory_engine, test_config};
use chrono::Duration;
use fieldsync_lib::application::ports::offline_store::{LocalStore, SyncQueue};
use fieldsync_lib::application::services::{JobStatus, StorageMode, SyncEvent, TimeEntryParams};
use fieldsync_lib::domain::entities::FailureKind;
use fieldsync_lib::domain::value_objects::Collection;
use fieldsync_lib::infrastructure::offline::MemoryOfflinePersistence;
use fieldsync_lib::{EngineOptions, SyncEngine};
use std::sync::Arc;

fn time_entry(job_id: &str) -> TimeEntryParams {
    TimeEntryParams {
        job_id: job_id.into(),
        technician_id: "tech-1".into(),
        ..TimeEntryParams::default()
    }
}

#[tokio::test]
async fn network_failures_drop_the_task_after_max_attempts() {
    let remote = ScriptedRemote::always(Reply::NetworkError, 3);
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let mut events = engine.subscribe();
    let receipt = engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");

    for expected_attempts in 1..=2 {
        let report = engine.sync_now().await.expect("drain");
        assert_eq!(report.retried, 1);
        let queued = engine.store().peek_all().await.expect("queue");
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].attempts, expected_attempts);
        assert!(queued[0].last_error.is_some());
    }

    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.dropped, 1);
    assert_eq!(remote.calls(), 3);

    // Nothing left to retry.
    engine.sync_now().await.expect("drain");
    assert_eq!(remote.calls(), 3);

    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert_eq!(snapshot.pending_count, 0);
    assert_eq!(snapshot.dropped_count, 1);

    let dropped = engine.status().dropped_tasks().await.expect("dropped");
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].task_id, receipt.task_id);
    assert_eq!(dropped[0].failure, FailureKind::RetriesExhausted);
    assert_eq!(dropped[0].attempts, 3);
    assert_eq!(dropped[0].http_status, None);

    let record = engine
        .store()
        .get(Collection::TimeEntries, &receipt.record.id)
        .await
        .expect("get")
        .expect("record kept");
    assert!(!record.synced);

    let events = drain_events(&mut events);
    let retrying = events
        .iter()
        .filter(|event| matches!(event, SyncEvent::TaskRetrying { .. }))
        .count();
    let dropped_events = events
        .iter()
        .filter(|event| matches!(event, SyncEvent::TaskDropped(_)))
        .count();
    assert_eq!(retrying, 2);
    assert_eq!(dropped_events, 1);
}

#[tokio::test]
async fn conflict_is_rejected_without_blocking_the_rest_of_the_queue() {
    let remote = ScriptedRemote::scripted([Reply::Status(409)]);
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let actions = engine.actions();
    actions.clock_in(time_entry("job-1")).await.expect("clock in");
    actions
        .update_job_status("job-1", JobStatus::InProgress)
        .await
        .expect("status");

    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.dropped, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(remote.paths(), vec!["/time-entries", "/jobs/job-1"]);

    let dropped = engine.status().dropped_tasks().await.expect("dropped");
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].failure, FailureKind::Rejected);
    assert_eq!(dropped[0].http_status, Some(409));
    assert_eq!(dropped[0].attempts, 1);
}

#[tokio::test]
async fn throttling_and_request_timeouts_are_retried() {
    let remote = ScriptedRemote::scripted([Reply::Status(429), Reply::Status(408)]);
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");

    let first = engine.sync_now().await.expect("drain");
    let second = engine.sync_now().await.expect("drain");
    let third = engine.sync_now().await.expect("drain");

    assert_eq!((first.retried, first.dropped), (1, 0));
    assert_eq!((second.retried, second.dropped), (1, 0));
    assert_eq!(third.synced, 1);
    assert_eq!(engine.status().snapshot().await.expect("snapshot").dropped_count, 0);
}

#[tokio::test]
async fn retryable_failure_holds_back_later_tasks_for_the_same_job() {
    let remote = ScriptedRemote::scripted([Reply::Status(503)]);
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let actions = engine.actions();
    actions.clock_in(time_entry("job-1")).await.expect("clock in job-1");
    actions.start_job("job-1").await.expect("start job-1");
    actions.clock_in(time_entry("job-2")).await.expect("clock in job-2");

    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.retried, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.deferred, 2);
    assert_eq!(remote.paths(), vec!["/time-entries", "/time-entries"]);
    assert_eq!(engine.store().pending_count().await.expect("pending"), 2);

    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.synced, 2);
    assert_eq!(
        remote.paths(),
        vec!["/time-entries", "/time-entries", "/time-entries", "/jobs/job-1"]
    );
}

#[tokio::test]
async fn backoff_keeps_a_failed_task_out_until_it_is_due() {
    let remote = ScriptedRemote::scripted([Reply::Status(500)]);
    let clock = ManualClock::new();
    let mut config = test_config();
    config.sync.retry_backoff_ms = 60_000;
    let engine = SyncEngine::assemble(
        config,
        Arc::new(MemoryOfflinePersistence::new()),
        StorageMode::Durable,
        remote.clone(),
        EngineOptions {
            clock: clock.clone(),
            ..EngineOptions::default()
        },
    );
    engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");

    engine.sync_now().await.expect("first drain");
    let queued = engine.store().peek_all().await.expect("queue");
    assert!(queued[0].next_attempt_at.is_some());

    clock.advance(Duration::seconds(30));
    let report = engine.sync_now().await.expect("early drain");
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.deferred, 1);
    assert_eq!(remote.calls(), 1);

    clock.advance(Duration::seconds(31));
    let report = engine.sync_now().await.expect("due drain");
    assert_eq!(report.synced, 1);
    assert_eq!(remote.calls(), 2);
}
