use crate::common::{ManualClock, Reply, ScriptedRemote, memory_engine, test_config};
use fieldsync_lib::application::ports::offline_store::{
    LocalStore, OfflinePersistence, SyncLedger, SyncQueue,
};
use fieldsync_lib::application::services::{StorageMode, TimeEntryParams};
use fieldsync_lib::domain::entities::RecordFilter;
use fieldsync_lib::domain::value_objects::Collection;
use fieldsync_lib::{AppConfig, EngineOptions, SyncEngine};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn sqlite_config(path: &Path) -> AppConfig {
    let mut config = test_config();
    config.database.url = format!("sqlite://{}?mode=rwc", path.display());
    config.database.max_connections = 2;
    config
}

fn time_entry(job_id: &str) -> TimeEntryParams {
    TimeEntryParams {
        job_id: job_id.into(),
        technician_id: "tech-7".into(),
        ..TimeEntryParams::default()
    }
}

async fn open(config: AppConfig, remote: Arc<ScriptedRemote>, online: bool) -> SyncEngine {
    SyncEngine::initialize(
        config,
        remote,
        EngineOptions {
            initially_online: online,
            clock: ManualClock::new(),
            ..EngineOptions::default()
        },
    )
    .await
    .expect("engine")
}

#[tokio::test]
async fn queued_work_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("data").join("fieldsync.db");

    let first_remote = ScriptedRemote::new();
    let receipt = {
        let engine = open(sqlite_config(&db_path), first_remote.clone(), false).await;
        assert_eq!(engine.storage_mode(), &StorageMode::Durable);
        assert!(engine.store().is_durable());

        let receipt = engine.actions().clock_in(time_entry("job-3")).await.expect("clock in");
        engine.actions().start_job("job-3").await.expect("start");
        receipt
    };
    assert_eq!(first_remote.calls(), 0);

    let remote = ScriptedRemote::new();
    let engine = open(sqlite_config(&db_path), remote.clone(), true).await;
    let restored = engine.store().load().await.expect("load");
    assert_eq!(restored.len(), 2);
    assert_eq!(restored[0].id, receipt.task_id);

    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.synced, 2);
    assert_eq!(remote.paths(), vec!["/time-entries", "/jobs/job-3"]);

    let entry = engine
        .store()
        .get(Collection::TimeEntries, &receipt.record.id)
        .await
        .expect("get")
        .expect("entry");
    assert!(entry.synced);
    assert!(entry.created_offline);
    assert!(engine.store().last_sync_time().await.expect("ledger").is_some());
}

#[tokio::test]
async fn dropped_tasks_and_failures_persist_across_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("fieldsync.db");

    {
        let remote = ScriptedRemote::scripted([Reply::Status(422), Reply::Status(502)]);
        let engine = open(sqlite_config(&db_path), remote, true).await;
        engine.actions().clock_in(time_entry("job-1")).await.expect("job-1");
        engine.actions().clock_in(time_entry("job-2")).await.expect("job-2");
        let report = engine.sync_now().await.expect("drain");
        assert_eq!((report.dropped, report.retried), (1, 1));
    }

    let engine = open(sqlite_config(&db_path), ScriptedRemote::new(), false).await;
    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert_eq!(snapshot.pending_count, 1);
    assert_eq!(snapshot.dropped_count, 1);

    let queued = engine.store().peek_all().await.expect("queue");
    assert_eq!(queued[0].attempts, 1);
    assert!(queued[0].last_error.as_deref().is_some_and(|e| e.contains("502")));

    let dropped = engine.status().dropped_tasks().await.expect("dropped");
    assert_eq!(dropped[0].http_status, Some(422));
}

#[tokio::test]
async fn unusable_database_falls_back_to_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("write blocker");

    let remote = ScriptedRemote::new();
    let engine = open(sqlite_config(&blocker.join("fieldsync.db")), remote.clone(), true).await;

    assert!(engine.storage_mode().is_degraded());
    assert!(!engine.store().is_durable());
    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert!(matches!(snapshot.storage, StorageMode::Degraded(_)));

    engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");
    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.synced, 1);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn cached_server_records_are_synced_and_queue_nothing() {
    let engine = memory_engine(ScriptedRemote::new(), ManualClock::new(), true);
    let stored = engine
        .actions()
        .cache_remote_records(
            Collection::Jobs,
            vec![
                json!({"id": "job-1", "status": "scheduled", "technicianId": "tech-7"}),
                json!({"id": "job-2", "status": "en_route", "technicianId": "tech-8"}),
            ],
        )
        .await
        .expect("cache");
    assert_eq!(stored, 2);
    assert_eq!(engine.store().pending_count().await.expect("pending"), 0);

    let mine = engine
        .actions()
        .records(Collection::Jobs, Some(&RecordFilter::by_technician("tech-7")))
        .await
        .expect("records");
    assert_eq!(mine.len(), 1);
    assert!(mine[0].synced);
    assert!(!mine[0].created_offline);
}

#[tokio::test]
async fn reset_discards_every_local_trace() {
    let remote = ScriptedRemote::scripted([Reply::Status(400)]);
    let engine = memory_engine(remote, ManualClock::new(), true);
    let actions = engine.actions();
    actions.clock_in(time_entry("job-1")).await.expect("clock in");
    engine.sync_now().await.expect("drain");
    engine.set_online(false);
    actions.clock_out(time_entry("job-1")).await.expect("clock out");

    let before = engine.status().snapshot().await.expect("snapshot");
    assert_eq!((before.pending_count, before.dropped_count), (1, 1));
    assert!(before.last_sync_time.is_some());

    engine.reset_local_data().await.expect("reset");

    let after = engine.status().snapshot().await.expect("snapshot");
    assert_eq!(after.pending_count, 0);
    assert_eq!(after.dropped_count, 0);
    assert!(after.last_sync_time.is_none());
    let store: Arc<dyn OfflinePersistence> = engine.store();
    assert!(
        store
            .get_all(Collection::TimeEntries, None)
            .await
            .expect("records")
            .is_empty()
    );
}
