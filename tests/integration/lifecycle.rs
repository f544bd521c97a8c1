use crate::common::{ManualClock, RecordingWakeTrigger, Reply, ScriptedRemote, test_config};
use fieldsync_lib::application::ports::offline_store::SyncQueue;
use fieldsync_lib::application::ports::platform::WakeTrigger;
use fieldsync_lib::application::services::{
    BACKGROUND_SYNC_TAG, StorageMode, SyncEvent, TimeEntryParams,
};
use fieldsync_lib::domain::entities::{DrainReport, DrainTrigger};
use fieldsync_lib::infrastructure::offline::MemoryOfflinePersistence;
use fieldsync_lib::{AppConfig, EngineOptions, SyncEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn time_entry(job_id: &str) -> TimeEntryParams {
    TimeEntryParams {
        job_id: job_id.into(),
        technician_id: "tech-1".into(),
        ..TimeEntryParams::default()
    }
}

fn engine_with(
    config: AppConfig,
    remote: Arc<ScriptedRemote>,
    online: bool,
    wake: Option<Arc<RecordingWakeTrigger>>,
) -> SyncEngine {
    SyncEngine::assemble(
        config,
        Arc::new(MemoryOfflinePersistence::new()),
        StorageMode::Durable,
        remote,
        EngineOptions {
            initially_online: online,
            clock: ManualClock::new(),
            probe: None,
            wake_trigger: wake.map(|trigger| trigger as Arc<dyn WakeTrigger>),
        },
    )
}

/// Waits for the first completed pass that synced something.
async fn next_sync(events: &mut broadcast::Receiver<SyncEvent>) -> DrainReport {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::DrainCompleted(report)) if report.synced > 0 => return report,
                Ok(_) => continue,
                Err(err) => panic!("event stream closed: {err}"),
            }
        }
    })
    .await
    .expect("no drain completed in time")
}

#[tokio::test]
async fn reconnect_drains_through_the_running_loop() {
    let remote = ScriptedRemote::new();
    let engine = engine_with(test_config(), remote.clone(), false, None);
    let mut events = engine.subscribe();
    engine.start().await.expect("start");
    assert!(engine.monitor().is_running());

    engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");
    engine.set_online(true);

    let report = next_sync(&mut events).await;
    assert_eq!(report.synced, 1);
    assert_eq!(remote.calls(), 1);
    assert_eq!(engine.store().pending_count().await.expect("pending"), 0);

    engine.stop().await.expect("stop");
    assert!(!engine.monitor().is_running());
}

#[tokio::test]
async fn local_change_while_online_is_sent_without_a_manual_sync() {
    let remote = ScriptedRemote::new();
    let engine = engine_with(test_config(), remote.clone(), true, None);
    let mut events = engine.subscribe();
    engine.start().await.expect("start");

    engine.actions().start_job("job-5").await.expect("start job");
    let report = next_sync(&mut events).await;
    assert_eq!(report.synced, 1);
    assert_eq!(remote.paths(), vec!["/jobs/job-5"]);

    engine.stop().await.expect("stop");
}

#[tokio::test]
async fn engine_can_be_restarted_after_stop() {
    let remote = ScriptedRemote::new();
    let engine = engine_with(test_config(), remote.clone(), true, None);
    engine.start().await.expect("first start");
    engine.stop().await.expect("first stop");

    let mut events = engine.subscribe();
    engine.start().await.expect("second start");
    engine.actions().clock_in(time_entry("job-9")).await.expect("clock in");

    let report = next_sync(&mut events).await;
    assert_eq!(report.synced, 1);
    engine.stop().await.expect("second stop");
}

#[tokio::test]
async fn background_wake_is_registered_for_the_engine_lifetime() {
    let mut config = test_config();
    config.sync.auto_sync = false;
    let trigger = Arc::new(RecordingWakeTrigger::default());
    let remote = ScriptedRemote::new();
    let engine = engine_with(config, remote.clone(), true, Some(trigger.clone()));

    engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");
    engine.start().await.expect("start");
    assert!(!engine.monitor().is_running());
    assert_eq!(remote.calls(), 0);

    let handler = trigger.handler().expect("handler registered");
    assert_eq!(handler.tag(), BACKGROUND_SYNC_TAG);
    let report = handler.on_wake().await.expect("wake drain");
    assert_eq!(report.trigger, DrainTrigger::BackgroundWake);
    assert_eq!(report.synced, 1);
    assert_eq!(remote.calls(), 1);

    engine.stop().await.expect("stop");
    assert!(trigger.was_unregistered());
    assert!(trigger.handler().is_none());

    engine.start().await.expect("restart");
    assert!(trigger.handler().is_some());
}

#[tokio::test]
async fn acknowledged_drops_leave_the_status() {
    let remote = ScriptedRemote::scripted([Reply::Status(404)]);
    let engine = engine_with(test_config(), remote, true, None);
    engine.actions().clock_in(time_entry("job-1")).await.expect("clock in");
    engine.sync_now().await.expect("drain");

    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert_eq!(snapshot.dropped_count, 1);
    assert_eq!(snapshot.metrics.total_dropped, 1);
    assert_eq!(snapshot.metrics.consecutive_degraded_passes, 1);

    let cleared = engine.status().acknowledge_dropped().await.expect("acknowledge");
    assert_eq!(cleared, 1);
    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert_eq!(snapshot.dropped_count, 0);
    assert!(engine.status().dropped_tasks().await.expect("dropped").is_empty());
}
