use crate::common::{ManualClock, Reply, ScriptedRemote, drain_events, memory_engine};
use fieldsync_lib::application::ports::offline_store::SyncQueue;
use fieldsync_lib::application::services::{JobStatus, SyncEvent, TimeEntryParams};
use fieldsync_lib::domain::entities::DrainOutcome;

async fn queue_three(engine: &fieldsync_lib::SyncEngine) {
    let actions = engine.actions();
    actions
        .clock_in(TimeEntryParams {
            job_id: "job-1".into(),
            technician_id: "tech-1".into(),
            ..TimeEntryParams::default()
        })
        .await
        .expect("clock in");
    actions
        .update_job_status("job-2", JobStatus::EnRoute)
        .await
        .expect("status");
    actions
        .update_customer_notes("cust-1", "gate code 4411", "access")
        .await
        .expect("notes");
}

#[tokio::test]
async fn expired_credentials_pause_the_queue_untouched() {
    let remote = ScriptedRemote::scripted([Reply::Status(401)]);
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let mut events = engine.subscribe();
    queue_three(&engine).await;

    let report = engine.sync_now().await.expect("drain");
    assert!(report.auth_expired);
    assert_eq!(report.synced, 0);
    assert_eq!(report.dropped, 0);
    assert_eq!(remote.calls(), 1);

    let queued = engine.store().peek_all().await.expect("queue");
    assert_eq!(queued.len(), 3);
    assert!(queued.iter().all(|task| task.attempts == 0));

    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert!(snapshot.auth_required);
    assert_eq!(snapshot.dropped_count, 0);

    let report = engine.sync_now().await.expect("paused drain");
    assert_eq!(report.outcome, DrainOutcome::SkippedAuthRequired);
    assert_eq!(remote.calls(), 1);

    let auth_events = drain_events(&mut events)
        .into_iter()
        .filter(|event| matches!(event, SyncEvent::AuthExpired { .. }))
        .count();
    assert_eq!(auth_events, 1);
}

#[tokio::test]
async fn reauthentication_resumes_the_queue_with_new_credentials() {
    let remote = ScriptedRemote::scripted([Reply::Status(401)]);
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    queue_three(&engine).await;

    engine.sync_now().await.expect("drain");
    assert!(engine.coordinator().auth_required());

    engine
        .reauthenticated("new-token".into())
        .await
        .expect("reauthenticated");
    assert_eq!(remote.tokens(), vec!["new-token"]);
    assert!(!engine.coordinator().auth_required());

    let report = engine.sync_now().await.expect("drain");
    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(report.synced, 3);
    assert_eq!(
        remote.paths(),
        vec![
            "/time-entries",
            "/time-entries",
            "/jobs/job-2",
            "/customers/cust-1/notes",
        ]
    );
    assert_eq!(engine.store().pending_count().await.expect("pending"), 0);
}
