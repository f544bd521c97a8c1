use crate::common::{ManualClock, ScriptedRemote, memory_engine};
use fieldsync_lib::application::ports::offline_store::SyncQueue;
use fieldsync_lib::application::ports::remote_api::RequestBody;
use fieldsync_lib::application::services::{TimeEntryParams, WakeHandler};
use fieldsync_lib::domain::entities::{DrainOutcome, DrainTrigger};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn time_entry(job_id: &str) -> TimeEntryParams {
    TimeEntryParams {
        job_id: job_id.into(),
        technician_id: "tech-1".into(),
        ..TimeEntryParams::default()
    }
}

#[tokio::test]
async fn overlapping_drains_coalesce_and_send_each_task_once() {
    let (remote, gate) = ScriptedRemote::gated();
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let actions = engine.actions();
    actions.clock_in(time_entry("job-1")).await.expect("job-1");
    actions.clock_in(time_entry("job-2")).await.expect("job-2");

    let coordinator = engine.coordinator();
    let first = tokio::spawn(async move { coordinator.drain(DrainTrigger::Interval).await });
    gate.entered.notified().await;

    let snapshot = engine.status().snapshot().await.expect("snapshot");
    assert!(snapshot.is_syncing);

    let second = engine.sync_now().await.expect("second drain");
    assert_eq!(second.outcome, DrainOutcome::Coalesced);
    assert_eq!(second.dispatched, 0);

    gate.release.notify_one();
    let first = first.await.expect("join").expect("first drain");
    assert_eq!(first.outcome, DrainOutcome::Completed);
    assert_eq!(first.passes, 2);
    assert_eq!(first.synced, 2);
    assert_eq!(remote.calls(), 2);
    assert!(!engine.status().snapshot().await.expect("snapshot").is_syncing);
}

#[tokio::test]
async fn task_queued_mid_drain_is_sent_by_the_follow_up_pass() {
    let (remote, gate) = ScriptedRemote::gated();
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let actions = engine.actions();
    actions.clock_in(time_entry("job-1")).await.expect("clock in");
    actions.start_job("job-1").await.expect("start");

    let coordinator = engine.coordinator();
    let drain = tokio::spawn(async move { coordinator.drain(DrainTrigger::Manual).await });
    gate.entered.notified().await;

    actions
        .complete_job("job-1", Some("replaced valve".into()))
        .await
        .expect("complete");
    let coalesced = engine.sync_now().await.expect("coalesced drain");
    assert_eq!(coalesced.outcome, DrainOutcome::Coalesced);

    gate.release.notify_one();
    let report = drain.await.expect("join").expect("drain");
    assert_eq!(report.passes, 2);
    assert_eq!(report.synced, 3);

    assert_eq!(
        remote.log(),
        vec![
            "start:/time-entries",
            "end:/time-entries",
            "start:/jobs/job-1",
            "end:/jobs/job-1",
            "start:/jobs/job-1",
            "end:/jobs/job-1",
        ]
    );
    let statuses: Vec<String> = remote
        .requests()
        .iter()
        .skip(1)
        .filter_map(|request| match &request.body {
            RequestBody::Json(body) => body["status"].as_str().map(str::to_string),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec!["in_progress", "completed"]);
    assert_eq!(engine.store().pending_count().await.expect("pending"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_polling_never_swallows_a_drain() {
    let engine = memory_engine(ScriptedRemote::new(), ManualClock::new(), true);
    let coordinator = engine.coordinator();
    let stop = Arc::new(AtomicBool::new(false));
    let pollers: Vec<_> = (0..3)
        .map(|_| {
            let coordinator = coordinator.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    std::hint::black_box(coordinator.is_draining());
                }
            })
        })
        .collect();

    let mut coalesced = 0;
    for _ in 0..2_000 {
        let report = engine.sync_now().await.expect("drain");
        if report.outcome == DrainOutcome::Coalesced {
            coalesced += 1;
        }
    }
    stop.store(true, Ordering::Relaxed);
    for poller in pollers {
        poller.join().expect("poller");
    }
    assert_eq!(coalesced, 0);
}

#[tokio::test]
async fn background_wake_resolves_after_the_foreground_drain() {
    let (remote, gate) = ScriptedRemote::gated();
    let engine = memory_engine(remote.clone(), ManualClock::new(), true);
    let actions = engine.actions();
    actions.clock_in(time_entry("job-1")).await.expect("clock in");

    let coordinator = engine.coordinator();
    let foreground = tokio::spawn(async move { coordinator.drain(DrainTrigger::Manual).await });
    gate.entered.notified().await;

    actions.start_job("job-1").await.expect("start");
    let handler = WakeHandler::new(engine.coordinator());
    let wake = tokio::spawn(async move { handler.on_wake().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!wake.is_finished());

    gate.release.notify_one();
    foreground.await.expect("join").expect("foreground drain");
    let report = wake.await.expect("join").expect("wake drain");
    assert_eq!(report.outcome, DrainOutcome::Completed);
    assert_eq!(report.trigger, DrainTrigger::BackgroundWake);
    assert_eq!(remote.calls(), 2);
    assert_eq!(engine.store().pending_count().await.expect("pending"), 0);
}
