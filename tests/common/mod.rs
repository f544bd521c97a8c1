#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use fieldsync_lib::application::ports::platform::{Clock, WakeTrigger};
use fieldsync_lib::application::ports::remote_api::{RemoteApi, RemoteRequest, RemoteResponse};
use fieldsync_lib::application::services::{StorageMode, SyncEvent, WakeHandler};
use fieldsync_lib::infrastructure::offline::MemoryOfflinePersistence;
use fieldsync_lib::{AppConfig, AppError, EngineOptions, SyncEngine};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, broadcast};

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    NetworkError,
}

/// Holds the first remote call until released.
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Remote API fake answering from a script, 200 once the script runs out.
#[derive(Default)]
pub struct ScriptedRemote {
    replies: Mutex<VecDeque<Reply>>,
    log: Mutex<Vec<String>>,
    requests: Mutex<Vec<RemoteRequest>>,
    tokens: Mutex<Vec<String>>,
    gate: Mutex<Option<Gate>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        let remote = Self::default();
        remote.replies.lock().unwrap().extend(replies);
        Arc::new(remote)
    }

    pub fn always(reply: Reply, times: usize) -> Arc<Self> {
        Self::scripted(std::iter::repeat_n(reply, times))
    }

    pub fn gated() -> (Arc<Self>, Gate) {
        let gate = Gate::default();
        let remote = Self::default();
        *remote.gate.lock().unwrap() = Some(gate.clone());
        (Arc::new(remote), gate)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.path()).collect()
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `start:<path>` / `end:<path>` in the order they happened.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn send(&self, request: RemoteRequest) -> Result<RemoteResponse, AppError> {
        let path = request.path();
        self.log.lock().unwrap().push(format!("start:{path}"));
        self.requests.lock().unwrap().push(request);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let reply = self.replies.lock().unwrap().pop_front();
        self.log.lock().unwrap().push(format!("end:{path}"));
        match reply {
            None => Ok(RemoteResponse::new(200)),
            Some(Reply::Status(status)) => Ok(RemoteResponse::new(status)),
            Some(Reply::NetworkError) => Err(AppError::Network("connection refused".into())),
        }
    }

    async fn update_credentials(&self, bearer_token: String) {
        self.tokens.lock().unwrap().push(bearer_token);
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 2, 8, 0, 0)
            .single()
            .expect("valid start time");
        Arc::new(Self {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Stands in for the host's background scheduler.
#[derive(Default)]
pub struct RecordingWakeTrigger {
    handler: Mutex<Option<Arc<WakeHandler>>>,
    unregistered: Mutex<bool>,
}

impl RecordingWakeTrigger {
    pub fn handler(&self) -> Option<Arc<WakeHandler>> {
        self.handler.lock().unwrap().clone()
    }

    pub fn was_unregistered(&self) -> bool {
        *self.unregistered.lock().unwrap()
    }
}

#[async_trait]
impl WakeTrigger for RecordingWakeTrigger {
    async fn register(&self, handler: Arc<WakeHandler>) -> Result<(), AppError> {
        *self.handler.lock().unwrap() = Some(handler);
        Ok(())
    }

    async fn unregister(&self) -> Result<(), AppError> {
        self.handler.lock().unwrap().take();
        *self.unregistered.lock().unwrap() = true;
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".into();
    config.database.max_connections = 1;
    config
}

/// Engine over the in-memory store, not started.
pub fn memory_engine(
    remote: Arc<ScriptedRemote>,
    clock: Arc<ManualClock>,
    initially_online: bool,
) -> SyncEngine {
    SyncEngine::assemble(
        test_config(),
        Arc::new(MemoryOfflinePersistence::new()),
        StorageMode::Durable,
        remote,
        EngineOptions {
            initially_online,
            clock,
            ..EngineOptions::default()
        },
    )
}

pub fn drain_events(receiver: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
