use crate::application::services::wake::WakeHandler;
use crate::domain::entities::DrainTrigger;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait OnlineState: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Fire-and-forget request for a drain; the receiver decides when it runs.
pub trait DrainRequester: Send + Sync {
    fn request_drain(&self, trigger: DrainTrigger);
}

/// Periodic reachability check used alongside platform transition events.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Host mechanism that grants background execution (service-worker sync, BGTaskScheduler,
/// WorkManager, ...). The host calls `WakeHandler::on_wake` when it fires.
#[async_trait]
pub trait WakeTrigger: Send + Sync {
    async fn register(&self, handler: Arc<WakeHandler>) -> Result<(), AppError>;
    async fn unregister(&self) -> Result<(), AppError>;
}
