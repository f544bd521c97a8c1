use super::sync_coordinator::SyncCoordinator;
use crate::domain::entities::{DrainOutcome, DrainReport, DrainTrigger};
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Tag under which hosts register the background sync; kept stable across releases.
pub const BACKGROUND_SYNC_TAG: &str = "sync-data";

/// What the host runs when its background mechanism wakes the app. The returned future
/// resolves only after a pass has run on the wake's behalf, waiting out any foreground drain
/// that is already in flight, so the host can hold its execution grant until then.
pub struct WakeHandler {
    coordinator: Arc<SyncCoordinator>,
}

impl WakeHandler {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn tag(&self) -> &'static str {
        BACKGROUND_SYNC_TAG
    }

    pub async fn on_wake(&self) -> Result<DrainReport, AppError> {
        info!(target: "sync::wake", tag = BACKGROUND_SYNC_TAG, "background wake received");
        let mut report = self.coordinator.drain(DrainTrigger::BackgroundWake).await?;
        while report.outcome == DrainOutcome::Coalesced {
            self.coordinator.wait_until_idle().await;
            report = self.coordinator.drain(DrainTrigger::BackgroundWake).await?;
        }
        info!(
            target: "sync::wake",
            outcome = ?report.outcome,
            synced = report.synced,
            "background wake finished"
        );
        Ok(report)
    }
}
