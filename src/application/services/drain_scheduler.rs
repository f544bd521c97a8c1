use super::sync_coordinator::SyncCoordinator;
use crate::application::ports::platform::DrainRequester;
use crate::domain::entities::DrainTrigger;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Sending half handed to everything that may ask for a drain. A single slot means any
/// number of requests made while one is pending collapse into it.
#[derive(Clone)]
pub struct DrainScheduler {
    sender: mpsc::Sender<DrainTrigger>,
}

pub struct DrainRequests {
    receiver: mpsc::Receiver<DrainTrigger>,
}

impl DrainScheduler {
    pub fn channel() -> (Self, DrainRequests) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { sender }, DrainRequests { receiver })
    }
}

impl DrainRequester for DrainScheduler {
    fn request_drain(&self, trigger: DrainTrigger) {
        match self.sender.try_send(trigger) {
            Ok(()) => debug!(target: "sync::engine", trigger = %trigger, "drain requested"),
            Err(TrySendError::Full(_)) => {
                debug!(target: "sync::engine", trigger = %trigger, "drain already pending")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(target: "sync::engine", trigger = %trigger, "drain loop stopped; request ignored")
            }
        }
    }
}

impl DrainRequests {
    /// Runs requested drains one after another until cancelled. The receiver is handed back
    /// when the loop exits so the engine can be started again.
    pub fn spawn(
        mut self,
        coordinator: Arc<SyncCoordinator>,
        cancel: CancellationToken,
    ) -> JoinHandle<Self> {
        tokio::spawn(async move {
            loop {
                let trigger = tokio::select! {
                    _ = cancel.cancelled() => break,
                    trigger = self.receiver.recv() => match trigger {
                        Some(trigger) => trigger,
                        None => break,
                    },
                };
                if let Err(err) = coordinator.drain(trigger).await {
                    error!(target: "sync::engine", trigger = %trigger, error = %err, "drain failed");
                }
            }
            debug!(target: "sync::engine", "drain loop exited");
            self
        })
    }
}
