use crate::application::ports::platform::{ConnectivityProbe, DrainRequester, OnlineState};
use crate::domain::entities::DrainTrigger;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct MonitorWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Tracks reachability and asks for drains on offline→online transitions and on a fixed
/// interval while online. It never drains by itself.
pub struct ConnectivityMonitor {
    online: watch::Sender<bool>,
    requester: Arc<dyn DrainRequester>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    poll_interval: Duration,
    worker: Mutex<Option<MonitorWorker>>,
}

impl ConnectivityMonitor {
    pub fn new(
        initially_online: bool,
        requester: Arc<dyn DrainRequester>,
        poll_interval: Duration,
    ) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self {
            online,
            requester,
            probe: None,
            poll_interval,
            worker: Mutex::new(None),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Platform transition signal. Returns true when the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let previous = self.online.send_replace(online);
        if previous == online {
            return false;
        }
        if online {
            info!(target: "sync::connectivity", "connection restored");
            self.requester.request_drain(DrainTrigger::Reconnected);
        } else {
            info!(target: "sync::connectivity", "connection lost");
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Starts the interval timer. Calling it again while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let Ok(mut worker) = self.worker.lock() else {
            warn!(target: "sync::connectivity", "monitor state poisoned; timer not started");
            return;
        };
        if worker.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_timer(
            Arc::downgrade(self),
            self.poll_interval,
            cancel.clone(),
        ));
        *worker = Some(MonitorWorker { cancel, handle });
        debug!(
            target: "sync::connectivity",
            interval_secs = self.poll_interval.as_secs(),
            "connectivity timer started"
        );
    }

    pub async fn stop(&self) {
        let worker = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(worker) = worker {
            worker.cancel.cancel();
            if let Err(err) = worker.handle.await
                && !err.is_cancelled()
            {
                warn!(target: "sync::connectivity", error = %err, "connectivity timer ended abnormally");
            }
            debug!(target: "sync::connectivity", "connectivity timer stopped");
        }
    }

    async fn on_tick(&self) {
        if let Some(probe) = &self.probe {
            let reachable = probe.probe().await;
            self.set_online(reachable);
        }
        if self.is_online() {
            self.requester.request_drain(DrainTrigger::Interval);
        }
    }
}

impl OnlineState for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        ConnectivityMonitor::is_online(self)
    }
}

async fn run_timer(monitor: Weak<ConnectivityMonitor>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; startup has its own drain.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.on_tick().await;
            }
        }
    }
}
