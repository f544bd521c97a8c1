pub mod connectivity_monitor;
pub mod dispatch;
pub mod drain_scheduler;
pub mod field_actions;
pub mod status_reporter;
pub mod sync_coordinator;
pub mod wake;

pub use connectivity_monitor::ConnectivityMonitor;
pub use drain_scheduler::{DrainRequests, DrainScheduler};
pub use field_actions::{
    ActionReceipt, FieldActionService, GeoPoint, JobStatus, MaterialItem, MaterialPriority,
    PhotoFile, TimeEntryKind, TimeEntryParams,
};
pub use status_reporter::{StatusReporter, StatusSnapshot, StorageMode};
pub use sync_coordinator::{RetryPolicy, SyncCoordinator, SyncEvent};
pub use wake::{BACKGROUND_SYNC_TAG, WakeHandler};
