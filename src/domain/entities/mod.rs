pub mod drain_report;
pub mod dropped_task;
pub mod record;
pub mod sync_task;

pub use drain_report::{DrainOutcome, DrainReport, DrainTrigger};
pub use dropped_task::{DroppedTask, FailureKind};
pub use record::{Record, RecordFilter, RecordRef};
pub use sync_task::{DEFAULT_MAX_ATTEMPTS, NewSyncTask, SyncTask};
