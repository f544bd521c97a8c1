pub mod entities;
pub mod value_objects;

pub use entities::{
    DrainOutcome, DrainReport, DrainTrigger, DroppedTask, FailureKind, NewSyncTask, Record,
    RecordFilter, RecordRef, SyncTask,
};
pub use value_objects::{ActionKind, Collection, RecordId, SyncPayload, SyncTaskId};
