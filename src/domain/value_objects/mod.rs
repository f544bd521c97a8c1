pub mod action_kind;
pub mod collection;
pub mod payload;
pub mod record_id;
pub mod sync_task_id;

pub use action_kind::ActionKind;
pub use collection::Collection;
pub use payload::SyncPayload;
pub use record_id::RecordId;
pub use sync_task_id::SyncTaskId;
