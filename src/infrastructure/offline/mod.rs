mod mappers;
pub mod memory_store;
pub mod metrics;
mod queries;
mod rows;
pub mod sqlite_store;

pub use memory_store::MemoryOfflinePersistence;
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use sqlite_store::SqliteOfflinePersistence;
