mod mappers;
pub mod metrics;
pub mod reconcile_job;
mod rows;
pub mod sqlite_store;

pub use metrics::{SyncMetrics, SyncMetricsSnapshot, SyncOutcomeStatus};
pub use reconcile_job::{QueueReconcileJob, ReconcileReport};
pub use sqlite_store::SqliteOfflineStore;
