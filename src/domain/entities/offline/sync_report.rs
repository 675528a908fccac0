use crate::domain::value_objects::{LocalResultId, QueueEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadFailure {
    pub entry_id: QueueEntryId,
    pub result_id: LocalResultId,
    pub attempts: u32,
    pub error: String,
}

/// Outcome of one sync pass over the upload queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub synced_count: u32,
    pub failed_count: u32,
    pub remaining_count: u32,
    pub purged_count: u32,
    pub cancelled: bool,
    pub failures: Vec<UploadFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            synced_count: 0,
            failed_count: 0,
            remaining_count: 0,
            purged_count: 0,
            cancelled: false,
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    pub fn record_failure(&mut self, failure: UploadFailure) {
        self.failed_count += 1;
        self.failures.push(failure);
    }
}
