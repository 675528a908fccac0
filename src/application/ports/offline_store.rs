use crate::domain::entities::{CachedUserData, OfflineResult, OfflineResultDraft, PendingUpload};
use crate::domain::value_objects::{
    ImageRef, LocalResultId, QueueEntryId, RemoteResultId, UserId,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable local state: captured results, the upload queue derived from
/// them, and the session cache.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Persists a new `pending` result together with its queue entry.
    async fn save_result(&self, draft: OfflineResultDraft) -> Result<OfflineResult, AppError>;
    async fn get_result(&self, local_id: &LocalResultId)
        -> Result<Option<OfflineResult>, AppError>;
    /// Newest first.
    async fn list_results(&self) -> Result<Vec<OfflineResult>, AppError>;
    async fn list_results_by_user(&self, user_id: &UserId)
        -> Result<Vec<OfflineResult>, AppError>;
    /// Flips the result to `synced` and drops its queue entry in one transaction.
    async fn mark_result_synced(
        &self,
        local_id: &LocalResultId,
        remote_id: Option<RemoteResultId>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
    /// Deletes `synced` results only. Returns the number removed.
    async fn clear_synced_results(&self) -> Result<u32, AppError>;
    async fn image_in_use(&self, image: &ImageRef) -> Result<bool, AppError>;
    async fn referenced_images(&self) -> Result<Vec<ImageRef>, AppError>;

    async fn enqueue(&self, local_id: &LocalResultId) -> Result<PendingUpload, AppError>;
    async fn enqueue_if_missing(&self, local_id: &LocalResultId) -> Result<bool, AppError>;
    async fn unqueued_pending_results(&self) -> Result<Vec<LocalResultId>, AppError>;
    /// Oldest first.
    async fn pending_uploads(&self) -> Result<Vec<PendingUpload>, AppError>;
    async fn pending_upload_count(&self) -> Result<u32, AppError>;
    async fn record_failed_attempt(
        &self,
        entry_id: QueueEntryId,
        error: &str,
        attempted_at: DateTime<Utc>,
    ) -> Result<PendingUpload, AppError>;
    async fn remove_from_queue(&self, entry_id: QueueEntryId) -> Result<(), AppError>;

    async fn cache_user(&self, user: &CachedUserData) -> Result<(), AppError>;
    async fn cached_user(&self) -> Result<Option<CachedUserData>, AppError>;
    async fn clear_cached_user(&self) -> Result<(), AppError>;
    async fn update_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>, AppError>;

    /// Wipes results, queue and cache in a single transaction.
    async fn clear_all(&self) -> Result<(), AppError>;
}
