use crate::application::ports::{ImageStore, OfflineStore};
use crate::domain::entities::{CachedUserData, OfflineResult, OfflineResultDraft, PendingUpload};
use crate::domain::value_objects::{
    GeoLocation, ImageRef, LocalResultId, QueueEntryId, RemoteResultId, ResultPayload, UserId,
};
use crate::infrastructure::storage::ImageGate;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// One identification captured on the device.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub payload: ResultPayload,
    pub images: Vec<Vec<u8>>,
    pub location: Option<GeoLocation>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl CaptureRequest {
    pub fn new(payload: ResultPayload, images: Vec<Vec<u8>>) -> Self {
        Self {
            payload,
            images,
            location: None,
            captured_at: None,
        }
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}

pub struct OfflineService {
    store: Arc<dyn OfflineStore>,
    images: Arc<dyn ImageStore>,
    image_gate: ImageGate,
}

impl OfflineService {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        images: Arc<dyn ImageStore>,
        image_gate: ImageGate,
    ) -> Self {
        Self {
            store,
            images,
            image_gate,
        }
    }

    /// Stores a capture for the cached user and queues it for upload.
    /// Storage failures are returned as-is; nothing from this call is left behind.
    pub async fn capture_result(&self, request: CaptureRequest) -> Result<OfflineResult, AppError> {
        // The backend refuses results without images.
        if request.images.is_empty() || request.images.iter().any(Vec::is_empty) {
            return Err(AppError::InvalidInput(
                "A capture needs at least one non-empty image".to_string(),
            ));
        }

        let user = self.store.cached_user().await?.ok_or_else(|| {
            AppError::Unauthorized("No cached user to own the capture".to_string())
        })?;

        let _gate = self.image_gate.lock().await;

        let mut saved_images = Vec::with_capacity(request.images.len());
        for bytes in &request.images {
            match self.images.save_image(bytes).await {
                Ok(image) => saved_images.push(image),
                Err(err) => {
                    self.discard_images(&saved_images).await;
                    return Err(err);
                }
            }
        }

        let mut draft = OfflineResultDraft::new(
            user.user_id,
            user.role,
            request.payload,
            saved_images.clone(),
        )
        .located_at(request.location);
        if let Some(captured_at) = request.captured_at {
            draft = draft.captured_at(captured_at);
        }

        match self.store.save_result(draft).await {
            Ok(result) => {
                tracing::info!(
                    target: "offline::store",
                    local_id = %result.local_id,
                    images = result.image_refs.len(),
                    "capture stored offline"
                );
                Ok(result)
            }
            Err(err) => {
                self.discard_images(&saved_images).await;
                Err(err)
            }
        }
    }

    /// Deletes images of an aborted capture. Callers hold the image gate.
    async fn discard_images(&self, images: &[ImageRef]) {
        if images.is_empty() {
            return;
        }
        // Identical bytes may already belong to an earlier capture, synced or not.
        let referenced: HashSet<ImageRef> = match self.store.referenced_images().await {
            Ok(referenced) => referenced.into_iter().collect(),
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    error = %err,
                    "could not check image usage; leaving images for reconcile"
                );
                return;
            }
        };

        for image in images.iter().filter(|image| !referenced.contains(*image)) {
            if let Err(err) = self.images.delete_image(image).await {
                tracing::warn!(
                    target: "offline::store",
                    image = %image,
                    error = %err,
                    "failed to discard image of aborted capture"
                );
            }
        }
    }

    pub async fn save_image_locally(&self, data: &[u8]) -> Result<ImageRef, AppError> {
        self.images.save_image(data).await
    }

    pub async fn read_local_image(&self, image: &ImageRef) -> Result<Vec<u8>, AppError> {
        self.images.read_image(image).await
    }

    pub async fn delete_local_image(&self, image: &ImageRef) -> Result<(), AppError> {
        self.images.delete_image(image).await
    }

    pub async fn save_result_offline(
        &self,
        draft: OfflineResultDraft,
    ) -> Result<OfflineResult, AppError> {
        self.store.save_result(draft).await
    }

    pub async fn get_offline_results(&self) -> Result<Vec<OfflineResult>, AppError> {
        self.store.list_results().await
    }

    pub async fn get_offline_results_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<OfflineResult>, AppError> {
        self.store.list_results_by_user(user_id).await
    }

    pub async fn offline_results_for_current_user(&self) -> Result<Vec<OfflineResult>, AppError> {
        match self.store.cached_user().await? {
            Some(user) => self.store.list_results_by_user(&user.user_id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn mark_result_as_synced(
        &self,
        local_id: &LocalResultId,
        remote_id: Option<RemoteResultId>,
    ) -> Result<(), AppError> {
        self.store
            .mark_result_synced(local_id, remote_id, Utc::now())
            .await
    }

    pub async fn clear_synced_results(&self) -> Result<u32, AppError> {
        self.store.clear_synced_results().await
    }

    /// Clears synced results and deletes image files nothing references anymore.
    pub async fn cleanup_synced_results(&self) -> Result<u32, AppError> {
        let _gate = self.image_gate.lock().await;
        let candidates: Vec<ImageRef> = self
            .store
            .list_results()
            .await?
            .into_iter()
            .filter(|result| !result.is_pending())
            .flat_map(|result| result.image_refs)
            .collect();

        let removed = self.store.clear_synced_results().await?;

        let still_referenced: HashSet<ImageRef> =
            self.store.referenced_images().await?.into_iter().collect();
        for image in candidates {
            if !still_referenced.contains(&image) {
                self.images.delete_image(&image).await?;
            }
        }
        Ok(removed)
    }

    pub async fn add_to_pending_queue(
        &self,
        local_id: &LocalResultId,
    ) -> Result<PendingUpload, AppError> {
        self.store.enqueue(local_id).await
    }

    pub async fn get_pending_uploads(&self) -> Result<Vec<PendingUpload>, AppError> {
        self.store.pending_uploads().await
    }

    pub async fn remove_from_pending_queue(&self, entry_id: QueueEntryId) -> Result<(), AppError> {
        self.store.remove_from_queue(entry_id).await
    }

    pub async fn get_pending_upload_count(&self) -> Result<u32, AppError> {
        self.store.pending_upload_count().await
    }

    pub async fn cache_user_data(&self, user: &CachedUserData) -> Result<(), AppError> {
        self.store.cache_user(user).await
    }

    pub async fn login_session(&self, user: CachedUserData) -> Result<CachedUserData, AppError> {
        self.store.cache_user(&user).await?;
        tracing::info!(target: "offline::store", user_id = %user.user_id, role = %user.role, "session cached");
        Ok(user)
    }

    pub async fn get_cached_user_data(&self) -> Result<Option<CachedUserData>, AppError> {
        self.store.cached_user().await
    }

    pub async fn clear_cached_user_data(&self) -> Result<(), AppError> {
        self.store.clear_cached_user().await
    }

    pub async fn update_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.store.update_last_sync_time(at).await
    }

    pub async fn get_last_sync_time(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        self.store.last_sync_time().await
    }

    /// Wipes results, queue and cache in one transaction, then the image files.
    pub async fn clear_all_app_data(&self) -> Result<(), AppError> {
        let _gate = self.image_gate.lock().await;
        self.store.clear_all().await?;
        let removed_images = self.images.clear_all().await?;
        tracing::info!(target: "offline::store", removed_images, "all local app data cleared");
        Ok(())
    }
}
