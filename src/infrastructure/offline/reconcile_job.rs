use crate::application::ports::{ImageStore, OfflineStore};
use crate::infrastructure::storage::ImageGate;
use crate::shared::error::AppError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub pending_result_count: usize,
    pub requeued_count: usize,
    pub pending_queue_count: usize,
    pub requeued_ids: Vec<String>,
    pub swept_images: Vec<String>,
    pub finished_at: i64,
}

/// Restores queue entries for pending results that lost theirs and removes
/// image files no stored result points at.
pub struct QueueReconcileJob {
    store: Arc<dyn OfflineStore>,
    images: Arc<dyn ImageStore>,
    image_gate: ImageGate,
    gate: Mutex<()>,
}

impl QueueReconcileJob {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        images: Arc<dyn ImageStore>,
        image_gate: ImageGate,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            images,
            image_gate,
            gate: Mutex::new(()),
        })
    }

    pub async fn reconcile_once(&self) -> Result<ReconcileReport, AppError> {
        let _guard = self.gate.lock().await;

        let unqueued = self.store.unqueued_pending_results().await?;
        let mut requeued_ids = Vec::new();
        for local_id in &unqueued {
            if self.store.enqueue_if_missing(local_id).await? {
                requeued_ids.push(local_id.to_string());
            }
        }

        let swept_images = self.sweep_orphan_images().await?;

        let pending_results = self
            .store
            .list_results()
            .await?
            .into_iter()
            .filter(|result| result.is_pending())
            .count();
        let pending_queue_count = self.store.pending_upload_count().await? as usize;

        Ok(ReconcileReport {
            pending_result_count: pending_results,
            requeued_count: requeued_ids.len(),
            pending_queue_count,
            requeued_ids,
            swept_images,
            finished_at: Utc::now().timestamp_millis(),
        })
    }

    async fn sweep_orphan_images(&self) -> Result<Vec<String>, AppError> {
        let _images = self.image_gate.lock().await;
        let referenced: HashSet<String> = self
            .store
            .referenced_images()
            .await?
            .into_iter()
            .map(String::from)
            .collect();

        let mut swept = Vec::new();
        for image in self.images.list_images().await? {
            if referenced.contains(image.as_str()) {
                continue;
            }
            self.images.delete_image(&image).await?;
            swept.push(image.to_string());
        }
        Ok(swept)
    }
}
