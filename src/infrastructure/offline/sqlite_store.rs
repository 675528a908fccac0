use super::mappers::{
    cached_user_from_json, cached_user_to_json, domain_pending_upload_from_row,
    domain_result_from_row, image_refs_to_json, millis_to_datetime,
};
use super::rows::{OfflineResultRow, UploadQueueRow};
use crate::application::ports::offline_store::OfflineStore;
use crate::domain::entities::{CachedUserData, OfflineResult, OfflineResultDraft, PendingUpload};
use crate::domain::value_objects::{
    ImageRef, LocalResultId, QueueEntryId, RemoteResultId, SyncState, UserId,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

const CURRENT_USER_KEY: &str = "current_user";
const LAST_SYNC_KEY: &str = "last_sync_time";

const PENDING_QUEUE_SELECT: &str = r#"
    SELECT q.id, q.result_local_id, q.attempts, q.last_attempt_at, q.last_error, q.enqueued_at
    FROM upload_queue q
    INNER JOIN offline_results r ON r.local_id = q.result_local_id
    WHERE r.sync_state = 'pending'
    ORDER BY q.enqueued_at ASC, q.id ASC
"#;

pub struct SqliteOfflineStore {
    pool: Pool<Sqlite>,
}

impl SqliteOfflineStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn queue_entry(&self, entry_id: i64) -> Result<PendingUpload, AppError> {
        let row = sqlx::query_as::<_, UploadQueueRow>(
            r#"
            SELECT id, result_local_id, attempts, last_attempt_at, last_error, enqueued_at
            FROM upload_queue
            WHERE id = ?1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Queue entry {entry_id} not found")))?;

        domain_pending_upload_from_row(row)
    }

    async fn put_cache_value(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO app_cache (cache_key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(cache_key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cache_value(&self, key: &str) -> Result<Option<String>, AppError> {
        let value =
            sqlx::query_scalar::<_, String>("SELECT value FROM app_cache WHERE cache_key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn save_result(&self, draft: OfflineResultDraft) -> Result<OfflineResult, AppError> {
        let local_id = LocalResultId::generate();
        let payload = serde_json::to_string(draft.payload.as_json())?;
        let image_refs = image_refs_to_json(&draft.image_refs)?;
        let created_at = draft.created_at.timestamp_millis();
        let enqueued_at = Utc::now().timestamp_millis();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO offline_results (
                local_id, user_id, user_role, payload, image_refs, sync_state, created_at,
                latitude, longitude, location_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(local_id.as_str())
        .bind(draft.user_id.as_str())
        .bind(draft.user_role.as_str())
        .bind(&payload)
        .bind(&image_refs)
        .bind(created_at)
        .bind(draft.location.as_ref().map(|location| location.latitude))
        .bind(draft.location.as_ref().map(|location| location.longitude))
        .bind(draft.location.as_ref().and_then(|location| location.name.clone()))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO upload_queue (result_local_id, attempts, enqueued_at)
            VALUES (?1, 0, ?2)
            "#,
        )
        .bind(local_id.as_str())
        .bind(enqueued_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            target: "offline::store",
            local_id = %local_id,
            user_id = %draft.user_id,
            "result saved offline and queued"
        );

        Ok(OfflineResult {
            local_id,
            user_id: draft.user_id,
            user_role: draft.user_role,
            payload: draft.payload,
            image_refs: draft.image_refs,
            location: draft.location,
            sync_state: SyncState::Pending,
            remote_id: None,
            created_at: millis_to_datetime(created_at)?,
            synced_at: None,
        })
    }

    async fn get_result(
        &self,
        local_id: &LocalResultId,
    ) -> Result<Option<OfflineResult>, AppError> {
        let row = sqlx::query_as::<_, OfflineResultRow>(
            "SELECT * FROM offline_results WHERE local_id = ?1",
        )
        .bind(local_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(domain_result_from_row).transpose()
    }

    async fn list_results(&self) -> Result<Vec<OfflineResult>, AppError> {
        let rows = sqlx::query_as::<_, OfflineResultRow>(
            "SELECT * FROM offline_results ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(domain_result_from_row).collect()
    }

    async fn list_results_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<OfflineResult>, AppError> {
        let rows = sqlx::query_as::<_, OfflineResultRow>(
            r#"
            SELECT * FROM offline_results
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(domain_result_from_row).collect()
    }

    async fn mark_result_synced(
        &self,
        local_id: &LocalResultId,
        remote_id: Option<RemoteResultId>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE offline_results
            SET sync_state = 'synced',
                synced_at = ?1,
                remote_id = COALESCE(?2, remote_id)
            WHERE local_id = ?3
            "#,
        )
        .bind(synced_at.timestamp_millis())
        .bind(remote_id.as_ref().map(RemoteResultId::as_str))
        .bind(local_id.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Offline result {local_id} not found"
            )));
        }

        sqlx::query("DELETE FROM upload_queue WHERE result_local_id = ?1")
            .bind(local_id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(target: "offline::store", local_id = %local_id, "result marked as synced");
        Ok(())
    }

    async fn clear_synced_results(&self) -> Result<u32, AppError> {
        let result = sqlx::query("DELETE FROM offline_results WHERE sync_state = 'synced'")
            .execute(&self.pool)
            .await?;

        let removed = u32::try_from(result.rows_affected()).unwrap_or(u32::MAX);
        tracing::debug!(target: "offline::store", removed, "synced results cleared");
        Ok(removed)
    }

    async fn image_in_use(&self, image: &ImageRef) -> Result<bool, AppError> {
        let in_use = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM offline_results r, json_each(r.image_refs) j
                WHERE r.sync_state = 'pending' AND j.value = ?1
            )
            "#,
        )
        .bind(image.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(in_use != 0)
    }

    async fn referenced_images(&self) -> Result<Vec<ImageRef>, AppError> {
        let names = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT j.value
            FROM offline_results r, json_each(r.image_refs) j
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        names
            .into_iter()
            .map(|name| ImageRef::new(name).map_err(AppError::DeserializationError))
            .collect()
    }

    async fn enqueue(&self, local_id: &LocalResultId) -> Result<PendingUpload, AppError> {
        let state = sqlx::query_scalar::<_, String>(
            "SELECT sync_state FROM offline_results WHERE local_id = ?1",
        )
        .bind(local_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offline result {local_id} not found")))?;

        if SyncState::from(state.as_str()).is_synced() {
            return Err(AppError::InvalidInput(format!(
                "Offline result {local_id} is already synced"
            )));
        }

        // Re-queueing keeps the original position and restarts the attempt count.
        sqlx::query(
            r#"
            INSERT INTO upload_queue (result_local_id, attempts, enqueued_at)
            VALUES (?1, 0, ?2)
            ON CONFLICT(result_local_id) DO UPDATE SET
                attempts = 0,
                last_error = NULL
            "#,
        )
        .bind(local_id.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, UploadQueueRow>(
            r#"
            SELECT id, result_local_id, attempts, last_attempt_at, last_error, enqueued_at
            FROM upload_queue
            WHERE result_local_id = ?1
            "#,
        )
        .bind(local_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        domain_pending_upload_from_row(row)
    }

    async fn enqueue_if_missing(&self, local_id: &LocalResultId) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO upload_queue (result_local_id, attempts, enqueued_at)
            SELECT local_id, 0, ?2
            FROM offline_results
            WHERE local_id = ?1 AND sync_state = 'pending'
            ON CONFLICT(result_local_id) DO NOTHING
            "#,
        )
        .bind(local_id.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unqueued_pending_results(&self) -> Result<Vec<LocalResultId>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.local_id
            FROM offline_results r
            LEFT JOIN upload_queue q ON q.result_local_id = r.local_id
            WHERE r.sync_state = 'pending' AND q.id IS NULL
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        ids.into_iter()
            .map(|id| LocalResultId::new(id).map_err(AppError::DeserializationError))
            .collect()
    }

    async fn pending_uploads(&self) -> Result<Vec<PendingUpload>, AppError> {
        let rows = sqlx::query_as::<_, UploadQueueRow>(PENDING_QUEUE_SELECT)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(domain_pending_upload_from_row).collect()
    }

    async fn pending_upload_count(&self) -> Result<u32, AppError> {
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM ({PENDING_QUEUE_SELECT})"
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record_failed_attempt(
        &self,
        entry_id: QueueEntryId,
        error: &str,
        attempted_at: DateTime<Utc>,
    ) -> Result<PendingUpload, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE upload_queue
            SET attempts = attempts + 1,
                last_attempt_at = ?1,
                last_error = ?2
            WHERE id = ?3
            "#,
        )
        .bind(attempted_at.timestamp_millis())
        .bind(error)
        .bind(entry_id.value())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Queue entry {entry_id} not found"
            )));
        }

        self.queue_entry(entry_id.value()).await
    }

    async fn remove_from_queue(&self, entry_id: QueueEntryId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM upload_queue WHERE id = ?1")
            .bind(entry_id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cache_user(&self, user: &CachedUserData) -> Result<(), AppError> {
        let json = cached_user_to_json(user)?;
        self.put_cache_value(CURRENT_USER_KEY, &json).await
    }

    async fn cached_user(&self) -> Result<Option<CachedUserData>, AppError> {
        self.cache_value(CURRENT_USER_KEY)
            .await?
            .map(|json| cached_user_from_json(&json))
            .transpose()
    }

    async fn clear_cached_user(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM app_cache WHERE cache_key = ?1")
            .bind(CURRENT_USER_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_last_sync_time(&self, at: DateTime<Utc>) -> Result<(), AppError> {
        self.put_cache_value(LAST_SYNC_KEY, &at.timestamp_millis().to_string())
            .await
    }

    async fn last_sync_time(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        match self.cache_value(LAST_SYNC_KEY).await? {
            Some(value) => {
                let millis = value.parse::<i64>().map_err(|err| {
                    AppError::DeserializationError(format!("Invalid last sync time: {err}"))
                })?;
                millis_to_datetime(millis).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn clear_all(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM upload_queue")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM offline_results")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM app_cache")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "offline::store", "local results, queue and cache wiped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ResultPayload, UserRole};
    use crate::infrastructure::database::ConnectionPool;
    use chrono::Duration;

    async fn setup_store() -> SqliteOfflineStore {
        let pool = ConnectionPool::from_memory().await.unwrap();
        pool.migrate().await.unwrap();
        SqliteOfflineStore::new(pool.get_pool().clone())
    }

    fn draft_for(user: &str, breed: &str) -> OfflineResultDraft {
        OfflineResultDraft::new(
            UserId::new(user.to_string()).unwrap(),
            UserRole::Flw,
            ResultPayload::new(serde_json::json!({ "breed": breed, "confidence": 0.87 })).unwrap(),
            vec![ImageRef::for_bytes(breed.as_bytes())],
        )
    }

    #[tokio::test]
    async fn test_save_result_creates_pending_result_and_queue_entry() {
        let store = setup_store().await;

        let saved = store.save_result(draft_for("u1", "Gir")).await.unwrap();
        assert!(saved.is_pending());

        let results = store.list_results().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].local_id, saved.local_id);

        let pending = store.pending_uploads().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].result_id, saved.local_id);
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(store.pending_upload_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_results_by_user_filters_owner() {
        let store = setup_store().await;
        store.save_result(draft_for("u1", "Gir")).await.unwrap();
        store.save_result(draft_for("u2", "Sahiwal")).await.unwrap();
        store.save_result(draft_for("u1", "Ongole")).await.unwrap();

        let mine = store
            .list_results_by_user(&UserId::new("u1".into()).unwrap())
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.user_id.as_str() == "u1"));
    }

    #[tokio::test]
    async fn test_pending_uploads_are_fifo() {
        let store = setup_store().await;
        let first = store.save_result(draft_for("u1", "A")).await.unwrap();
        let second = store.save_result(draft_for("u1", "B")).await.unwrap();
        let third = store.save_result(draft_for("u1", "C")).await.unwrap();

        let order: Vec<_> = store
            .pending_uploads()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.result_id)
            .collect();
        assert_eq!(order, vec![first.local_id, second.local_id, third.local_id]);
    }

    #[tokio::test]
    async fn test_mark_synced_drops_queue_entry_and_keeps_result() {
        let store = setup_store().await;
        let saved = store.save_result(draft_for("u1", "Gir")).await.unwrap();

        store
            .mark_result_synced(
                &saved.local_id,
                Some(RemoteResultId::new("srv-9".into()).unwrap()),
                Utc::now(),
            )
            .await
            .unwrap();

        let stored = store.get_result(&saved.local_id).await.unwrap().unwrap();
        assert_eq!(stored.sync_state, SyncState::Synced);
        assert_eq!(stored.remote_id.unwrap().as_str(), "srv-9");
        assert!(stored.synced_at.is_some());
        assert_eq!(store.pending_upload_count().await.unwrap(), 0);
        assert!(store.pending_uploads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_unknown_result_is_not_found() {
        let store = setup_store().await;
        let err = store
            .mark_result_synced(&LocalResultId::generate(), None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_clear_synced_results_keeps_pending() {
        let store = setup_store().await;
        let synced = store.save_result(draft_for("u1", "A")).await.unwrap();
        let pending = store.save_result(draft_for("u1", "B")).await.unwrap();
        store
            .mark_result_synced(&synced.local_id, None, Utc::now())
            .await
            .unwrap();

        let removed = store.clear_synced_results().await.unwrap();
        assert_eq!(removed, 1);

        let remaining = store.list_results().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].local_id, pending.local_id);
        assert!(remaining[0].is_pending());
        assert_eq!(store.pending_upload_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_twice_resets_attempts_without_duplicating() {
        let store = setup_store().await;
        let saved = store.save_result(draft_for("u1", "Gir")).await.unwrap();
        let entry = store.pending_uploads().await.unwrap().remove(0);

        store
            .record_failed_attempt(entry.entry_id, "timeout", Utc::now())
            .await
            .unwrap();
        let failed = store
            .record_failed_attempt(entry.entry_id, "timeout", Utc::now())
            .await
            .unwrap();
        assert_eq!(failed.attempts, 2);

        let requeued = store.enqueue(&saved.local_id).await.unwrap();
        let again = store.enqueue(&saved.local_id).await.unwrap();

        assert_eq!(requeued.entry_id, entry.entry_id);
        assert_eq!(again.entry_id, entry.entry_id);
        assert_eq!(again.attempts, 0);
        assert!(again.last_error.is_none());
        assert_eq!(again.enqueued_at, entry.enqueued_at);
        assert_eq!(store.pending_upload_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_unknown_and_synced_results() {
        let store = setup_store().await;
        let err = store.enqueue(&LocalResultId::generate()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let saved = store.save_result(draft_for("u1", "Gir")).await.unwrap();
        store
            .mark_result_synced(&saved.local_id, None, Utc::now())
            .await
            .unwrap();
        let err = store.enqueue(&saved.local_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_count_matches_pending_uploads_after_mutations() {
        let store = setup_store().await;
        let mut ids = Vec::new();
        for breed in ["A", "B", "C", "D"] {
            ids.push(store.save_result(draft_for("u1", breed)).await.unwrap().local_id);
        }
        store.mark_result_synced(&ids[1], None, Utc::now()).await.unwrap();
        let entry = store.pending_uploads().await.unwrap().remove(0);
        store.remove_from_queue(entry.entry_id).await.unwrap();

        let uploads = store.pending_uploads().await.unwrap();
        assert_eq!(store.pending_upload_count().await.unwrap() as usize, uploads.len());
        assert_eq!(uploads.len(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_if_missing_restores_dropped_entries() {
        let store = setup_store().await;
        let saved = store.save_result(draft_for("u1", "Gir")).await.unwrap();
        let entry = store.pending_uploads().await.unwrap().remove(0);
        store.remove_from_queue(entry.entry_id).await.unwrap();

        assert_eq!(
            store.unqueued_pending_results().await.unwrap(),
            vec![saved.local_id.clone()]
        );
        assert!(store.enqueue_if_missing(&saved.local_id).await.unwrap());
        assert!(!store.enqueue_if_missing(&saved.local_id).await.unwrap());
        assert!(store.unqueued_pending_results().await.unwrap().is_empty());
        assert_eq!(store.pending_upload_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_image_in_use_only_counts_pending_results() {
        let store = setup_store().await;
        let saved = store.save_result(draft_for("u1", "Gir")).await.unwrap();
        let image = saved.image_refs[0].clone();

        assert!(store.image_in_use(&image).await.unwrap());
        store
            .mark_result_synced(&saved.local_id, None, Utc::now())
            .await
            .unwrap();
        assert!(!store.image_in_use(&image).await.unwrap());
        assert_eq!(store.referenced_images().await.unwrap(), vec![image]);
    }

    #[tokio::test]
    async fn test_user_cache_and_last_sync_time() {
        let store = setup_store().await;
        assert!(store.cached_user().await.unwrap().is_none());
        assert!(store.last_sync_time().await.unwrap().is_none());

        let user = CachedUserData::new(UserId::new("7".into()).unwrap(), UserRole::Flw)
            .with_name("Asha");
        store.cache_user(&user).await.unwrap();
        let cached = store.cached_user().await.unwrap().unwrap();
        assert_eq!(cached.user_id, user.user_id);
        assert_eq!(cached.name.as_deref(), Some("Asha"));

        let earlier = Utc::now() - Duration::minutes(5);
        store.update_last_sync_time(earlier).await.unwrap();
        let now = Utc::now();
        store.update_last_sync_time(now).await.unwrap();
        assert_eq!(
            store.last_sync_time().await.unwrap().unwrap().timestamp_millis(),
            now.timestamp_millis()
        );

        store.clear_cached_user().await.unwrap();
        assert!(store.cached_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_all_wipes_every_table() {
        let store = setup_store().await;
        store.save_result(draft_for("u1", "Gir")).await.unwrap();
        store
            .cache_user(&CachedUserData::new(
                UserId::new("u1".into()).unwrap(),
                UserRole::User,
            ))
            .await
            .unwrap();
        store.update_last_sync_time(Utc::now()).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.list_results().await.unwrap().is_empty());
        assert_eq!(store.pending_upload_count().await.unwrap(), 0);
        assert!(store.cached_user().await.unwrap().is_none());
        assert!(store.last_sync_time().await.unwrap().is_none());
    }
}
