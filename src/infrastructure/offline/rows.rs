use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfflineResultRow {
    pub id: i64,
    pub local_id: String,
    pub user_id: String,
    pub user_role: String,
    pub payload: String,
    pub image_refs: String,
    pub sync_state: String,
    pub remote_id: Option<String>,
    pub created_at: i64,
    pub synced_at: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadQueueRow {
    pub id: i64,
    pub result_local_id: String,
    pub attempts: i64,
    pub last_attempt_at: Option<i64>,
    pub last_error: Option<String>,
    pub enqueued_at: i64,
}
