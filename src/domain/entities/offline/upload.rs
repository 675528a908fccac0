use crate::domain::value_objects::{
    GeoLocation, LocalResultId, RemoteResultId, ResultPayload, UserId, UserRole,
};
use chrono::{DateTime, Utc};

/// Everything the backend needs to persist one captured result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultUpload {
    pub local_id: LocalResultId,
    pub user_id: UserId,
    pub user_role: UserRole,
    pub payload: ResultPayload,
    pub images: Vec<Vec<u8>>,
    pub location: Option<GeoLocation>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReceipt {
    pub remote_id: RemoteResultId,
    pub image_urls: Vec<String>,
    pub synced_at: Option<DateTime<Utc>>,
}
