use crate::domain::value_objects::{
    GeoLocation, ImageRef, LocalResultId, RemoteResultId, ResultPayload, SyncState, UserId, UserRole,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineResult {
    pub local_id: LocalResultId,
    pub user_id: UserId,
    pub user_role: UserRole,
    pub payload: ResultPayload,
    pub image_refs: Vec<ImageRef>,
    pub location: Option<GeoLocation>,
    pub sync_state: SyncState,
    pub remote_id: Option<RemoteResultId>,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl OfflineResult {
    pub fn is_pending(&self) -> bool {
        matches!(self.sync_state, SyncState::Pending)
    }
}

/// A capture that has not been written to the local store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineResultDraft {
    pub user_id: UserId,
    pub user_role: UserRole,
    pub payload: ResultPayload,
    pub image_refs: Vec<ImageRef>,
    pub location: Option<GeoLocation>,
    pub created_at: DateTime<Utc>,
}

impl OfflineResultDraft {
    pub fn new(
        user_id: UserId,
        user_role: UserRole,
        payload: ResultPayload,
        image_refs: Vec<ImageRef>,
    ) -> Self {
        Self {
            user_id,
            user_role,
            payload,
            image_refs,
            location: None,
            created_at: Utc::now(),
        }
    }

    pub fn located_at(mut self, location: Option<GeoLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn captured_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
