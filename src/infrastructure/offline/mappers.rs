use super::rows::{OfflineResultRow, UploadQueueRow};
use crate::domain::entities::{CachedUserData, OfflineResult, PendingUpload};
use crate::domain::value_objects::{
    GeoLocation, ImageRef, LocalResultId, QueueEntryId, RemoteResultId, ResultPayload, SyncState, UserId,
    UserRole,
};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};

pub fn millis_to_datetime(value: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .ok_or_else(|| AppError::DeserializationError(format!("Invalid timestamp: {value}")))
}

fn optional_millis_to_datetime(value: Option<i64>) -> Result<Option<DateTime<Utc>>, AppError> {
    value.map(millis_to_datetime).transpose()
}

pub fn image_refs_to_json(refs: &[ImageRef]) -> Result<String, AppError> {
    let names: Vec<&str> = refs.iter().map(ImageRef::as_str).collect();
    serde_json::to_string(&names).map_err(|err| AppError::SerializationError(err.to_string()))
}

fn image_refs_from_json(json: &str) -> Result<Vec<ImageRef>, AppError> {
    let names: Vec<String> = serde_json::from_str(json)
        .map_err(|err| AppError::DeserializationError(format!("Invalid image refs: {err}")))?;
    names
        .into_iter()
        .map(|name| ImageRef::new(name).map_err(AppError::DeserializationError))
        .collect()
}

/// Rows without both coordinates carry no location.
fn location_from_row(
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: Option<String>,
) -> Result<Option<GeoLocation>, AppError> {
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Ok(None);
    };
    let location =
        GeoLocation::new(latitude, longitude).map_err(AppError::DeserializationError)?;
    Ok(Some(match name {
        Some(name) => location.with_name(name),
        None => location,
    }))
}

pub fn domain_result_from_row(row: OfflineResultRow) -> Result<OfflineResult, AppError> {
    let local_id = LocalResultId::new(row.local_id).map_err(AppError::DeserializationError)?;
    let user_id = UserId::new(row.user_id).map_err(AppError::DeserializationError)?;
    let payload =
        ResultPayload::from_json_str(&row.payload).map_err(AppError::DeserializationError)?;
    let remote_id = row
        .remote_id
        .map(RemoteResultId::new)
        .transpose()
        .map_err(AppError::DeserializationError)?;

    Ok(OfflineResult {
        local_id,
        user_id,
        user_role: UserRole::from(row.user_role.as_str()),
        payload,
        image_refs: image_refs_from_json(&row.image_refs)?,
        location: location_from_row(row.latitude, row.longitude, row.location_name)?,
        sync_state: SyncState::from(row.sync_state.as_str()),
        remote_id,
        created_at: millis_to_datetime(row.created_at)?,
        synced_at: optional_millis_to_datetime(row.synced_at)?,
    })
}

pub fn domain_pending_upload_from_row(row: UploadQueueRow) -> Result<PendingUpload, AppError> {
    Ok(PendingUpload {
        entry_id: QueueEntryId::new(row.id).map_err(AppError::DeserializationError)?,
        result_id: LocalResultId::new(row.result_local_id)
            .map_err(AppError::DeserializationError)?,
        attempts: u32::try_from(row.attempts.max(0)).unwrap_or(u32::MAX),
        last_attempt_at: optional_millis_to_datetime(row.last_attempt_at)?,
        last_error: row.last_error,
        enqueued_at: millis_to_datetime(row.enqueued_at)?,
    })
}

pub fn cached_user_to_json(user: &CachedUserData) -> Result<String, AppError> {
    serde_json::to_string(user).map_err(|err| AppError::SerializationError(err.to_string()))
}

pub fn cached_user_from_json(json: &str) -> Result<CachedUserData, AppError> {
    serde_json::from_str(json)
        .map_err(|err| AppError::DeserializationError(format!("Invalid cached user: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_row_round_trips_into_domain() {
        let row = OfflineResultRow {
            id: 1,
            local_id: "local-1".into(),
            user_id: "42".into(),
            user_role: "FLW".into(),
            payload: r#"{"breed":"Gir","confidence":0.91}"#.into(),
            image_refs: r#"["abc.jpg"]"#.into(),
            sync_state: "pending".into(),
            remote_id: None,
            created_at: 1_700_000_000_000,
            synced_at: None,
            latitude: Some(21.17),
            longitude: Some(72.83),
            location_name: Some("Surat".into()),
        };

        let result = domain_result_from_row(row).unwrap();
        assert_eq!(result.user_role, UserRole::Flw);
        assert_eq!(result.image_refs.len(), 1);
        assert!(result.is_pending());
        assert_eq!(result.created_at.timestamp_millis(), 1_700_000_000_000);
        let location = result.location.unwrap();
        assert_eq!(location.latitude, 21.17);
        assert_eq!(location.name.as_deref(), Some("Surat"));
    }

    #[test]
    fn test_partial_coordinates_carry_no_location() {
        assert_eq!(location_from_row(Some(21.17), None, Some("Surat".into())).unwrap(), None);
        assert!(location_from_row(Some(120.0), Some(0.0), None).is_err());
    }

    #[test]
    fn test_corrupt_image_refs_are_rejected() {
        let row = OfflineResultRow {
            id: 1,
            local_id: "local-1".into(),
            user_id: "42".into(),
            user_role: "user".into(),
            payload: "{}".into(),
            image_refs: "not json".into(),
            sync_state: "pending".into(),
            remote_id: None,
            created_at: 0,
            synced_at: None,
            latitude: None,
            longitude: None,
            location_name: None,
        };

        assert!(matches!(
            domain_result_from_row(row),
            Err(AppError::DeserializationError(_))
        ));
    }
}
