use super::mocks::{MockProbe, MockRemoteApi};
use breedscan_lib::application::services::CaptureRequest;
use breedscan_lib::domain::entities::CachedUserData;
use breedscan_lib::domain::value_objects::{ResultPayload, UserId, UserRole};
use breedscan_lib::shared::config::AppConfig;
use breedscan_lib::AppState;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub struct OfflineTestContext {
    pub state: AppState,
    pub remote: Arc<MockRemoteApi>,
    pub probe: Arc<MockProbe>,
    pub dir: TempDir,
}

pub fn config_for(data_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.data_dir = data_dir.to_path_buf();
    config.database.url = format!("sqlite:{}", data_dir.join("breedscan.db").display());
    config.sync.auto_sync = false;
    config
}

pub async fn setup_offline_state() -> OfflineTestContext {
    let dir = TempDir::new().expect("temp dir");
    let (state, remote, probe) = open_state(dir.path()).await;
    OfflineTestContext {
        state,
        remote,
        probe,
        dir,
    }
}

pub async fn open_state(data_dir: &Path) -> (AppState, Arc<MockRemoteApi>, Arc<MockProbe>) {
    let remote = Arc::new(MockRemoteApi::default());
    let probe = Arc::new(MockProbe::default());
    let state = AppState::with_adapters(config_for(data_dir), remote.clone(), probe.clone())
        .await
        .expect("app state");
    (state, remote, probe)
}

pub fn field_worker() -> CachedUserData {
    CachedUserData::new(UserId::new("flw-12".into()).expect("user id"), UserRole::Flw)
        .with_name("Meena")
        .with_contact(None, Some("+91-9000000000".into()))
}

pub fn capture(breed: &str) -> CaptureRequest {
    CaptureRequest::new(
        ResultPayload::new(json!({
            "breed": breed,
            "predictions": [{ "breed": breed, "confidence": 0.82 }]
        }))
        .expect("payload"),
        vec![format!("jpeg:{breed}").into_bytes()],
    )
}
