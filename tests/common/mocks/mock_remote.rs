use async_trait::async_trait;
use breedscan_lib::application::ports::RemoteApi;
use breedscan_lib::domain::entities::{RemoteReceipt, ResultUpload};
use breedscan_lib::domain::value_objects::{LocalResultId, RemoteResultId};
use breedscan_lib::shared::error::AppError;
use std::collections::HashSet;
use std::sync::Mutex;

/// Records uploads and rejects results whose payload names a failing breed.
#[derive(Default)]
pub struct MockRemoteApi {
    uploads: Mutex<Vec<ResultUpload>>,
    failing_breeds: Mutex<HashSet<String>>,
}

impl MockRemoteApi {
    pub fn fail_breed(&self, breed: &str) {
        self.failing_breeds.lock().unwrap().insert(breed.to_string());
    }

    pub fn recover_breed(&self, breed: &str) {
        self.failing_breeds.lock().unwrap().remove(breed);
    }

    pub fn uploaded_ids(&self) -> Vec<LocalResultId> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|upload| upload.local_id.clone())
            .collect()
    }

    pub fn uploads(&self) -> Vec<ResultUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn upload_result(&self, upload: &ResultUpload) -> Result<RemoteReceipt, AppError> {
        self.uploads.lock().unwrap().push(upload.clone());
        let breed = upload.payload.as_json()["breed"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if self.failing_breeds.lock().unwrap().contains(&breed) {
            return Err(AppError::Network("503 Service Unavailable".into()));
        }
        Ok(RemoteReceipt {
            remote_id: RemoteResultId::new(format!("srv-{}", upload.local_id)).unwrap(),
            image_urls: Vec::new(),
            synced_at: None,
        })
    }
}
