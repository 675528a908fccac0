use crate::application::ports::RemoteApi;
use crate::domain::entities::{RemoteReceipt, ResultUpload};
use crate::domain::value_objects::RemoteResultId;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SYNC_PATH: &str = "/api/history/sync";

#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server rejected upload: {0}")]
    Rejected(String),

    #[error("Malformed server response: {0}")]
    MalformedResponse(String),
}

impl From<RemoteApiError> for AppError {
    fn from(err: RemoteApiError) -> Self {
        AppError::Network(err.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest<'a> {
    images_base64: Vec<String>,
    predictions: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_name: Option<&'a str>,
    timestamp: i64,
    user_id: &'a str,
    user_role: &'a str,
    client_result_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncResponse {
    success: bool,
    #[serde(default)]
    data: Option<SyncResponseData>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncResponseData {
    db_id: Option<serde_json::Value>,
    #[serde(default)]
    image_urls: Vec<String>,
    #[serde(default)]
    synced_at: Option<String>,
}

pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteApi {
    pub fn new(config: &RemoteConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(format!("HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    async fn post_upload(&self, upload: &ResultUpload) -> Result<RemoteReceipt, RemoteApiError> {
        let body = SyncRequest {
            images_base64: upload.images.iter().map(|bytes| STANDARD.encode(bytes)).collect(),
            predictions: upload.payload.as_json(),
            latitude: upload.location.as_ref().map(|location| location.latitude),
            longitude: upload.location.as_ref().map(|location| location.longitude),
            location_name: upload
                .location
                .as_ref()
                .and_then(|location| location.name.as_deref()),
            timestamp: upload.captured_at.timestamp_millis(),
            user_id: upload.user_id.as_str(),
            user_role: upload.user_role.as_str(),
            client_result_id: upload.local_id.as_str(),
        };

        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, SYNC_PATH))
            .json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SyncResponse = response
            .json()
            .await
            .map_err(|err| RemoteApiError::MalformedResponse(err.to_string()))?;
        receipt_from_response(parsed)
    }
}

fn receipt_from_response(response: SyncResponse) -> Result<RemoteReceipt, RemoteApiError> {
    if !response.success {
        return Err(RemoteApiError::Rejected(
            response
                .message
                .unwrap_or_else(|| "no message".to_string()),
        ));
    }

    let data = response
        .data
        .ok_or_else(|| RemoteApiError::MalformedResponse("missing data".to_string()))?;
    let db_id = match data.db_id {
        Some(serde_json::Value::String(id)) => id,
        Some(serde_json::Value::Number(id)) => id.to_string(),
        _ => return Err(RemoteApiError::MalformedResponse("missing dbId".to_string())),
    };
    let remote_id = RemoteResultId::new(db_id).map_err(RemoteApiError::MalformedResponse)?;
    let synced_at = data
        .synced_at
        .as_deref()
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc));

    Ok(RemoteReceipt {
        remote_id,
        image_urls: data.image_urls,
        synced_at,
    })
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn upload_result(&self, upload: &ResultUpload) -> Result<RemoteReceipt, AppError> {
        match self.post_upload(upload).await {
            Ok(receipt) => {
                tracing::debug!(
                    target: "remote::api",
                    local_id = %upload.local_id,
                    remote_id = %receipt.remote_id,
                    "result uploaded"
                );
                Ok(receipt)
            }
            Err(err) => {
                tracing::debug!(
                    target: "remote::api",
                    local_id = %upload.local_id,
                    error = %err,
                    "result upload failed"
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{
        GeoLocation, LocalResultId, ResultPayload, UserId, UserRole,
    };
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_upload() -> ResultUpload {
        ResultUpload {
            local_id: LocalResultId::new("local-1".into()).unwrap(),
            user_id: UserId::new("42".into()).unwrap(),
            user_role: UserRole::Flw,
            payload: ResultPayload::new(json!({"breed": "Gir", "confidence": 0.9})).unwrap(),
            images: vec![b"img".to_vec()],
            location: Some(GeoLocation::new(21.17, 72.83).unwrap().with_name("Surat")),
            captured_at: DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap(),
        }
    }

    fn api_for(server: &MockServer, token: Option<&str>) -> HttpRemoteApi {
        let config = RemoteConfig {
            base_url: server.uri(),
            auth_token: token.map(str::to_string),
        };
        HttpRemoteApi::new(&config, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_upload_sends_camel_case_body_and_reads_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SYNC_PATH))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "imagesBase64": ["aW1n"],
                "predictions": {"breed": "Gir"},
                "latitude": 21.17,
                "longitude": 72.83,
                "locationName": "Surat",
                "timestamp": 1_700_000_000_000i64,
                "userId": "42",
                "userRole": "flw",
                "clientResultId": "local-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "dbId": 17,
                    "imageUrls": ["https://cdn/1.jpg"],
                    "syncedAt": "2025-01-01T00:00:00Z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = api_for(&server, Some("secret"))
            .upload_result(&sample_upload())
            .await
            .unwrap();

        assert_eq!(receipt.remote_id.as_str(), "17");
        assert_eq!(receipt.image_urls, vec!["https://cdn/1.jpg".to_string()]);
        assert!(receipt.synced_at.is_some());
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SYNC_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = api_for(&server, None)
            .upload_result(&sample_upload())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_success_false_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SYNC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "invalid payload"
            })))
            .mount(&server)
            .await;

        let err = api_for(&server, None)
            .upload_result(&sample_upload())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(msg) if msg.contains("invalid payload")));
    }

    #[tokio::test]
    async fn test_missing_location_is_left_out_of_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SYNC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "dbId": "abc" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut upload = sample_upload();
        upload.location = None;
        api_for(&server, None).upload_result(&upload).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("latitude").is_none());
        assert!(body.get("locationName").is_none());
        assert_eq!(body["clientResultId"], "local-1");
    }

    #[test]
    fn test_receipt_requires_db_id() {
        let response = SyncResponse {
            success: true,
            data: Some(SyncResponseData {
                db_id: None,
                image_urls: Vec::new(),
                synced_at: None,
            }),
            message: None,
        };
        assert!(matches!(
            receipt_from_response(response),
            Err(RemoteApiError::MalformedResponse(_))
        ));
    }
}
