use crate::domain::entities::{RemoteReceipt, ResultUpload};
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Any error is treated by callers as retryable.
    async fn upload_result(&self, upload: &ResultUpload) -> Result<RemoteReceipt, AppError>;
}
