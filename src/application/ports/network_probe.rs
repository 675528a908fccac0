use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// Returns whether the backend is reachable right now.
    async fn probe(&self) -> Result<bool, AppError>;
}
