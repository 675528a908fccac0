use crate::domain::value_objects::ImageRef;
use crate::shared::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save_image(&self, data: &[u8]) -> Result<ImageRef, AppError>;
    async fn read_image(&self, image: &ImageRef) -> Result<Vec<u8>, AppError>;
    /// Succeeds when the image is already gone.
    async fn delete_image(&self, image: &ImageRef) -> Result<(), AppError>;
    async fn list_images(&self) -> Result<Vec<ImageRef>, AppError>;
    async fn clear_all(&self) -> Result<u32, AppError>;
}
