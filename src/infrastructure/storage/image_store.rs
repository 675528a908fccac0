use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::{application::ports::ImageStore, domain::value_objects::ImageRef, shared::AppError};

/// Content-addressed image files under a single directory.
pub struct FsImageStore {
    images_dir: PathBuf,
}

impl FsImageStore {
    pub fn new(images_dir: PathBuf) -> Self {
        Self { images_dir }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    fn path_for(&self, image: &ImageRef) -> PathBuf {
        self.images_dir.join(image.as_str())
    }

    async fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|err| storage_error("Failed to create image dir", err))
    }
}

fn storage_error(context: &str, err: std::io::Error) -> AppError {
    if err.raw_os_error() == Some(28) {
        return AppError::Storage(format!("{context}: no space left on device"));
    }
    AppError::Storage(format!("{context}: {err}"))
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save_image(&self, data: &[u8]) -> Result<ImageRef, AppError> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("Image data is empty".to_string()));
        }
        self.ensure_dir().await?;

        let image = ImageRef::for_bytes(data);
        let path = self.path_for(&image);
        if fs::metadata(&path).await.is_ok() {
            return Ok(image);
        }

        let tmp_path = self.images_dir.join(format!(".{}.tmp", image.as_str()));
        fs::write(&tmp_path, data)
            .await
            .map_err(|err| storage_error("Failed to write image", err))?;
        if let Err(err) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(storage_error("Failed to store image", err));
        }

        tracing::debug!(target: "storage::images", image = %image, bytes = data.len(), "image saved");
        Ok(image)
    }

    async fn read_image(&self, image: &ImageRef) -> Result<Vec<u8>, AppError> {
        match fs::read(self.path_for(image)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("Image {image} not found")))
            }
            Err(err) => Err(storage_error("Failed to read image", err)),
        }
    }

    async fn delete_image(&self, image: &ImageRef) -> Result<(), AppError> {
        match fs::remove_file(self.path_for(image)).await {
            Ok(()) => {
                tracing::debug!(target: "storage::images", image = %image, "image deleted");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error("Failed to delete image", err)),
        }
    }

    async fn list_images(&self) -> Result<Vec<ImageRef>, AppError> {
        let mut entries = match fs::read_dir(&self.images_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(storage_error("Failed to list images", err)),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| storage_error("Failed to list images", err))?
        {
            if !entry
                .file_type()
                .await
                .map(|kind| kind.is_file())
                .unwrap_or(false)
            {
                continue;
            }
            // Temp files and anything else that is not a plain name are skipped.
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(image) = ImageRef::new(name.to_string()) {
                    images.push(image);
                }
            }
        }
        images.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(images)
    }

    async fn clear_all(&self) -> Result<u32, AppError> {
        let images = self.list_images().await?;
        let mut removed = 0u32;
        for image in &images {
            self.delete_image(image).await?;
            removed += 1;
        }
        tracing::info!(target: "storage::images", removed, "image directory cleared");
        Ok(removed)
    }
}
