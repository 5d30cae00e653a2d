//! Image storage port.

use async_trait::async_trait;
use bytes::Bytes;

/// Content types accepted for post images.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

/// An image file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Only PNG and JPEG files with a name and a body are kept.
    pub fn is_accepted(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        !self.file_name.trim().is_empty()
            && !self.data.is_empty()
            && ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str())
    }
}

/// Image store trait - abstraction over where post images live.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the upload and return its public path (`images/<file>`).
    async fn store(&self, upload: &ImageUpload) -> Result<String, StorageError>;

    /// Remove a previously stored image by its public path.
    async fn remove(&self, image_url: &str) -> Result<(), StorageError>;
}

/// Image storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid image path: {0}")]
    InvalidPath(String),

    #[error("I/O failure: {0}")]
    Io(String),
}
