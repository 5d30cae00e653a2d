//! Local-disk image store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use quill_core::ports::{ImageStore, ImageUpload, StorageError};

/// URL prefix under which stored images are served.
pub const IMAGES_PREFIX: &str = "images";

/// Longest original-name part kept in a stored file name. The prefix adds
/// 34 bytes, which keeps the whole name under the usual 255-byte limit.
const MAX_NAME_LEN: usize = 100;

/// Longest suffix, dot included, still treated as an extension when truncating.
const MAX_EXTENSION_LEN: usize = 16;

/// Stores images as files in a single directory.
///
/// File names are `<timestamp>_<random>_<original name>`, so uploads with the
/// same name never overwrite each other.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the image directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn file_name_for(upload: &ImageUpload) -> String {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ");
        let nonce = Uuid::new_v4().simple().to_string();
        format!(
            "{timestamp}_{}_{}",
            &nonce[..8],
            sanitize_file_name(&upload.file_name)
        )
    }

    /// Resolve a public image path to a file inside the root directory.
    fn path_for(&self, image_url: &str) -> Result<PathBuf, StorageError> {
        let invalid = || StorageError::InvalidPath(image_url.to_string());

        let name = image_url
            .trim_start_matches('/')
            .strip_prefix(IMAGES_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(invalid)?;

        // Only a bare file name is allowed; no nested or parent paths.
        match Path::new(name).file_name() {
            Some(file) if file == name && name != ".." => Ok(self.root.join(file)),
            _ => Err(invalid()),
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        truncate_name(cleaned)
    }
}

/// Cut an ASCII name down to `MAX_NAME_LEN` bytes, keeping a short extension.
fn truncate_name(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }

    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN => {
            let (stem, extension) = name.split_at(dot);
            format!("{}{extension}", &stem[..MAX_NAME_LEN - extension.len()])
        }
        _ => name[..MAX_NAME_LEN].to_string(),
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, upload: &ImageUpload) -> Result<String, StorageError> {
        self.ensure_dir().await?;

        let file_name = Self::file_name_for(upload);
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, &upload.data)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        tracing::debug!(path = %path.display(), bytes = upload.data.len(), "Image stored");

        Ok(format!("{IMAGES_PREFIX}/{file_name}"))
    }

    async fn remove(&self, image_url: &str) -> Result<(), StorageError> {
        let path = self.path_for(image_url)?;

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "Image removed");

        Ok(())
    }
}
