use std::path::PathBuf;

use async_trait::async_trait;

use super::MediaError;

/// Result of storing an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the object.
    pub url: String,
    pub size: u64,
}

/// Where processed images end up.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadedObject, MediaError>;

    /// Public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Filesystem-backed store for local development.
pub struct LocalStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStore {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<UploadedObject, MediaError> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::Upload(format!("failed to create directory: {e}")))?;
        }

        let size = data.len() as u64;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| MediaError::Upload(format!("failed to write file: {e}")))?;

        Ok(UploadedObject {
            key: key.to_string(),
            url: self.public_url(key),
            size,
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}
