use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::services::ServiceError;

/// Blob storage for uploaded timeline media.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist the bytes under a fresh name derived from
    /// `original_name`'s extension. Returns the public URL.
    async fn upload(&self, bytes: &[u8], original_name: &str) -> Result<String, ServiceError>;
}

/// Filesystem-backed storage serving files from a media directory.
pub struct LocalStorage {
    media_dir: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub async fn new(media_dir: impl Into<PathBuf>, public_base: String) -> Result<Self, ServiceError> {
        let media_dir = media_dir.into();
        tokio::fs::create_dir_all(&media_dir)
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;
        Ok(Self {
            media_dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    /// Random name keeping only the (sanitized) extension, so uploads
    /// can never traverse out of the media directory or collide.
    fn stored_name(original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase());

        match ext {
            Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
            None => uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, bytes: &[u8], original_name: &str) -> Result<String, ServiceError> {
        let name = Self::stored_name(original_name);
        let path = self.media_dir.join(&name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        tracing::debug!(file = %name, size = bytes.len(), "Stored upload");
        Ok(format!("{}/{}", self.public_base, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media".to_string())
            .await
            .unwrap();

        let url = storage.upload(b"fake-png", "scan.PNG").await.unwrap();
        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".png"));

        let name = url.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(dir.path().join(name)).await.unwrap();
        assert_eq!(on_disk, b"fake-png");
    }

    #[test]
    fn hostile_extensions_are_dropped() {
        let name = LocalStorage::stored_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains(".."));

        let odd = LocalStorage::stored_name("report.tar.gz?x=1");
        assert!(!odd.contains('?'));
    }
}
