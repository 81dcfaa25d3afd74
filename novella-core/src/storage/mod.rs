//! Object storage for binary assets such as cover images

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Abstract object storage provider
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Write data to the given path
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Public URL under which a stored path is served
    fn public_url(&self, path: &str) -> String;

    /// Store a blob and return its public URL
    async fn upload_blob(&self, path: &str, data: Vec<u8>, mime_type: &str) -> StorageResult<String> {
        tracing::debug!(path, mime_type, bytes = data.len(), "Uploading blob");
        self.write(path, data).await?;
        Ok(self.public_url(path))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Local filesystem storage provider
pub struct LocalStorage {
    root: std::path::PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    /// Create a new local storage provider with the given root directory
    pub fn new(root: impl Into<std::path::PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Safely resolve a path, preventing path traversal attacks
    fn full_path(&self, path: &str) -> StorageResult<std::path::PathBuf> {
        use std::path::Component;

        let mut normalized = std::path::PathBuf::new();
        for component in std::path::Path::new(path).components() {
            match component {
                Component::Normal(c) => normalized.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(StorageError::PermissionDenied(format!(
                        "path escapes storage root: {}",
                        path
                    )));
                }
            }
        }

        Ok(self.root.join(normalized))
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let full_path = self.full_path(path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::BackendError(e.to_string()))?;
        }
        tokio::fs::write(full_path, data)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }
}

/// In-memory storage provider (for testing)
pub struct MemoryStorage {
    data: RwLock<HashMap<String, (Vec<u8>, Option<String>)>>,
    public_base_url: String,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            data: RwLock::default(),
            public_base_url: "memory://novella".to_string(),
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored at a path
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.data
            .read()
            .ok()?
            .get(path)
            .map(|(data, _)| data.clone())
    }

    /// MIME type recorded by `upload_blob`
    pub fn mime_type(&self, path: &str) -> Option<String> {
        self.data
            .read()
            .ok()?
            .get(path)
            .and_then(|(_, mime)| mime.clone())
    }

    /// Stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .data
            .read()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    fn poisoned() -> StorageError {
        StorageError::BackendError("memory storage lock poisoned".to_string())
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(path.to_string(), (data, None));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }

    async fn upload_blob(&self, path: &str, data: Vec<u8>, mime_type: &str) -> StorageResult<String> {
        self.data
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(path.to_string(), (data, Some(mime_type.to_string())));
        Ok(self.public_url(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.write("test.txt", b"hello".to_vec()).await.unwrap();
        assert_eq!(storage.get("test.txt").as_deref(), Some(&b"hello"[..]));
        assert!(storage.get("missing.txt").is_none());
        assert!(storage.mime_type("test.txt").is_none());
    }

    #[tokio::test]
    async fn test_memory_upload_blob() {
        let storage = MemoryStorage::new();
        let url = storage
            .upload_blob("covers/a-cover.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "memory://novella/covers/a-cover.png");
        assert_eq!(storage.mime_type("covers/a-cover.png").as_deref(), Some("image/png"));
        assert_eq!(storage.paths(), vec!["covers/a-cover.png".to_string()]);
    }

    #[tokio::test]
    async fn test_local_storage_upload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/assets/");

        let url = storage
            .upload_blob("covers/x.jpg", b"jpeg".to_vec(), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/assets/covers/x.jpg");
        assert_eq!(std::fs::read(dir.path().join("covers/x.jpg")).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_local_storage_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost");
        let err = storage.write("../escape.txt", vec![]).await.unwrap_err();
        assert!(matches!(err, StorageError::PermissionDenied(_)));
    }
}
