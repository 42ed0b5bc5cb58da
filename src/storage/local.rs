use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::backend::{FileStream, SpoolFile, StorageBackend, StoredFile};
use crate::error::{AppError, Result};

/// Disk-backed storage under a single configured root.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolves a reference to a path strictly inside the storage root.
    ///
    /// References are relative `owner/job.pdf` paths; anything absolute,
    /// empty, or containing `..`/current-dir components is refused.
    fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let rel = Path::new(reference);
        if reference.is_empty()
            || rel.is_absolute()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::Validation(
                "Invalid storage reference".to_string(),
            ));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn store(&self, user_id: Uuid, job_id: Uuid, bytes: Bytes) -> Result<StoredFile> {
        let reference = format!("{}/{}.pdf", user_id, job_id);
        let path = self.resolve(&reference)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        tracing::debug!("💾 Stored {} bytes at {}", bytes.len(), path.display());

        Ok(StoredFile {
            reference,
            direct_url: None,
        })
    }

    async fn stream(&self, reference: &str) -> Result<FileStream> {
        let path = self.resolve(reference)?;
        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileUnavailable(format!("No stored file for {}", reference))
            } else {
                AppError::Io(e)
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn materialize(&self, reference: &str) -> Result<SpoolFile> {
        let path = self.resolve(reference)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AppError::FileUnavailable(format!(
                "No stored file for {}",
                reference
            )));
        }
        Ok(SpoolFile {
            path,
            temporary: false,
        })
    }

    async fn exists(&self, reference: &str) -> Result<bool> {
        let path = self.resolve(reference)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Already gone counts as deleted.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn direct_url(&self, _reference: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn store_stream_delete_round_trip() {
        let (_dir, storage) = storage().await;
        let user = Uuid::new_v4();
        let job = Uuid::new_v4();

        let stored = storage
            .store(user, job, Bytes::from_static(b"%PDF-1.7 test"))
            .await
            .unwrap();
        assert!(stored.reference.ends_with(".pdf"));
        assert!(storage.exists(&stored.reference).await.unwrap());

        let mut stream = storage.stream(&stored.reference).await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"%PDF-1.7 test");

        storage.delete(&stored.reference).await.unwrap();
        assert!(!storage.exists(&stored.reference).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, storage) = storage().await;
        storage.delete("nobody/nothing.pdf").await.unwrap();
        storage.delete("nobody/nothing.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_references_are_refused() {
        let (_dir, storage) = storage().await;
        assert!(storage.stream("../etc/passwd").await.is_err());
        assert!(storage.stream("/etc/passwd").await.is_err());
        assert!(storage.delete("a/../../b.pdf").await.is_err());
        assert!(storage.stream("").await.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_file_unavailable() {
        let (_dir, storage) = storage().await;
        match storage.stream("user/missing.pdf").await {
            Err(AppError::FileUnavailable(_)) => {}
            other => panic!("expected FileUnavailable, got {:?}", other.map(|_| ())),
        }
        match storage.materialize("user/missing.pdf").await {
            Err(AppError::FileUnavailable(_)) => {}
            other => panic!("expected FileUnavailable, got {:?}", other.map(|_| ())),
        }
    }
}
