//! Transient on-disk staging for attachments awaiting upload.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to prepare staging directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reaches clients, so the message leaves out the server path.
    #[error("Failed to stage attachment")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle to a staged attachment.
///
/// Dropping a handle that was never released removes the file, which
/// covers handler futures dropped mid-flight.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    size: usize,
    released: AtomicBool,
}

impl StagedFile {
    pub fn new(path: PathBuf, size: usize) -> Self {
        Self {
            path,
            size,
            released: AtomicBool::new(false),
        }
    }

    /// Record that the backing file is gone so drop leaves it alone.
    pub fn mark_released(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed unreleased staged file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove unreleased staged file"
            ),
        }
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `data` to a fresh, uniquely named location.
    async fn stage(&self, data: &[u8], extension: Option<&str>) -> Result<StagedFile, StoreError>;

    /// Delete the backing file. Idempotent; failures are logged, never returned.
    async fn release(&self, file: &StagedFile);
}

/// Stages attachments as files under one directory.
pub struct LocalFileStore {
    base_path: PathBuf,
}

impl LocalFileStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .await
            .map_err(|source| StoreError::Directory {
                path: base_path.clone(),
                source,
            })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn stage(&self, data: &[u8], extension: Option<&str>) -> Result<StagedFile, StoreError> {
        let extension = extension
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .unwrap_or("tmp");
        let path = self
            .base_path
            .join(format!("{}.{}", Uuid::new_v4(), extension));

        if let Err(source) = fs::write(&path, data).await {
            tracing::warn!(path = %path.display(), error = %source, "Failed to stage attachment");
            // A partial write may have left a file behind.
            let _ = fs::remove_file(&path).await;
            return Err(StoreError::Write { path, source });
        }

        tracing::debug!(path = %path.display(), size = data.len(), "Staged attachment");
        Ok(StagedFile::new(path, data.len()))
    }

    async fn release(&self, file: &StagedFile) {
        if file.is_released() {
            return;
        }
        match fs::remove_file(file.path()).await {
            Ok(()) => {
                file.mark_released();
                tracing::debug!(path = %file.path().display(), "Released staged attachment")
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                file.mark_released();
                tracing::debug!(path = %file.path().display(), "Staged attachment already gone")
            }
            Err(e) => tracing::warn!(
                path = %file.path().display(),
                error = %e,
                "Failed to release staged attachment"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("staging")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn stage_writes_bytes_with_extension() {
        let (_dir, store) = store().await;

        let staged = store.stage(b"meal photo", Some("jpg")).await.unwrap();

        assert_eq!(staged.path().extension().unwrap(), "jpg");
        assert_eq!(staged.size(), 10);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"meal photo");
    }

    #[tokio::test]
    async fn staged_names_are_unique() {
        let (_dir, store) = store().await;

        let a = store.stage(b"a", None).await.unwrap();
        let b = store.stage(b"a", None).await.unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().extension().unwrap(), "tmp");
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (_dir, store) = store().await;
        let staged = store.stage(b"x", Some(".csv")).await.unwrap();

        store.release(&staged).await;
        assert!(!staged.path().exists());

        // Second release finds nothing and stays quiet.
        store.release(&staged).await;
    }

    #[tokio::test]
    async fn dropping_a_released_handle_leaves_the_path_alone() {
        let (_dir, store) = store().await;
        let staged = store.stage(b"x", None).await.unwrap();
        let path = staged.path().to_path_buf();

        store.release(&staged).await;
        assert!(staged.is_released());

        // Anything later written at the same path is not ours to delete.
        std::fs::write(&path, b"someone else").unwrap();
        drop(staged);

        assert!(path.exists());
    }

    #[tokio::test]
    async fn dropping_an_unreleased_handle_removes_the_file() {
        let (_dir, store) = store().await;
        let staged = store.stage(b"x", None).await.unwrap();
        let path = staged.path().to_path_buf();

        drop(staged);

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn stage_fails_when_directory_vanishes() {
        let (_dir, store) = store().await;
        std::fs::remove_dir_all(store.base_path()).unwrap();

        let err = store.stage(b"x", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(err.to_string(), "Failed to stage attachment");
        assert!(!err.to_string().contains(&store.base_path().display().to_string()));
    }
}
