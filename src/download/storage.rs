//! File storage -- unique naming and persisting fetched media.

use crate::error::DownloadError;
use crate::utils::get_unique_path;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

/// Abstraction over the destination filesystem, enabling testability.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Reserve a path under `dir` for `name.extension` that no other save of
    /// this run (and no existing file) uses.
    fn make_unique_filename(
        &self,
        dir: &Path,
        name: &str,
        extension: &str,
    ) -> Result<PathBuf, DownloadError>;

    /// Write `data` to a path returned by [`make_unique_filename`](Self::make_unique_filename)
    async fn persist(&self, path: &Path, data: &[u8]) -> Result<(), DownloadError>;
}

/// [`FileStore`] on the local filesystem.
///
/// Reserved paths are remembered so concurrent saves with the same base name
/// never pick the same file, even before either has been written.
#[derive(Debug, Default)]
pub struct LocalStore {
    reserved: Mutex<HashSet<PathBuf>>,
}

impl LocalStore {
    /// Create a store with no reservations
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FileStore for LocalStore {
    fn make_unique_filename(
        &self,
        dir: &Path,
        name: &str,
        extension: &str,
    ) -> Result<PathBuf, DownloadError> {
        if name.is_empty() {
            return Err(DownloadError::InvalidName {
                reason: "empty base name".to_string(),
            });
        }
        if extension.is_empty() {
            return Err(DownloadError::InvalidName {
                reason: format!("no extension for {}", name),
            });
        }

        let mut reserved = match self.reserved.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let candidate = dir.join(format!("{}.{}", name, extension));
        let path = get_unique_path(&candidate, |p| reserved.contains(p) || p.exists())?;
        reserved.insert(path.clone());
        Ok(path)
    }

    async fn persist(&self, path: &Path, data: &[u8]) -> Result<(), DownloadError> {
        let persist_error = |source: std::io::Error| DownloadError::Persist {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(persist_error)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(persist_error)?;
        file.write_all(data).await.map_err(persist_error)?;
        file.flush().await.map_err(persist_error)?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn same_base_name_yields_distinct_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new();

        let first = store
            .make_unique_filename(temp_dir.path(), "sunset", "jpg")
            .unwrap();
        let second = store
            .make_unique_filename(temp_dir.path(), "sunset", "jpg")
            .unwrap();

        assert_eq!(first, temp_dir.path().join("sunset.jpg"));
        assert_eq!(second, temp_dir.path().join("sunset (1).jpg"));
    }

    #[test]
    fn existing_files_are_not_reused() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("sunset.jpg"), b"old").unwrap();
        let store = LocalStore::new();

        let path = store
            .make_unique_filename(temp_dir.path(), "sunset", "jpg")
            .unwrap();
        assert_eq!(path, temp_dir.path().join("sunset (1).jpg"));
    }

    #[test]
    fn empty_name_or_extension_is_rejected() {
        let store = LocalStore::new();
        assert!(matches!(
            store.make_unique_filename(Path::new("/tmp"), "", "jpg"),
            Err(DownloadError::InvalidName { .. })
        ));
        assert!(matches!(
            store.make_unique_filename(Path::new("/tmp"), "name", ""),
            Err(DownloadError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn persist_creates_directories_and_writes() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new();
        let dir = temp_dir.path().join("pics");

        let path = store.make_unique_filename(&dir, "lake", "png").unwrap();
        store.persist(&path, b"image bytes").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"image bytes");
    }

    #[tokio::test]
    async fn persist_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("taken.jpg");
        std::fs::write(&path, b"keep me").unwrap();

        let err = LocalStore::new().persist(&path, b"new").await.unwrap_err();
        assert!(matches!(err, DownloadError::Persist { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn concurrent_saves_never_collide() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::new());

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            let dir = temp_dir.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                let path = store.make_unique_filename(&dir, "same", "jpg").unwrap();
                store.persist(&path, &[i]).await.unwrap();
                path
            }));
        }

        let mut paths = HashSet::new();
        for handle in handles {
            paths.insert(handle.await.unwrap());
        }
        assert_eq!(paths.len(), 8);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 8);
    }
}
