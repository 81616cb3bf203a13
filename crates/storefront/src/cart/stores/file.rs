//! File-backed local store.
//!
//! All keys live in one JSON object on disk. Writes go to a uniquely named
//! temp file in the same directory and are persisted over the store file, so
//! a crash mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::cart::storage::{LocalStore, StoreError};

/// A [`LocalStore`] persisted as a JSON map file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file and its parent directories are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl LocalStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut map = match self.read_map().await {
            Ok(map) => map,
            Err(StoreError::Encoding(e)) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Local store file is malformed, replacing it"
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_owned(), value);

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        tokio::fs::create_dir_all(&dir).await?;

        let content = serde_json::to_vec_pretty(&map)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&content)?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::from)??;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_creates_parents_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/dir/store.json"));

        store.set_item("a", "1".to_owned()).await.unwrap();
        store.set_item("b", "2".to_owned()).await.unwrap();
        store.set_item("a", "3".to_owned()).await.unwrap();

        assert_eq!(store.get_item("a").await.unwrap().as_deref(), Some("3"));
        assert_eq!(store.get_item("b").await.unwrap().as_deref(), Some("2"));

        let entries = std::fs::read_dir(dir.path().join("nested/dir")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_share_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let first = FileStore::new(&path);
        let second = FileStore::new(&path);

        let (a, b) = tokio::join!(
            first.set_item("k", "from-first".to_owned()),
            second.set_item("k", "from-second".to_owned()),
        );
        a.unwrap();
        b.unwrap();

        let value = first.get_item("k").await.unwrap().unwrap();
        assert!(value == "from-first" || value == "from-second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_file_errors_on_read_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not a map").unwrap();
        let store = FileStore::new(&path);

        assert!(matches!(
            store.get_item("k").await,
            Err(StoreError::Encoding(_))
        ));

        store.set_item("k", "v".to_owned()).await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));
    }
}
