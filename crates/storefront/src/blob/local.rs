//! Local-directory blob store.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;
use walkdir::WalkDir;

use super::{BlobError, BlobRecord, BlobStore, PutOptions};

/// In-flight uploads are written to `.<random>.upload-tmp` next to the target.
const TMP_EXTENSION: &str = "upload-tmp";

/// A [`BlobStore`] that keeps each blob as a file under a root directory.
///
/// Key segments map to subdirectories: `admin/password.json` is stored at
/// `<root>/admin/password.json`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`. The directory is created on first put.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

/// Reject keys that could escape the root or name a directory.
fn validate_key(key: &str) -> Result<(), BlobError> {
    let valid = !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.to_owned()))
    }
}

/// `reports/q1.pdf` -> `reports/q1-3f9a0c1d.pdf`
fn with_random_suffix(key: &str) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    let (dir, file) = key.rsplit_once('/').unwrap_or(("", key));
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{suffix}.{ext}"),
        _ => format!("{file}-{suffix}"),
    };

    if dir.is_empty() {
        file
    } else {
        format!("{dir}/{file}")
    }
}

fn record_for(path: &Path, pathname: String) -> Result<BlobRecord, BlobError> {
    let metadata = std::fs::metadata(path)?;
    let uploaded_at = metadata.modified().map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
    let url = std::path::absolute(path)
        .ok()
        .and_then(|absolute| Url::from_file_path(absolute).ok())
        .map_or_else(|| path.display().to_string(), String::from);

    Ok(BlobRecord {
        pathname,
        url,
        size: metadata.len(),
        uploaded_at,
    })
}

impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        options: PutOptions,
    ) -> Result<BlobRecord, BlobError> {
        let pathname = if options.add_random_suffix {
            with_random_suffix(key)
        } else {
            key.to_owned()
        };
        let path = self.path_for(&pathname)?;
        let dir = path.parent().map_or_else(|| self.root.clone(), Path::to_path_buf);
        tokio::fs::create_dir_all(&dir).await?;

        let record = tokio::task::spawn_blocking(move || -> Result<BlobRecord, BlobError> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".")
                .suffix(&format!(".{TMP_EXTENSION}"))
                .tempfile_in(&dir)?;
            tmp.write_all(&content)?;

            let persisted = if options.allow_overwrite {
                tmp.persist(&path)
            } else {
                tmp.persist_noclobber(&path)
            };
            match persisted {
                Ok(_) => record_for(&path, pathname),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    Err(BlobError::AlreadyExists(pathname))
                }
                Err(e) => Err(e.error.into()),
            }
        })
        .await??;

        tracing::debug!(pathname = %record.pathname, "Stored blob");
        Ok(record)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobRecord>, BlobError> {
        let root = self.root.clone();
        let prefix = prefix.to_owned();

        tokio::task::spawn_blocking(move || -> Result<Vec<BlobRecord>, BlobError> {
            if !root.exists() {
                return Ok(Vec::new());
            }

            let mut records = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1) {
                let entry = entry?;
                if !entry.file_type().is_file()
                    || entry.path().extension().is_some_and(|ext| ext == TMP_EXTENSION)
                {
                    continue;
                }

                let Ok(relative) = entry.path().strip_prefix(&root) else {
                    continue;
                };
                let pathname = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if pathname.starts_with(&prefix) {
                    records.push(record_for(entry.path(), pathname)?);
                }
            }

            records.sort_by(|a, b| a.pathname.cmp(&b.pathname));
            Ok(records)
        })
        .await?
    }

    async fn read(&self, record: &BlobRecord) -> Result<Vec<u8>, BlobError> {
        let path = self.path_for(&record.pathname)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(record.pathname.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
