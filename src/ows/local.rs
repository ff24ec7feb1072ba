//! Local-directory backend: each post is a PNG file named by a UUID.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ows::{Ows, OwsClient};

const FILE_EXTENSION: &str = "png";

/// A backend that stores posts as `<uuid>.png` files in one flat directory.
pub struct LocalClient {
    base_path: PathBuf,
    size_limit: usize,
}

impl LocalClient {
    /// Create a client rooted at `base_path`, creating the directory if
    /// needed. A local disk has no per-post size limit.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_size_limit(base_path, usize::MAX)
    }

    /// Create a client with an artificial upload size limit. Mainly useful
    /// for exercising multi-image chunking against a local store.
    pub fn with_size_limit(base_path: impl Into<PathBuf>, size_limit: usize) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        debug!(path = %base_path.display(), "local backend initialized");
        Ok(Self {
            base_path,
            size_limit,
        })
    }

    fn post_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", id, FILE_EXTENSION))
    }
}

/// Post id of a stored file, if its name has the expected shape.
fn post_id(path: &Path) -> Option<String> {
    if path.extension()? != FILE_EXTENSION {
        return None;
    }
    Some(path.file_stem()?.to_str()?.to_string())
}

#[async_trait]
impl OwsClient for LocalClient {
    fn ows(&self) -> Ows {
        Ows::Local
    }

    fn size_limit(&self) -> usize {
        self.size_limit
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.post_path(id);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NoPostWithId(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, data: &[u8]) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let path = self.post_path(&id);

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::CouldNotUpload(e.to_string()))?;

        debug!(%id, bytes = data.len(), "stored post");
        Ok(id)
    }

    async fn list_recent(&self, n: usize) -> Result<Vec<String>> {
        let mut posts: Vec<(SystemTime, String)> = Vec::new();

        let mut dir = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let Some(id) = post_id(&entry.path()) else {
                continue;
            };
            let modified = entry
                .metadata()
                .await?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            posts.push((modified, id));
        }

        if posts.len() < n {
            return Err(Error::CouldNotGetRecent {
                requested: n,
                available: posts.len(),
            });
        }

        // Newest first; equal timestamps fall back to id order so the
        // result is stable.
        posts.sort_by(|a, b| b.cmp(a));
        Ok(posts.into_iter().take(n).map(|(_, id)| id).collect())
    }

    async fn delete(&self, id: &str) {
        let path = self.post_path(id);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(%id, error = %e, "could not delete post");
        }
    }
}
