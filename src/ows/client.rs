//! The backend contract consumed by the storage orchestrator.

use async_trait::async_trait;

use crate::error::Result;
use crate::ows::Ows;

/// A client for one post-storage service.
///
/// Every network suspension point in the system goes through these four
/// async methods; everything else is synchronous CPU work.
#[async_trait]
pub trait OwsClient: Send + Sync {
    /// Which backend this client serves.
    fn ows(&self) -> Ows;

    /// Maximum number of bytes the service accepts per upload.
    fn size_limit(&self) -> usize;

    /// Fetch the data of a post.
    ///
    /// Fails with `NoPostWithId` if the service has no such post.
    async fn get(&self, id: &str) -> Result<Vec<u8>>;

    /// Upload data and return the service-assigned post id.
    ///
    /// Fails with `CouldNotUpload` if the service rejects the data.
    async fn upload(&self, data: &[u8]) -> Result<String>;

    /// The ids of the `n` most recent posts, newest first.
    ///
    /// Fails with `CouldNotGetRecent` if fewer than `n` posts exist.
    async fn list_recent(&self, n: usize) -> Result<Vec<String>>;

    /// Delete a post. Best-effort: failures are logged by the
    /// implementation, never surfaced.
    async fn delete(&self, id: &str);
}
