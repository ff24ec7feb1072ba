//! Lookaside cache for post-list plaintext.

use std::sync::Arc;

use moka::sync::Cache;
use sha2::{Digest, Sha256};

use crate::config::DEFAULT_CACHE_CAPACITY;
use crate::models::Post;

/// Caches the plaintext an ordered post list decodes to, keyed by an
/// order-independent hash of the list, bounded by a total byte budget.
///
/// Purely advisory: a miss falls through to the network path, and entries
/// are evicted whenever the byte budget is exceeded.
pub struct StorageCache {
    cache: Cache<u64, Arc<Vec<u8>>>,
}

impl StorageCache {
    /// Create a cache holding at most `capacity` plaintext bytes.
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .weigher(|_key, value: &Arc<Vec<u8>>| {
                u32::try_from(value.len()).unwrap_or(u32::MAX)
            })
            .build();
        Self { cache }
    }

    /// XOR of the per-post hashes, so the key ignores list order.
    fn key(posts: &[Post]) -> u64 {
        posts.iter().fold(0, |acc, post| acc ^ post_hash(post))
    }

    /// Associate plaintext with the posts that store it.
    pub fn cache(&self, posts: &[Post], data: Vec<u8>) {
        self.cache.insert(Self::key(posts), Arc::new(data));
    }

    /// The plaintext previously cached for these posts, if still held.
    pub fn get(&self, posts: &[Post]) -> Option<Arc<Vec<u8>>> {
        self.cache.get(&Self::key(posts))
    }

    /// Drop the entry for these posts. Called when posts are deleted so a
    /// stale plaintext can never be served.
    pub fn remove(&self, posts: &[Post]) {
        self.cache.invalidate(&Self::key(posts));
    }
}

impl Default for StorageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn post_hash(post: &Post) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(post.ows.id().to_be_bytes());
    hasher.update(post.id.as_bytes());
    let digest = hasher.finalize();

    let mut folded = [0u8; 8];
    folded.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(folded)
}
