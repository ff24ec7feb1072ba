//! In-memory mock backend for exercising the orchestrator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use stegofs::error::{Error, Result};
use stegofs::ows::{Ows, OwsClient};

/// Records every call so tests can assert on upload/delete behavior.
pub struct MockClient {
    ows: Ows,
    size_limit: usize,
    posts: Mutex<HashMap<String, Vec<u8>>>,
    upload_log: Mutex<Vec<String>>,
    delete_log: Mutex<Vec<String>>,
    get_log: Mutex<Vec<String>>,
    next_id: AtomicU64,
    fail_uploads: AtomicBool,
    fail_uploads_after: AtomicUsize,
}

impl MockClient {
    pub fn with_size_limit(size_limit: usize) -> Self {
        Self {
            ows: Ows::Local,
            size_limit,
            posts: Mutex::new(HashMap::new()),
            upload_log: Mutex::new(Vec::new()),
            delete_log: Mutex::new(Vec::new()),
            get_log: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            fail_uploads: AtomicBool::new(false),
            fail_uploads_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Fail every upload once `n` have been accepted in total.
    pub fn fail_uploads_after(&self, n: usize) {
        self.fail_uploads_after.store(n, Ordering::SeqCst);
    }

    /// How many uploads have been accepted so far.
    pub fn upload_count(&self) -> usize {
        self.upload_log.lock().unwrap().len()
    }

    /// Ids of posts currently stored.
    pub fn stored_ids(&self) -> Vec<String> {
        self.posts.lock().unwrap().keys().cloned().collect()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    /// Every id ever passed to `delete`, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.delete_log.lock().unwrap().clone()
    }

    /// How many times `get` has been called.
    pub fn get_count(&self) -> usize {
        self.get_log.lock().unwrap().len()
    }

    /// Wait until at least `expected` deletes have been issued. Cleanup is
    /// fire-and-forget, so tests have to give the spawned tasks a moment.
    pub async fn wait_for_deletes(&self, expected: usize) {
        for _ in 0..200 {
            if self.delete_log.lock().unwrap().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "timed out waiting for {} deletes, saw {:?}",
            expected,
            self.deletes()
        );
    }
}

#[async_trait]
impl OwsClient for MockClient {
    fn ows(&self) -> Ows {
        self.ows
    }

    fn size_limit(&self) -> usize {
        self.size_limit
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.get_log.lock().unwrap().push(id.to_string());
        self.posts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NoPostWithId(id.to_string()))
    }

    async fn upload(&self, data: &[u8]) -> Result<String> {
        if self.fail_uploads.load(Ordering::SeqCst)
            || self.upload_count() >= self.fail_uploads_after.load(Ordering::SeqCst)
        {
            return Err(Error::CouldNotUpload("mock failure".to_string()));
        }

        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.posts.lock().unwrap().insert(id.clone(), data.to_vec());
        self.upload_log.lock().unwrap().push(id.clone());
        Ok(id)
    }

    async fn list_recent(&self, n: usize) -> Result<Vec<String>> {
        let posts = self.posts.lock().unwrap();
        let log = self.upload_log.lock().unwrap();

        let recent: Vec<String> = log
            .iter()
            .rev()
            .filter(|id| posts.contains_key(*id))
            .take(n)
            .cloned()
            .collect();

        if recent.len() < n {
            return Err(Error::CouldNotGetRecent {
                requested: n,
                available: recent.len(),
            });
        }
        Ok(recent)
    }

    async fn delete(&self, id: &str) {
        self.delete_log.lock().unwrap().push(id.to_string());
        self.posts.lock().unwrap().remove(id);
    }
}
