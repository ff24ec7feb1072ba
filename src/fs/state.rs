//! The storage orchestrator: filesystem state backed by remote posts.

use std::collections::{BTreeMap, HashMap};
use std::mem;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future;
use tracing::{debug, info, warn};

use crate::config::MAX_POST_ID_LENGTH;
use crate::encoding;
use crate::error::{Error, Result};
use crate::fs::StorageCache;
use crate::models::{BinaryStructure, Directory, Inode, InodeTable, InodeTableEntry, Post};
use crate::ows::{Ows, OwsClient};

/// The root directory's inode, assigned at filesystem creation.
pub const ROOT_INODE: Inode = 0;

/// Seconds since the Unix epoch.
fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Owns the inode table and coordinates every remote operation.
///
/// Updates follow a replace-then-delete discipline: new posts are uploaded
/// and recorded before any superseded post is scheduled for deletion, so an
/// interruption mid-update never loses data. All mutating operations take
/// `&mut self`, which serializes inode allocation and entry mutation.
pub struct FilesystemState {
    inode_table: InodeTable,
    inode_table_posts: Vec<Post>,
    password: String,
    clients: HashMap<Ows, Arc<dyn OwsClient>>,
    cache: StorageCache,
}

impl FilesystemState {
    /// Create an unloaded state. Register clients with [`add_client`], then
    /// either [`create`] a fresh filesystem or [`load_inode_table`] an
    /// existing one.
    ///
    /// [`add_client`]: Self::add_client
    /// [`create`]: Self::create
    /// [`load_inode_table`]: Self::load_inode_table
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            inode_table: InodeTable::new(BTreeMap::new()),
            inode_table_posts: Vec::new(),
            password: password.into(),
            clients: HashMap::new(),
            cache: StorageCache::default(),
        }
    }

    /// Register a backend client.
    pub fn add_client(&mut self, client: Arc<dyn OwsClient>) {
        self.clients.insert(client.ows(), client);
    }

    /// The client registered for a backend, failing with `UnsupportedOws`
    /// if none is.
    pub fn client(&self, ows: Ows) -> Result<Arc<dyn OwsClient>> {
        self.clients
            .get(&ows)
            .cloned()
            .ok_or_else(|| Error::UnsupportedOws(ows.id()))
    }

    /// The registered backend with the largest upload size limit, ties
    /// broken towards the smaller backend id. Fails with
    /// `CouldNotInitialize` when no client is registered.
    pub fn appropriate_ows(&self, _data_len: usize) -> Result<Ows> {
        self.clients
            .values()
            .map(|client| (client.size_limit(), client.ows()))
            .max_by_key(|(limit, ows)| (*limit, std::cmp::Reverse(ows.id())))
            .map(|(_, ows)| ows)
            .ok_or(Error::CouldNotInitialize)
    }

    /// Posts currently holding the serialized inode table.
    pub fn inode_table_posts(&self) -> &[Post] {
        &self.inode_table_posts
    }

    /// The in-memory inode table.
    pub fn inode_table(&self) -> &InodeTable {
        &self.inode_table
    }

    /// The table entry for an inode, failing with `NoFileWithInode`.
    pub fn entry(&self, inode: Inode) -> Result<&InodeTableEntry> {
        self.inode_table
            .get(inode)
            .ok_or(Error::NoFileWithInode(inode))
    }

    /// Bootstrap a fresh filesystem on `ows`: an empty root directory and
    /// an inode table holding only the root's entry.
    pub async fn create(&mut self, ows: Ows) -> Result<()> {
        let now = unix_time();
        let root = Directory::new(ROOT_INODE);
        let root_bytes = root.encode()?;

        let mut table = InodeTable::new(BTreeMap::new());
        let inode = table.add(InodeTableEntry::new(Vec::new(), 0, true, now));
        debug_assert_eq!(inode, ROOT_INODE);

        let root_posts = self.upload(&root_bytes, ows).await?;
        if let Some(entry) = table.get_mut(inode) {
            entry.posts = root_posts;
            entry.size = root_bytes.len() as u64;
        }

        let table_posts = self.upload(&table.encode()?, ows).await?;

        self.inode_table = table;
        self.inode_table_posts = table_posts;
        info!(%ows, "created filesystem");
        Ok(())
    }

    /// Load the inode table from `ows`. With known post ids, those posts
    /// are fetched in order; with `None`, the most recent post on the
    /// backend is assumed to hold the table.
    pub async fn load_inode_table(
        &mut self,
        ows: Ows,
        known_post_ids: Option<&[String]>,
    ) -> Result<()> {
        let client = self.client(ows)?;

        let ids: Vec<String> = match known_post_ids {
            Some(ids) if !ids.is_empty() => ids.to_vec(),
            _ => {
                let recent = client.list_recent(1).await?;
                match recent.into_iter().next() {
                    Some(id) => vec![id],
                    None => return Err(Error::CouldNotInitialize),
                }
            }
        };

        let posts: Vec<Post> = ids.into_iter().map(|id| Post::new(ows, id)).collect();
        let images = future::try_join_all(posts.iter().map(|post| client.get(&post.id))).await?;
        let data = encoding::decode(&images, &self.password)?;

        self.inode_table = InodeTable::decode(&data)?;
        self.inode_table_posts = posts;
        info!(%ows, entries = self.inode_table.len(), "loaded inode table");
        Ok(())
    }

    /// Encode and upload a payload, returning the posts that now hold it.
    ///
    /// The images are uploaded concurrently and the post list preserves
    /// chunk order; any single failure fails the whole upload.
    async fn upload(&self, data: &[u8], ows: Ows) -> Result<Vec<Post>> {
        let client = self.client(ows)?;
        let images = encoding::encode(data, &self.password, client.size_limit())?;

        debug!(%ows, images = images.len(), bytes = data.len(), "uploading");
        let ids = future::try_join_all(images.iter().map(|image| client.upload(image))).await?;

        if let Some(len) = ids.iter().map(String::len).find(|&len| len > MAX_POST_ID_LENGTH) {
            // Nothing references the fresh posts yet; release them all
            warn!(%ows, posts = ids.len(), "backend returned an unusable post id");
            for id in ids {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    client.delete(&id).await;
                });
            }
            return Err(Error::BadStructure(format!(
                "backend returned a post id of {} bytes, over the {} limit",
                len, MAX_POST_ID_LENGTH
            )));
        }

        let posts: Vec<Post> = ids.into_iter().map(|id| Post::new(ows, id)).collect();
        self.cache.cache(&posts, data.to_vec());
        Ok(posts)
    }

    /// Materialize an entry's payload, hitting the cache before the
    /// network. Posts are fetched concurrently and reassembled in list
    /// order.
    async fn fetch(&self, entry: &InodeTableEntry) -> Result<Vec<u8>> {
        if let Some(data) = self.cache.get(&entry.posts) {
            debug!(posts = entry.posts.len(), "cache hit");
            return Ok(data.as_ref().clone());
        }

        let images = future::try_join_all(entry.posts.iter().map(|post| async move {
            let client = self.client(post.ows)?;
            client.get(&post.id).await
        }))
        .await?;

        let data = encoding::decode(&images, &self.password)?;
        self.cache.cache(&entry.posts, data.clone());
        Ok(data)
    }

    /// Read a file's contents.
    pub async fn get_file(&self, inode: Inode) -> Result<Vec<u8>> {
        let entry = self.entry(inode)?;
        if entry.is_directory {
            return Err(Error::IsDirectory(inode));
        }
        self.fetch(entry).await
    }

    /// Read and parse a directory.
    pub async fn get_directory(&self, inode: Inode) -> Result<Directory> {
        let entry = self.entry(inode)?;
        if !entry.is_directory {
            return Err(Error::IsFile(inode));
        }
        let data = self.fetch(entry).await?;
        Directory::decode(&data)
    }

    /// Create a file named `name` under `parent` with the given contents.
    pub async fn create_file(
        &mut self,
        parent: &mut Directory,
        name: &str,
        ows: Ows,
        data: &[u8],
    ) -> Result<Inode> {
        let inode = self
            .inode_table
            .add(InodeTableEntry::new(Vec::new(), 0, false, unix_time()));

        let created = self.store_new_entry(parent, name, inode, ows, data).await;
        if created.is_ok() {
            info!(inode, name, %ows, bytes = data.len(), "created file");
        }
        created
    }

    /// Create an empty directory named `name` under `parent`.
    pub async fn create_directory(
        &mut self,
        parent: &mut Directory,
        name: &str,
        ows: Ows,
    ) -> Result<Inode> {
        let inode = self
            .inode_table
            .add(InodeTableEntry::new(Vec::new(), 0, true, unix_time()));

        let directory = Directory::new(inode);
        let data = directory.encode()?;

        let created = self.store_new_entry(parent, name, inode, ows, &data).await;
        if created.is_ok() {
            info!(inode, name, %ows, "created directory");
        }
        created
    }

    /// Shared tail of file and directory creation: link the name, upload
    /// the payload and updated parent concurrently, persist the table, and
    /// only then schedule the superseded posts for deletion.
    async fn store_new_entry(
        &mut self,
        parent: &mut Directory,
        name: &str,
        inode: Inode,
        ows: Ows,
        data: &[u8],
    ) -> Result<Inode> {
        if let Err(e) = parent.add(name, inode) {
            self.inode_table.remove(inode);
            return Err(e);
        }
        let parent_bytes = parent.encode()?;

        let uploads = tokio::try_join!(self.upload(data, ows), self.upload(&parent_bytes, ows));
        let (entry_posts, parent_posts) = match uploads {
            Ok(posts) => posts,
            Err(e) => {
                // Nothing new is referenced yet; unwind the in-memory state
                let _ = parent.remove(name);
                self.inode_table.remove(inode);
                return Err(e);
            }
        };

        let now = unix_time();
        if let Some(entry) = self.inode_table.get_mut(inode) {
            entry.posts = entry_posts;
            entry.size = data.len() as u64;
            entry.time_updated = now;
        }

        let parent_entry = self
            .inode_table
            .get_mut(parent.self_inode)
            .ok_or(Error::NoFileWithInode(parent.self_inode))?;
        let old_parent_posts = mem::replace(&mut parent_entry.posts, parent_posts);
        let old_parent_size = mem::replace(&mut parent_entry.size, parent_bytes.len() as u64);
        let old_parent_updated = mem::replace(&mut parent_entry.time_updated, now);

        let old_table_posts = match self.replace_inode_table(ows).await {
            Ok(posts) => posts,
            Err(e) => {
                // The persisted table still describes the old posts; step
                // the in-memory state back to it and release the orphans
                let _ = parent.remove(name);
                let mut orphaned = Vec::new();
                if let Some(entry) = self.inode_table.remove(inode) {
                    orphaned.push(entry.posts);
                }
                if let Some(parent_entry) = self.inode_table.get_mut(parent.self_inode) {
                    orphaned.push(mem::replace(&mut parent_entry.posts, old_parent_posts));
                    parent_entry.size = old_parent_size;
                    parent_entry.time_updated = old_parent_updated;
                }
                self.schedule_delete(orphaned);
                return Err(e);
            }
        };

        self.schedule_delete(vec![old_parent_posts, old_table_posts]);
        Ok(inode)
    }

    /// Replace a file's contents. The parent directory is untouched since
    /// neither the name nor the inode changes.
    pub async fn update_file(&mut self, inode: Inode, ows: Ows, data: &[u8]) -> Result<()> {
        // Existence check up front so a bad inode costs no uploads
        self.entry(inode)?;

        let new_posts = self.upload(data, ows).await?;

        let entry = self
            .inode_table
            .get_mut(inode)
            .ok_or(Error::NoFileWithInode(inode))?;
        let old_posts = mem::replace(&mut entry.posts, new_posts);
        let old_size = mem::replace(&mut entry.size, data.len() as u64);
        let old_updated = mem::replace(&mut entry.time_updated, unix_time());

        let old_table_posts = match self.replace_inode_table(ows).await {
            Ok(posts) => posts,
            Err(e) => {
                let mut orphaned = Vec::new();
                if let Some(entry) = self.inode_table.get_mut(inode) {
                    orphaned.push(mem::replace(&mut entry.posts, old_posts));
                    entry.size = old_size;
                    entry.time_updated = old_updated;
                }
                self.schedule_delete(orphaned);
                return Err(e);
            }
        };

        self.schedule_delete(vec![old_posts, old_table_posts]);
        info!(inode, %ows, bytes = data.len(), "updated file");
        Ok(())
    }

    /// Remove the file named `name` from `parent`, releasing its posts.
    /// The inode is never reused.
    pub async fn remove_file(&mut self, parent: &mut Directory, name: &str) -> Result<()> {
        let inode = parent.inode_of(name)?;
        let entry = self.entry(inode)?;
        if entry.is_directory {
            return Err(Error::IsDirectory(inode));
        }

        parent.remove(name)?;
        let parent_bytes = parent.encode()?;
        let ows = self.appropriate_ows(parent_bytes.len())?;

        let parent_posts = match self.upload(&parent_bytes, ows).await {
            Ok(posts) => posts,
            Err(e) => {
                let _ = parent.add(name, inode);
                return Err(e);
            }
        };

        let removed = self
            .inode_table
            .remove(inode)
            .ok_or(Error::NoFileWithInode(inode))?;

        let now = unix_time();
        let parent_entry = self
            .inode_table
            .get_mut(parent.self_inode)
            .ok_or(Error::NoFileWithInode(parent.self_inode))?;
        let old_parent_posts = mem::replace(&mut parent_entry.posts, parent_posts);
        let old_parent_size = mem::replace(&mut parent_entry.size, parent_bytes.len() as u64);
        let old_parent_updated = mem::replace(&mut parent_entry.time_updated, now);

        let old_table_posts = match self.replace_inode_table(ows).await {
            Ok(posts) => posts,
            Err(e) => {
                let _ = parent.add(name, inode);
                self.inode_table.restore(inode, removed);
                let mut orphaned = Vec::new();
                if let Some(parent_entry) = self.inode_table.get_mut(parent.self_inode) {
                    orphaned.push(mem::replace(&mut parent_entry.posts, old_parent_posts));
                    parent_entry.size = old_parent_size;
                    parent_entry.time_updated = old_parent_updated;
                }
                self.schedule_delete(orphaned);
                return Err(e);
            }
        };

        self.schedule_delete(vec![removed.posts, old_parent_posts, old_table_posts]);
        info!(inode, name, "removed file");
        Ok(())
    }

    /// Upload the current table serialization and swap the tracked post
    /// list, returning the superseded posts.
    async fn replace_inode_table(&mut self, ows: Ows) -> Result<Vec<Post>> {
        let encoded = self.inode_table.encode()?;
        let new_posts = self.upload(&encoded, ows).await?;
        Ok(mem::replace(&mut self.inode_table_posts, new_posts))
    }

    /// Schedule superseded post lists for background deletion.
    ///
    /// The new data is already durable, so failures here only leak orphaned
    /// posts; they are logged and never surfaced to the caller.
    fn schedule_delete(&self, post_lists: Vec<Vec<Post>>) {
        for posts in post_lists {
            if posts.is_empty() {
                continue;
            }
            self.cache.remove(&posts);

            for post in posts {
                let client = match self.client(post.ows) {
                    Ok(client) => client,
                    Err(e) => {
                        warn!(id = %post.id, error = %e, "cannot clean up post");
                        continue;
                    }
                };
                tokio::spawn(async move {
                    debug!(id = %post.id, "deleting superseded post");
                    client.delete(&post.id).await;
                });
            }
        }
    }
}
