//! End-to-end tests over the storage orchestrator with a mock backend.

mod common;

use std::sync::Arc;

use common::MockClient;
use stegofs::error::Error;
use stegofs::fs::{FileHandler, FilesystemState, ROOT_INODE};
use stegofs::ows::Ows;

const PASSWORD: &str = "test_password_123";

/// A fresh filesystem on a recording mock backend.
async fn setup() -> (FilesystemState, Arc<MockClient>) {
    setup_with_limit(usize::MAX).await
}

async fn setup_with_limit(size_limit: usize) -> (FilesystemState, Arc<MockClient>) {
    let client = Arc::new(MockClient::with_size_limit(size_limit));
    let mut state = FilesystemState::new(PASSWORD);
    state.add_client(client.clone());
    state.create(Ows::Local).await.expect("failed to create filesystem");
    (state, client)
}

#[tokio::test]
async fn test_create_and_read_file() {
    let (mut state, _client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();

    let content = b"Hello, World! This is a secret message.";
    let inode = state
        .create_file(&mut root, "secret.txt", Ows::Local, content)
        .await
        .unwrap();

    assert_eq!(state.get_file(inode).await.unwrap(), content);
    assert_eq!(state.entry(inode).unwrap().size, content.len() as u64);

    // The root directory now carries the name
    let root = state.get_directory(ROOT_INODE).await.unwrap();
    assert_eq!(root.inode_of("secret.txt").unwrap(), inode);
}

#[tokio::test]
async fn test_nested_directories() {
    let (mut state, _client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();

    let docs = state
        .create_directory(&mut root, "documents", Ows::Local)
        .await
        .unwrap();

    let mut docs_dir = state.get_directory(docs).await.unwrap();
    let notes = state
        .create_file(&mut docs_dir, "notes.txt", Ows::Local, b"deep nested notes")
        .await
        .unwrap();

    // Walk down from the root
    let root = state.get_directory(ROOT_INODE).await.unwrap();
    let docs_dir = state
        .get_directory(root.inode_of("documents").unwrap())
        .await
        .unwrap();
    assert_eq!(docs_dir.inode_of("notes.txt").unwrap(), notes);
    assert_eq!(state.get_file(notes).await.unwrap(), b"deep nested notes");
}

#[tokio::test]
async fn test_reload_from_known_posts() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "persisted.txt", Ows::Local, b"survives reload")
        .await
        .unwrap();

    let table_ids: Vec<String> = state
        .inode_table_posts()
        .iter()
        .map(|post| post.id.clone())
        .collect();

    // A second process: fresh state and cache, same backend
    let mut reloaded = FilesystemState::new(PASSWORD);
    reloaded.add_client(client.clone());
    reloaded
        .load_inode_table(Ows::Local, Some(&table_ids))
        .await
        .unwrap();

    assert_eq!(reloaded.get_file(inode).await.unwrap(), b"survives reload");
    let root = reloaded.get_directory(ROOT_INODE).await.unwrap();
    assert_eq!(root.inode_of("persisted.txt").unwrap(), inode);
}

#[tokio::test]
async fn test_discover_table_via_most_recent_post() {
    let (_state, client) = setup().await;

    // The inode table is always the last thing uploaded
    let mut discovered = FilesystemState::new(PASSWORD);
    discovered.add_client(client.clone());
    discovered.load_inode_table(Ows::Local, None).await.unwrap();

    assert!(discovered.get_directory(ROOT_INODE).await.is_ok());
}

#[tokio::test]
async fn test_wrong_password_fails_load() {
    let (state, client) = setup().await;
    let table_ids: Vec<String> = state
        .inode_table_posts()
        .iter()
        .map(|post| post.id.clone())
        .collect();

    let mut intruder = FilesystemState::new("not the password");
    intruder.add_client(client.clone());

    let result = intruder.load_inode_table(Ows::Local, Some(&table_ids)).await;

    assert!(matches!(result, Err(Error::DecryptionError)));
}

#[tokio::test]
async fn test_update_file_replaces_content_and_posts() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "file.txt", Ows::Local, b"version one")
        .await
        .unwrap();

    let old_posts: Vec<String> = state
        .entry(inode)
        .unwrap()
        .posts
        .iter()
        .map(|post| post.id.clone())
        .collect();
    let old_table: Vec<String> = state
        .inode_table_posts()
        .iter()
        .map(|post| post.id.clone())
        .collect();
    let deletes_before = client.deletes().len();

    state
        .update_file(inode, Ows::Local, b"version two")
        .await
        .unwrap();

    assert_eq!(state.get_file(inode).await.unwrap(), b"version two");

    // The file's old posts and the old table posts are cleaned up once each
    client
        .wait_for_deletes(deletes_before + old_posts.len() + old_table.len())
        .await;
    let deletes = client.deletes();
    for id in old_posts.iter().chain(&old_table) {
        assert_eq!(deletes.iter().filter(|d| *d == id).count(), 1);
    }

    // Live posts were never deleted
    for post in state.entry(inode).unwrap().posts.iter() {
        assert!(!deletes.contains(&post.id));
    }
}

#[tokio::test]
async fn test_cleanup_after_create_file() {
    let (mut state, client) = setup().await;

    // Bootstrap leaves exactly the root directory posts and table posts
    let root_posts: Vec<String> = state
        .entry(ROOT_INODE)
        .unwrap()
        .posts
        .iter()
        .map(|post| post.id.clone())
        .collect();
    let table_posts: Vec<String> = state
        .inode_table_posts()
        .iter()
        .map(|post| post.id.clone())
        .collect();

    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    state
        .create_file(&mut root, "new.txt", Ows::Local, b"fresh data")
        .await
        .unwrap();

    client
        .wait_for_deletes(root_posts.len() + table_posts.len())
        .await;
    let deletes = client.deletes();

    // Superseded posts deleted exactly once each, and nothing else
    for id in root_posts.iter().chain(&table_posts) {
        assert_eq!(deletes.iter().filter(|d| *d == id).count(), 1);
    }
    assert_eq!(deletes.len(), root_posts.len() + table_posts.len());

    // Everything still referenced survives on the backend
    for id in client.stored_ids() {
        assert!(!deletes.contains(&id));
    }
}

#[tokio::test]
async fn test_remove_file() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "doomed.txt", Ows::Local, b"short-lived")
        .await
        .unwrap();

    let file_posts: Vec<String> = state
        .entry(inode)
        .unwrap()
        .posts
        .iter()
        .map(|post| post.id.clone())
        .collect();
    let deletes_before = client.deletes().len();

    state.remove_file(&mut root, "doomed.txt").await.unwrap();

    assert!(matches!(
        state.get_file(inode).await,
        Err(Error::NoFileWithInode(_))
    ));
    assert!(root.inode_of("doomed.txt").is_err());

    // File posts, old directory posts, old table posts: at least the
    // file's own posts must be among the deletions
    client.wait_for_deletes(deletes_before + file_posts.len()).await;
    let deletes = client.deletes();
    for id in &file_posts {
        assert_eq!(deletes.iter().filter(|d| *d == id).count(), 1);
    }

    // The inode is never reused
    let next = state
        .create_file(&mut root, "after.txt", Ows::Local, b"later")
        .await
        .unwrap();
    assert!(next > inode);
}

#[tokio::test]
async fn test_duplicate_filename_leaves_no_orphan() {
    let (mut state, _client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    state
        .create_file(&mut root, "taken.txt", Ows::Local, b"first")
        .await
        .unwrap();

    let entries_before = state.inode_table().len();
    let result = state
        .create_file(&mut root, "taken.txt", Ows::Local, b"second")
        .await;

    assert!(matches!(result, Err(Error::FilenameExists(_))));
    assert_eq!(state.inode_table().len(), entries_before);
    assert_eq!(state.get_file(root.inode_of("taken.txt").unwrap()).await.unwrap(), b"first");
}

#[tokio::test]
async fn test_failed_upload_unwinds_creation() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();

    let entries_before = state.inode_table().len();
    let posts_before = client.post_count();

    client.fail_uploads(true);
    let result = state
        .create_file(&mut root, "ghost.txt", Ows::Local, b"never lands")
        .await;
    client.fail_uploads(false);

    assert!(matches!(result, Err(Error::CouldNotUpload(_))));
    assert_eq!(state.inode_table().len(), entries_before);
    assert!(root.inode_of("ghost.txt").is_err());
    assert_eq!(client.post_count(), posts_before);
}

#[tokio::test]
async fn test_failed_table_upload_unwinds_creation() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();

    let entries_before = state.inode_table().len();
    let table_before: Vec<String> = state
        .inode_table_posts()
        .iter()
        .map(|post| post.id.clone())
        .collect();
    let deletes_before = client.deletes().len();

    // Let the file data and directory uploads land, then fail the table
    client.fail_uploads_after(client.upload_count() + 2);
    let result = state
        .create_file(&mut root, "ghost.txt", Ows::Local, b"never recorded")
        .await;

    assert!(matches!(result, Err(Error::CouldNotUpload(_))));
    assert_eq!(state.inode_table().len(), entries_before);
    assert!(root.inode_of("ghost.txt").is_err());

    // The table's tracked posts still match what was persisted
    let table_now: Vec<String> = state
        .inode_table_posts()
        .iter()
        .map(|post| post.id.clone())
        .collect();
    assert_eq!(table_now, table_before);

    // The two posts that did land are released again
    client.wait_for_deletes(deletes_before + 2).await;

    let fresh = state.get_directory(ROOT_INODE).await.unwrap();
    assert!(fresh.inode_of("ghost.txt").is_err());
}

#[tokio::test]
async fn test_failed_table_upload_unwinds_update() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "file.txt", Ows::Local, b"version one")
        .await
        .unwrap();

    let posts_before: Vec<String> = state
        .entry(inode)
        .unwrap()
        .posts
        .iter()
        .map(|post| post.id.clone())
        .collect();

    // The data upload lands, the table upload fails
    client.fail_uploads_after(client.upload_count() + 1);
    let result = state.update_file(inode, Ows::Local, b"version two").await;

    assert!(matches!(result, Err(Error::CouldNotUpload(_))));
    let posts_now: Vec<String> = state
        .entry(inode)
        .unwrap()
        .posts
        .iter()
        .map(|post| post.id.clone())
        .collect();
    assert_eq!(posts_now, posts_before);
    assert_eq!(state.get_file(inode).await.unwrap(), b"version one");
}

#[tokio::test]
async fn test_failed_table_upload_unwinds_removal() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "keep.txt", Ows::Local, b"still here")
        .await
        .unwrap();

    // The directory upload lands, the table upload fails
    client.fail_uploads_after(client.upload_count() + 1);
    let result = state.remove_file(&mut root, "keep.txt").await;

    assert!(matches!(result, Err(Error::CouldNotUpload(_))));
    assert_eq!(root.inode_of("keep.txt").unwrap(), inode);
    assert_eq!(state.get_file(inode).await.unwrap(), b"still here");
}

#[tokio::test]
async fn test_type_mismatch_errors() {
    let (mut state, _client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let file = state
        .create_file(&mut root, "file.txt", Ows::Local, b"data")
        .await
        .unwrap();
    let dir = state
        .create_directory(&mut root, "dir", Ows::Local)
        .await
        .unwrap();

    assert!(matches!(state.get_file(dir).await, Err(Error::IsDirectory(i)) if i == dir));
    assert!(matches!(state.get_directory(file).await, Err(Error::IsFile(i)) if i == file));
    assert!(matches!(
        state.get_file(9999).await,
        Err(Error::NoFileWithInode(9999))
    ));
}

#[tokio::test]
async fn test_small_size_limit_spreads_file_over_posts() {
    let (mut state, _client) = setup_with_limit(100).await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();

    let content: Vec<u8> = (0..1_000).map(|i| (i % 256) as u8).collect();
    let inode = state
        .create_file(&mut root, "big.bin", Ows::Local, &content)
        .await
        .unwrap();

    assert!(state.entry(inode).unwrap().posts.len() >= 2);
    assert_eq!(state.get_file(inode).await.unwrap(), content);
}

#[tokio::test]
async fn test_fresh_data_is_served_from_cache() {
    let (mut state, client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "hot.txt", Ows::Local, b"cached on upload")
        .await
        .unwrap();

    let gets_before = client.get_count();
    assert_eq!(state.get_file(inode).await.unwrap(), b"cached on upload");

    // The upload already populated the cache: no backend round trip
    assert_eq!(client.get_count(), gets_before);
}

#[tokio::test]
async fn test_file_handler_flushes_on_close() {
    let (mut state, _client) = setup().await;
    let mut root = state.get_directory(ROOT_INODE).await.unwrap();
    let inode = state
        .create_file(&mut root, "open-me.txt", Ows::Local, b"before")
        .await
        .unwrap();

    let mut handler = FileHandler::new();
    let fd = handler.open(inode, &root);
    handler.update_data(fd, b"after".to_vec()).unwrap();
    handler.close(fd, &mut state).await.unwrap();

    assert_eq!(state.get_file(inode).await.unwrap(), b"after");
    assert!(matches!(
        handler.update_data(fd, Vec::new()),
        Err(Error::FileNotOpen(_))
    ));
}
