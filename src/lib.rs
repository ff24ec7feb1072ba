//! stegofs: an encrypted virtual filesystem hidden inside ordinary images.
//!
//! Files and directories live as sets of "posts" on arbitrary backends (a
//! photo host, a local directory). Each post is a PNG whose pixels carry a
//! chunk of an AES-256-GCM envelope, so the remote service only ever sees
//! innocuous-looking images.
//!
//! # Architecture
//!
//! ```text
//! Data → Envelope (AES-256-GCM) → Codec (PNG pixels) → Backend (posts)
//! ```
//!
//! The inode table and every directory are themselves envelopes stored as
//! posts; updates upload new posts before the superseded ones are deleted,
//! so an interrupted update never loses data.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stegofs::fs::{FilesystemState, ROOT_INODE};
//! use stegofs::ows::{LocalClient, Ows};
//!
//! # async fn demo() -> stegofs::Result<()> {
//! let mut state = FilesystemState::new("password");
//! state.add_client(Arc::new(LocalClient::new("./store")?));
//! state.create(Ows::Local).await?;
//!
//! let mut root = state.get_directory(ROOT_INODE).await?;
//! let inode = state
//!     .create_file(&mut root, "secret.txt", Ows::Local, b"hidden")
//!     .await?;
//!
//! assert_eq!(state.get_file(inode).await?, b"hidden");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod fs;
pub mod models;
pub mod ows;

pub use error::{Error, Result};
pub use fs::FilesystemState;
