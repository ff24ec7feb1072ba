//! Pointer metadata for re-opening a filesystem.
//!
//! The sidecar only records where the inode table lives: which backend and
//! which post ids. It never holds the password, a salt, or any plaintext —
//! everything sensitive stays inside the envelopes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ows::Ows;

/// Metadata file name (hidden file).
pub const METADATA_FILENAME: &str = ".stegofs.json";

/// Current metadata format version.
pub const METADATA_VERSION: u32 = 1;

/// Where to find the inode table: the bootstrap pointer for a filesystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsMetadata {
    /// Metadata format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Backend storing the inode table.
    pub ows: Ows,
    /// Posts holding the serialized inode table, in chunk order.
    #[serde(default)]
    pub inode_table_ids: Vec<String>,
}

fn default_version() -> u32 {
    METADATA_VERSION
}

impl Default for FsMetadata {
    fn default() -> Self {
        Self {
            version: METADATA_VERSION,
            ows: Ows::Local,
            inode_table_ids: Vec::new(),
        }
    }
}

impl FsMetadata {
    /// Create metadata pointing at the given inode table posts.
    pub fn new(ows: Ows, inode_table_ids: Vec<String>) -> Self {
        Self {
            version: METADATA_VERSION,
            ows,
            inode_table_ids,
        }
    }

    /// The metadata file path for a directory.
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILENAME)
    }

    /// Load metadata from a directory, defaulting to an uninitialized
    /// pointer if no file exists.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::file_path(dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let metadata: FsMetadata = serde_json::from_str(&content)?;
        Ok(metadata)
    }

    /// Save metadata to a directory.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::file_path(dir);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Whether the pointer refers to an existing filesystem.
    pub fn is_initialized(&self) -> bool {
        !self.inode_table_ids.is_empty()
    }
}
