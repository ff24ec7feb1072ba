//! Filesystem orchestration: state, open files, caching, and the
//! bootstrap pointer.

mod cache;
mod handle;
mod metadata;
mod state;

pub use cache::StorageCache;
pub use handle::{Fd, FileHandler};
pub use metadata::{FsMetadata, METADATA_FILENAME, METADATA_VERSION};
pub use state::{FilesystemState, ROOT_INODE};
