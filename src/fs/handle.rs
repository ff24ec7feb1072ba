//! The open-file table.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::fs::FilesystemState;
use crate::models::{Directory, Inode};

/// A process-local handle into the open-file table.
pub type Fd = u64;

struct OpenFile {
    inode: Inode,
    #[allow(dead_code)]
    parent_inode: Inode,
    /// Staged contents, set once the file has been written through this fd.
    data: Option<Vec<u8>>,
}

/// Tracks open files and flushes staged writes on close.
#[derive(Default)]
pub struct FileHandler {
    open_files: BTreeMap<Fd, OpenFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// One past the largest live descriptor.
    fn next_fd(&self) -> Fd {
        self.open_files
            .keys()
            .next_back()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Open a file living in `parent` and return its descriptor.
    pub fn open(&mut self, inode: Inode, parent: &Directory) -> Fd {
        let fd = self.next_fd();
        self.open_files.insert(
            fd,
            OpenFile {
                inode,
                parent_inode: parent.self_inode,
                data: None,
            },
        );
        fd
    }

    /// Stage new contents for an open file. Nothing is uploaded until the
    /// descriptor is closed.
    pub fn update_data(&mut self, fd: Fd, data: Vec<u8>) -> Result<()> {
        let open_file = self.open_files.get_mut(&fd).ok_or(Error::FileNotOpen(fd))?;
        open_file.data = Some(data);
        Ok(())
    }

    /// Close a descriptor, flushing staged contents through the state. The
    /// descriptor is released even when the flush fails.
    pub async fn close(&mut self, fd: Fd, state: &mut FilesystemState) -> Result<()> {
        let open_file = self.open_files.remove(&fd).ok_or(Error::FileNotOpen(fd))?;

        if let Some(data) = open_file.data {
            let ows = state.appropriate_ows(data.len())?;
            state.update_file(open_file.inode, ows, &data).await?;
        }
        Ok(())
    }
}
