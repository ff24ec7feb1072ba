//! Directory listing: filename to inode mapping.

use std::collections::BTreeMap;

use crate::config::MAX_FILENAME_LENGTH;
use crate::error::{Error, Result};
use crate::models::{read_slice, read_u64, read_u8, BinaryStructure, Inode};

/// A directory: its own inode plus a name → inode mapping, encoded in name
/// order so repeated encodes are byte-stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub self_inode: Inode,
    entries: BTreeMap<String, Inode>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new(self_inode: Inode) -> Self {
        Self {
            self_inode,
            entries: BTreeMap::new(),
        }
    }

    /// Create a directory from existing entries.
    pub fn with_entries(self_inode: Inode, entries: BTreeMap<String, Inode>) -> Result<Self> {
        for name in entries.keys() {
            check_filename_length(name)?;
        }
        Ok(Self {
            self_inode,
            entries,
        })
    }

    /// Add a file or directory under `name`.
    pub fn add(&mut self, name: &str, inode: Inode) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::FilenameExists(name.to_string()));
        }
        check_filename_length(name)?;

        self.entries.insert(name.to_string(), inode);
        Ok(())
    }

    /// Look up the inode stored under `name`.
    pub fn inode_of(&self, name: &str) -> Result<Inode> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| Error::NoEntryWithName(name.to_string()))
    }

    /// Remove `name`, returning the inode it pointed at.
    pub fn remove(&mut self, name: &str) -> Result<Inode> {
        self.entries
            .remove(name)
            .ok_or_else(|| Error::NoEntryWithName(name.to_string()))
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> &BTreeMap<String, Inode> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_filename_length(name: &str) -> Result<()> {
    // len() counts UTF-8 bytes, which is what the wire format stores
    if name.len() > MAX_FILENAME_LENGTH {
        return Err(Error::NameTooLong(name.to_string()));
    }
    Ok(())
}

impl BinaryStructure for Directory {
    const MAGIC: &'static [u8] = b"DIR";
    const VERSION: u8 = 0;
    // magic + version + self inode
    const MIN_COUNT: usize = 3 + 1 + 8;
    const NAME: &'static str = "directory";

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::MIN_COUNT);
        bytes.extend_from_slice(Self::MAGIC);
        bytes.push(Self::VERSION);
        bytes.extend_from_slice(&self.self_inode.to_be_bytes());

        for (name, inode) in &self.entries {
            let len = u8::try_from(name.len())
                .map_err(|_| Error::NameTooLong(name.to_string()))?;
            bytes.push(len);
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(&inode.to_be_bytes());
        }

        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Self::check_prologue(bytes)?;

        let self_inode = read_u64(bytes, &mut cursor)?;

        let mut entries = BTreeMap::new();
        while cursor < bytes.len() {
            let len = read_u8(bytes, &mut cursor)? as usize;
            let name = std::str::from_utf8(read_slice(bytes, &mut cursor, len)?)
                .map_err(|_| Error::BadStructure("filename is not valid UTF-8".to_string()))?
                .to_string();
            let inode = read_u64(bytes, &mut cursor)?;

            if entries.insert(name.clone(), inode).is_some() {
                return Err(Error::BadStructure(format!("duplicate filename {}", name)));
            }
        }

        Ok(Self {
            self_inode,
            entries,
        })
    }
}
