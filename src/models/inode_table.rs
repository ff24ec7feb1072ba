//! The inode table and its entries.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{read_slice, read_u16, read_u64, read_u8, BinaryStructure, Inode, Post};

/// Metadata for one file or directory plus the posts holding its payload.
///
/// The post list is order-significant: posts are concatenated in list order
/// to reassemble the stored envelope, so it is encoded exactly as kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeTableEntry {
    pub size: u64,
    pub is_directory: bool,
    pub time_created: u64,
    pub time_updated: u64,
    pub time_accessed: u64,
    pub posts: Vec<Post>,
}

impl InodeTableEntry {
    /// Create an entry stamped with one timestamp for created, updated, and
    /// accessed times.
    pub fn new(posts: Vec<Post>, size: u64, is_directory: bool, now: u64) -> Self {
        Self {
            size,
            is_directory,
            time_created: now,
            time_updated: now,
            time_accessed: now,
            posts,
        }
    }
}

impl BinaryStructure for InodeTableEntry {
    const MAGIC: &'static [u8] = b"INOE";
    const VERSION: u8 = 0;
    // magic + version + size + is_directory + created + updated + accessed
    const MIN_COUNT: usize = 4 + 1 + 8 + 1 + 8 + 8 + 8;
    const NAME: &'static str = "inode table entry";

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::MIN_COUNT);
        bytes.extend_from_slice(Self::MAGIC);
        bytes.push(Self::VERSION);
        bytes.extend_from_slice(&self.size.to_be_bytes());
        bytes.push(self.is_directory as u8);
        bytes.extend_from_slice(&self.time_created.to_be_bytes());
        bytes.extend_from_slice(&self.time_updated.to_be_bytes());
        bytes.extend_from_slice(&self.time_accessed.to_be_bytes());

        for post in &self.posts {
            let encoded = post.encode()?;
            let len = u8::try_from(encoded.len()).map_err(|_| {
                Error::BadStructure(format!(
                    "post id too long to store: {} bytes",
                    post.id.len()
                ))
            })?;
            bytes.push(len);
            bytes.extend_from_slice(&encoded);
        }

        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Self::check_prologue(bytes)?;

        let size = read_u64(bytes, &mut cursor)?;
        let is_directory = match read_u8(bytes, &mut cursor)? {
            0 => false,
            1 => true,
            other => {
                return Err(Error::BadStructure(format!(
                    "invalid directory flag: {}",
                    other
                )))
            }
        };
        let time_created = read_u64(bytes, &mut cursor)?;
        let time_updated = read_u64(bytes, &mut cursor)?;
        let time_accessed = read_u64(bytes, &mut cursor)?;

        let mut posts = Vec::new();
        while cursor < bytes.len() {
            let len = read_u8(bytes, &mut cursor)? as usize;
            let post_bytes = read_slice(bytes, &mut cursor, len)?;
            posts.push(Post::decode(post_bytes)?);
        }

        Ok(Self {
            size,
            is_directory,
            time_created,
            time_updated,
            time_accessed,
            posts,
        })
    }
}

/// The authoritative mapping from inode to entry, keyed and encoded in
/// inode order.
///
/// Allocation is monotonic: `next_inode` is a high-water mark seeded with
/// `max + 1` and never decremented, so an inode is never reused within the
/// table's lifetime even after deletions.
#[derive(Debug, Clone)]
pub struct InodeTable {
    entries: BTreeMap<Inode, InodeTableEntry>,
    next_inode: Inode,
}

impl InodeTable {
    pub fn new(entries: BTreeMap<Inode, InodeTableEntry>) -> Self {
        let next_inode = entries.keys().next_back().map_or(0, |max| max.saturating_add(1));
        Self {
            entries,
            next_inode,
        }
    }

    /// The inode the next `add` will assign.
    pub fn next_inode(&self) -> Inode {
        self.next_inode
    }

    /// Insert an entry under a fresh inode and return the inode.
    pub fn add(&mut self, entry: InodeTableEntry) -> Inode {
        let inode = self.next_inode;
        self.entries.insert(inode, entry);
        self.next_inode = inode.saturating_add(1);
        inode
    }

    pub fn get(&self, inode: Inode) -> Option<&InodeTableEntry> {
        self.entries.get(&inode)
    }

    pub fn get_mut(&mut self, inode: Inode) -> Option<&mut InodeTableEntry> {
        self.entries.get_mut(&inode)
    }

    /// Remove an entry. The inode is never handed out again.
    pub fn remove(&mut self, inode: Inode) -> Option<InodeTableEntry> {
        self.entries.remove(&inode)
    }

    /// Put a removed entry back under its original inode. Allocation stays
    /// monotonic.
    pub(crate) fn restore(&mut self, inode: Inode, entry: InodeTableEntry) {
        self.entries.insert(inode, entry);
        self.next_inode = self.next_inode.max(inode.saturating_add(1));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Inode, &InodeTableEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for InodeTable {
    // next_inode is a runtime high-water mark, not wire state
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for InodeTable {}

impl BinaryStructure for InodeTable {
    const MAGIC: &'static [u8] = b"INOD";
    const VERSION: u8 = 0;
    const MIN_COUNT: usize = 4 + 1;
    const NAME: &'static str = "inode table";

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::MIN_COUNT);
        bytes.extend_from_slice(Self::MAGIC);
        bytes.push(Self::VERSION);

        for (inode, entry) in &self.entries {
            let encoded = entry.encode()?;
            let len = u16::try_from(encoded.len()).map_err(|_| {
                Error::BadStructure(format!(
                    "entry for inode {} too large to store: {} bytes",
                    inode,
                    encoded.len()
                ))
            })?;
            bytes.extend_from_slice(&inode.to_be_bytes());
            bytes.extend_from_slice(&len.to_be_bytes());
            bytes.extend_from_slice(&encoded);
        }

        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Self::check_prologue(bytes)?;

        let mut entries = BTreeMap::new();
        while cursor < bytes.len() {
            let inode = read_u64(bytes, &mut cursor)?;
            let len = read_u16(bytes, &mut cursor)? as usize;
            let entry_bytes = read_slice(bytes, &mut cursor, len)?;
            let entry = InodeTableEntry::decode(entry_bytes)?;

            if entries.insert(inode, entry).is_some() {
                return Err(Error::BadStructure(format!("duplicate inode {}", inode)));
            }
        }

        Ok(Self::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::assert_structure_contract;
    use crate::ows::Ows;

    fn entry_with_posts(posts: Vec<Post>) -> InodeTableEntry {
        InodeTableEntry::new(posts, 100, false, 1_000)
    }

    fn table_with_entries(count: u64) -> InodeTable {
        let mut table = InodeTable::new(BTreeMap::new());
        for i in 0..count {
            table.add(entry_with_posts(vec![Post::new(Ows::Local, format!("post-{}", i))]));
        }
        table
    }

    #[test]
    fn test_entry_structure_contract() {
        assert_structure_contract(&entry_with_posts(vec![]));
        assert_structure_contract(&entry_with_posts(vec![
            Post::new(Ows::Local, "first"),
            Post::new(Ows::Flickr, "second"),
        ]));
    }

    #[test]
    fn test_entry_encoded_layout() {
        let entry = InodeTableEntry {
            size: 3,
            is_directory: true,
            time_created: 1,
            time_updated: 2,
            time_accessed: 3,
            posts: vec![],
        };
        let encoded = entry.encode().unwrap();

        assert_eq!(encoded.len(), InodeTableEntry::MIN_COUNT);
        assert_eq!(&encoded[..4], b"INOE");
        assert_eq!(encoded[4], 0);
        assert_eq!(&encoded[5..13], &3u64.to_be_bytes());
        assert_eq!(encoded[13], 1);
        assert_eq!(&encoded[14..22], &1u64.to_be_bytes());
        assert_eq!(&encoded[22..30], &2u64.to_be_bytes());
        assert_eq!(&encoded[30..38], &3u64.to_be_bytes());
    }

    #[test]
    fn test_entry_preserves_post_order() {
        // Posts are chunk references; reordering them would corrupt the data
        let entry = entry_with_posts(vec![
            Post::new(Ows::Local, "zzz"),
            Post::new(Ows::Local, "aaa"),
        ]);

        let decoded = InodeTableEntry::decode(&entry.encode().unwrap()).unwrap();

        assert_eq!(decoded.posts[0].id, "zzz");
        assert_eq!(decoded.posts[1].id, "aaa");
    }

    #[test]
    fn test_entry_rejects_bad_directory_flag() {
        let mut encoded = entry_with_posts(vec![]).encode().unwrap();
        encoded[13] = 2;

        assert!(matches!(
            InodeTableEntry::decode(&encoded),
            Err(Error::BadStructure(_))
        ));
    }

    #[test]
    fn test_entry_rejects_truncated_post() {
        let mut encoded = entry_with_posts(vec![Post::new(Ows::Local, "id")]).encode().unwrap();
        // Claim one more byte for the post than the buffer holds
        encoded[InodeTableEntry::MIN_COUNT] += 1;

        assert!(matches!(
            InodeTableEntry::decode(&encoded),
            Err(Error::BadDataCount { .. })
        ));
    }

    #[test]
    fn test_table_structure_contract() {
        assert_structure_contract(&InodeTable::new(BTreeMap::new()));
        assert_structure_contract(&table_with_entries(3));
    }

    #[test]
    fn test_table_add_is_monotonic() {
        let mut table = InodeTable::new(BTreeMap::new());

        assert_eq!(table.add(entry_with_posts(vec![])), 0);
        assert_eq!(table.add(entry_with_posts(vec![])), 1);
        assert_eq!(table.add(entry_with_posts(vec![])), 2);
    }

    #[test]
    fn test_table_never_reuses_inodes() {
        let mut table = table_with_entries(3);

        table.remove(2);
        assert_eq!(table.add(entry_with_posts(vec![])), 3);

        table.remove(3);
        table.remove(1);
        assert_eq!(table.add(entry_with_posts(vec![])), 4);
    }

    #[test]
    fn test_table_restore_keeps_monotonic_allocation() {
        let mut table = table_with_entries(3);
        let removed = table.remove(1).unwrap();

        table.restore(1, removed);

        assert!(table.get(1).is_some());
        assert_eq!(table.add(entry_with_posts(vec![])), 3);
    }

    #[test]
    fn test_table_seeds_next_inode_from_decode() {
        let table = table_with_entries(3);
        let decoded = InodeTable::decode(&table.encode().unwrap()).unwrap();

        assert_eq!(decoded.next_inode(), 3);
    }

    #[test]
    fn test_table_rejects_duplicate_inode() {
        let table = table_with_entries(1);
        let mut encoded = table.encode().unwrap();

        // Append the single entry record a second time
        let record = encoded[InodeTable::MIN_COUNT..].to_vec();
        encoded.extend_from_slice(&record);

        assert!(matches!(
            InodeTable::decode(&encoded),
            Err(Error::BadStructure(_))
        ));
    }

    #[test]
    fn test_table_rejects_truncated_record() {
        let table = table_with_entries(2);
        let encoded = table.encode().unwrap();

        let truncated = &encoded[..encoded.len() - 1];
        assert!(matches!(
            InodeTable::decode(truncated),
            Err(Error::BadDataCount { .. })
        ));
    }
}
