//! Self-describing binary structures stored on the wire.
//!
//! Every record starts with fixed ASCII magic bytes and a version byte, and
//! all integer fields are big-endian. Encoding is canonical: decoding a
//! buffer and re-encoding the result reproduces the buffer byte for byte.

mod directory;
mod header;
mod inode_table;
mod post;

pub use directory::Directory;
pub use header::Header;
pub use inode_table::{InodeTable, InodeTableEntry};
pub use post::Post;

use crate::error::{Error, Result};

/// Identifier for a file or directory.
pub type Inode = u64;

/// Common contract for magic-tagged, versioned wire records.
pub trait BinaryStructure: Sized {
    /// Leading magic bytes.
    const MAGIC: &'static [u8];
    /// Format version written by `encode`.
    const VERSION: u8;
    /// Smallest legal encoded size.
    const MIN_COUNT: usize;
    /// Name used in error reports.
    const NAME: &'static str;

    /// Serialize to the canonical byte representation.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Parse bytes previously produced by `encode`.
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Shared decode prologue: length, magic, and version checks.
    ///
    /// Returns the offset of the first byte after the version.
    fn check_prologue(bytes: &[u8]) -> Result<usize> {
        if bytes.len() < Self::MIN_COUNT {
            return Err(Error::BadDataCount {
                required: Self::MIN_COUNT,
                actual: bytes.len(),
            });
        }
        if &bytes[..Self::MAGIC.len()] != Self::MAGIC {
            return Err(Error::BadMagic {
                structure: Self::NAME,
            });
        }
        let version = bytes[Self::MAGIC.len()];
        if version != Self::VERSION {
            return Err(Error::BadVersion {
                expected: Self::VERSION,
                found: version,
            });
        }
        Ok(Self::MAGIC.len() + 1)
    }
}

/// Read `len` bytes at the cursor, advancing it.
pub(crate) fn read_slice<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = cursor.saturating_add(len);
    if end > bytes.len() {
        return Err(Error::BadDataCount {
            required: end,
            actual: bytes.len(),
        });
    }
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}

pub(crate) fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8> {
    Ok(read_slice(bytes, cursor, 1)?[0])
}

pub(crate) fn read_u16(bytes: &[u8], cursor: &mut usize) -> Result<u16> {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(read_slice(bytes, cursor, 2)?);
    Ok(u16::from_be_bytes(buf))
}

pub(crate) fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32> {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(read_slice(bytes, cursor, 4)?);
    Ok(u32::from_be_bytes(buf))
}

pub(crate) fn read_u64(bytes: &[u8], cursor: &mut usize) -> Result<u64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(read_slice(bytes, cursor, 8)?);
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::fmt::Debug;

    /// Assert the decode contract every structure shares: canonical
    /// round-trip, truncation below the minimum size, corrupt magic, and
    /// unsupported version.
    pub fn assert_structure_contract<T>(value: &T)
    where
        T: BinaryStructure + PartialEq + Debug,
    {
        let encoded = value.encode().unwrap();
        assert!(encoded.len() >= T::MIN_COUNT);

        let decoded = T::decode(&encoded).unwrap();
        assert_eq!(&decoded, value);
        assert_eq!(decoded.encode().unwrap(), encoded);

        let truncated = &encoded[..T::MIN_COUNT - 1];
        assert!(matches!(
            T::decode(truncated),
            Err(Error::BadDataCount { .. })
        ));

        let mut bad_magic = encoded.clone();
        bad_magic[0] ^= 0xFF;
        assert!(matches!(T::decode(&bad_magic), Err(Error::BadMagic { .. })));

        let mut bad_version = encoded;
        bad_version[T::MAGIC.len()] = T::VERSION.wrapping_add(1);
        assert!(matches!(
            T::decode(&bad_version),
            Err(Error::BadVersion { .. })
        ));
    }
}
