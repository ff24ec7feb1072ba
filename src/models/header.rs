//! Envelope plaintext header.

use crate::error::{Error, Result};
use crate::models::{read_u32, BinaryStructure};

/// Fixed-size header sealed ahead of every envelope payload. The declared
/// `data_count` bounds how many plaintext bytes after the header are payload;
/// anything beyond is padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub data_count: u32,
}

impl Header {
    /// Create a current-version header for a payload of `data_count` bytes.
    pub fn new(data_count: u32) -> Self {
        Self {
            version: Self::VERSION,
            data_count,
        }
    }
}

impl BinaryStructure for Header {
    const MAGIC: &'static [u8] = b"FFS";
    const VERSION: u8 = 0;
    const MIN_COUNT: usize = 8;
    const NAME: &'static str = "header";

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::MIN_COUNT);
        bytes.extend_from_slice(Self::MAGIC);
        bytes.push(self.version);
        bytes.extend_from_slice(&self.data_count.to_be_bytes());
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Self::check_prologue(bytes)?;
        let data_count = read_u32(bytes, &mut cursor)?;

        if cursor != bytes.len() {
            return Err(Error::BadStructure(
                "trailing bytes after header".to_string(),
            ));
        }

        Ok(Self {
            version: Self::VERSION,
            data_count,
        })
    }
}
