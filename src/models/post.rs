//! Reference to one stored image blob.

use crate::error::{Error, Result};
use crate::models::{read_u16, BinaryStructure};
use crate::ows::Ows;

/// A reference to one post on a backend: which service holds it and the
/// service-assigned id.
///
/// Posts are immutable. When data changes, a fresh post list supersedes the
/// old one and the old posts are scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Post {
    pub ows: Ows,
    pub id: String,
}

impl Post {
    pub fn new(ows: Ows, id: impl Into<String>) -> Self {
        Self {
            ows,
            id: id.into(),
        }
    }
}

impl BinaryStructure for Post {
    const MAGIC: &'static [u8] = b"P";
    const VERSION: u8 = 0;
    const MIN_COUNT: usize = 4;
    const NAME: &'static str = "post";

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(Self::MIN_COUNT + self.id.len());
        bytes.extend_from_slice(Self::MAGIC);
        bytes.push(Self::VERSION);
        bytes.extend_from_slice(&self.ows.id().to_be_bytes());
        bytes.extend_from_slice(self.id.as_bytes());
        Ok(bytes)
    }

    /// The id consumes the rest of the slice, so callers must pre-slice the
    /// exact sub-range holding one post.
    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Self::check_prologue(bytes)?;

        let ows = Ows::from_id(read_u16(bytes, &mut cursor)?)?;
        let id = std::str::from_utf8(&bytes[cursor..])
            .map_err(|_| Error::BadStructure("post id is not valid UTF-8".to_string()))?
            .to_string();

        Ok(Self { ows, id })
    }
}
