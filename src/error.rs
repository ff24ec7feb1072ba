//! Error types for the steganographic filesystem.

use thiserror::Error;

/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across envelope, codec, structure, and storage
/// operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Envelope decode ---
    /// The decrypted plaintext does not start with a valid FFS header.
    #[error("Data is not FFS encoded")]
    NotFfsData,

    /// Authentication or parse failure while opening the ciphertext.
    #[error("Decryption failed: wrong password or corrupted data")]
    DecryptionError,

    /// Fewer bytes available than a declared length requires.
    #[error("Not enough data: need {expected} bytes, have {actual}")]
    NotEnoughData { expected: usize, actual: usize },

    /// A field would run past the end of the buffer, or the input is
    /// malformed before any structure can be parsed.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    // --- Envelope encode ---
    /// Secure randomness for the salt could not be obtained.
    #[error("Could not generate random salt")]
    SaltGenerationError,

    /// The derived key has the wrong length.
    #[error("Could not derive key of the required length")]
    KeyGenerationError,

    /// Secure randomness for the nonce could not be obtained.
    #[error("Could not generate random nonce")]
    IvGenerationError,

    /// The AEAD seal operation failed.
    #[error("Encryption error: {0}")]
    EncryptionError(String),

    // --- Codec and binary structures ---
    /// A buffer has an illegal length for the requested operation.
    #[error("Bad data count: need at least {required} bytes, have {actual}")]
    BadDataCount { required: usize, actual: usize },

    /// A structure's leading magic bytes do not match.
    #[error("Bad magic bytes for {structure}")]
    BadMagic { structure: &'static str },

    /// A structure's version byte is not supported.
    #[error("Bad structure version: expected {expected}, found {found}")]
    BadVersion { expected: u8, found: u8 },

    /// A structure's fields are internally inconsistent.
    #[error("Bad structure: {0}")]
    BadStructure(String),

    // --- Directory ---
    /// A filename exceeds the 255 UTF-8 byte limit.
    #[error("Filename too long: {0}")]
    NameTooLong(String),

    /// A filename is already present in the directory.
    #[error("Filename already exists: {0}")]
    FilenameExists(String),

    /// No directory entry carries the given name.
    #[error("No entry with name: {0}")]
    NoEntryWithName(String),

    // --- Filesystem ---
    /// No inode table entry for the given inode.
    #[error("No file with inode {0}")]
    NoFileWithInode(u64),

    /// The inode refers to a directory, not a file.
    #[error("Inode {0} is a directory")]
    IsDirectory(u64),

    /// The inode refers to a file, not a directory.
    #[error("Inode {0} is a file")]
    IsFile(u64),

    /// The file descriptor is not in the open-file table.
    #[error("File descriptor {0} is not open")]
    FileNotOpen(u64),

    /// The inode table could not be located on the backend.
    #[error("Could not initialize filesystem state")]
    CouldNotInitialize,

    // --- Backend ---
    /// No client is registered for the backend.
    #[error("No client registered for backend {0}")]
    UnsupportedOws(u16),

    /// The backend identifier is not known.
    #[error("Unknown backend identifier: {0}")]
    UnknownOws(u16),

    /// The backend client has no valid credentials.
    #[error("Not authenticated with backend")]
    NotAuthenticated,

    /// The backend has no post with the given id.
    #[error("No post with id: {0}")]
    NoPostWithId(String),

    /// The backend rejected or failed an upload.
    #[error("Could not upload post: {0}")]
    CouldNotUpload(String),

    /// The backend holds fewer posts than requested.
    #[error("Could not list {requested} recent posts, only {available} exist")]
    CouldNotGetRecent { requested: usize, available: usize },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidData(e.to_string())
    }
}
