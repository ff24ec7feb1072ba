//! Protocol constants for the steganographic filesystem.

/// Bytes of payload carried by one RGBA pixel with 16-bit components
/// (2 bytes per channel).
pub const BYTES_PER_PIXEL: usize = 8;

/// Size of the big-endian length prefix stored ahead of each image's data.
pub const LENGTH_PREFIX_SIZE: usize = 8;

/// Longest filename a directory accepts, in UTF-8 bytes.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Longest post id an inode table entry can reference. Each post is stored
/// behind a one-byte length prefix, and its encoding spends 4 bytes on
/// magic, version, and backend id.
pub const MAX_POST_ID_LENGTH: usize = 251;

/// Default byte budget for the storage cache.
pub const DEFAULT_CACHE_CAPACITY: u64 = 5_000_000;

/// Envelope parameters for password-based encryption.
pub mod envelope_params {
    /// Salt length for key derivation.
    pub const SALT_LENGTH: usize = 32;

    /// Derived key length in bytes (AES-256).
    pub const KEY_LENGTH: usize = 32;

    /// AES-GCM nonce length (96 bits).
    pub const NONCE_SIZE: usize = 12;

    /// AES-GCM authentication tag length (128 bits).
    pub const TAG_SIZE: usize = 16;

    /// Size of the ciphertext-length field (u64, big-endian).
    pub const CIPHER_LEN_SIZE: usize = 8;
}
