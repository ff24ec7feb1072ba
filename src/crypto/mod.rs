//! Cryptographic operations for the steganographic filesystem.
//!
//! This module provides:
//! - HKDF-SHA512 password-based key derivation
//! - AES-256-GCM authenticated encryption
//! - The FFS envelope format (salt, ciphertext length, sealed data)

mod cipher;
pub mod envelope;
mod kdf;

pub use cipher::Cipher;
pub use kdf::KeyDerivation;
