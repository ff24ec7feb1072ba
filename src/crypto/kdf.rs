//! HKDF-SHA512 key derivation for password-based encryption.

use crate::config::envelope_params::{KEY_LENGTH, SALT_LENGTH};
use crate::error::{Error, Result};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;

/// Key derivation using HKDF over SHA-512.
///
/// The password is the input key material and the salt randomizes the
/// extraction, so equal passwords never yield equal keys across envelopes.
#[derive(Debug, Clone)]
pub struct KeyDerivation {
    salt: [u8; SALT_LENGTH],
}

impl KeyDerivation {
    /// Create a new KDF with a fresh random salt.
    pub fn new() -> Result<Self> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|_| Error::SaltGenerationError)?;
        Ok(Self { salt })
    }

    /// Create a KDF from an existing salt (for decryption).
    pub fn from_salt(salt: [u8; SALT_LENGTH]) -> Self {
        Self { salt }
    }

    /// Get the salt for storage.
    pub fn salt(&self) -> &[u8; SALT_LENGTH] {
        &self.salt
    }

    /// Derive a 256-bit key from a password.
    pub fn derive_key(&self, password: &str) -> Result<[u8; KEY_LENGTH]> {
        let hkdf = Hkdf::<Sha512>::new(Some(&self.salt), password.as_bytes());

        let mut key = [0u8; KEY_LENGTH];
        hkdf.expand(&[], &mut key)
            .map_err(|_| Error::KeyGenerationError)?;

        Ok(key)
    }
}
