//! The FFS envelope: `salt || u64_be(cipher_len) || cipher`.
//!
//! The cipher region is AES-256-GCM sealed (`nonce || ciphertext || tag`)
//! over `header || payload`, with the key derived from the password and the
//! envelope's salt. A fresh salt and nonce are drawn on every wrap, so equal
//! payloads never produce equal envelopes.

use crate::config::envelope_params::{CIPHER_LEN_SIZE, SALT_LENGTH};
use crate::crypto::{Cipher, KeyDerivation};
use crate::error::{Error, Result};
use crate::models::{BinaryStructure, Header};

/// Wrap a payload into an encrypted envelope.
pub fn wrap(payload: &[u8], password: &str) -> Result<Vec<u8>> {
    let data_count = u32::try_from(payload.len())
        .map_err(|_| Error::BadStructure("payload too large for header".to_string()))?;
    let header = Header::new(data_count);

    let kdf = KeyDerivation::new()?;
    let key = kdf.derive_key(password)?;
    let cipher = Cipher::new(key);

    let mut plaintext = header.encode()?;
    plaintext.extend_from_slice(payload);

    let cipher_data = cipher.encrypt(&plaintext)?;

    let mut envelope =
        Vec::with_capacity(SALT_LENGTH + CIPHER_LEN_SIZE + cipher_data.len());
    envelope.extend_from_slice(kdf.salt());
    envelope.extend_from_slice(&(cipher_data.len() as u64).to_be_bytes());
    envelope.extend_from_slice(&cipher_data);

    Ok(envelope)
}

/// Open an envelope, returning the payload and its header.
///
/// Field parsing failures surface as `InvalidData`, authentication failures
/// as `DecryptionError`, a foreign plaintext as `NotFfsData`, and a
/// truncated payload as `NotEnoughData`.
pub fn unwrap(envelope: &[u8], password: &str) -> Result<(Vec<u8>, Header)> {
    let mut cursor = 0;

    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(take(envelope, &mut cursor, SALT_LENGTH)?);

    let mut len_bytes = [0u8; CIPHER_LEN_SIZE];
    len_bytes.copy_from_slice(take(envelope, &mut cursor, CIPHER_LEN_SIZE)?);
    let cipher_len = usize::try_from(u64::from_be_bytes(len_bytes))
        .map_err(|_| Error::InvalidData("cipher length exceeds address space".to_string()))?;

    let cipher_data = take(envelope, &mut cursor, cipher_len)?;

    let key = KeyDerivation::from_salt(salt).derive_key(password)?;
    let plaintext = Cipher::new(key).decrypt(cipher_data)?;

    let header_bytes = plaintext.get(..Header::MIN_COUNT).ok_or(Error::NotFfsData)?;
    let header = Header::decode(header_bytes).map_err(|_| Error::NotFfsData)?;

    let payload_len = header.data_count as usize;
    let available = plaintext.len() - Header::MIN_COUNT;
    if available < payload_len {
        return Err(Error::NotEnoughData {
            expected: payload_len,
            actual: available,
        });
    }

    let payload = plaintext[Header::MIN_COUNT..Header::MIN_COUNT + payload_len].to_vec();
    Ok((payload, header))
}

/// Read `len` bytes at the cursor, advancing it.
fn take<'a>(data: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = cursor
        .checked_add(len)
        .ok_or_else(|| Error::InvalidData("field length overflows".to_string()))?;
    if end > data.len() {
        return Err(Error::InvalidData(format!(
            "field of {} bytes runs past end of envelope",
            len
        )));
    }
    let slice = &data[*cursor..end];
    *cursor = end;
    Ok(slice)
}
